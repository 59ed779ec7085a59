//! Blocking calls over completion-callback host operations.
//!
//! The host delivers results of some calls (access requests, reminder
//! fetches) later, through a callback, on a thread of its choosing. [`invoke`]
//! hands the operation a [`Completion`] and parks the calling thread until the
//! first resolution arrives. Callers on an async runtime should run it on a
//! blocking worker.
//!
//! A bridged call cannot be cancelled: the host offers no cancel signal for
//! these operations. Without a timeout a completion that never fires blocks
//! forever.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Error, Result};

type Resolution<T> = std::result::Result<Option<T>, String>;

/// Single-use result slot handed to a host operation.
///
/// Clones share the slot. Only the first resolution is delivered; later ones
/// are dropped, since the waiting caller may already have returned.
pub struct Completion<T> {
    slot: Arc<Mutex<Option<mpsc::Sender<Resolution<T>>>>>,
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Completion<T> {
    fn new() -> (Self, mpsc::Receiver<Resolution<T>>) {
        let (tx, rx) = mpsc::channel();
        let completion = Self {
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (completion, rx)
    }

    /// Resolve with the `(value, error)` pair a host callback receives. An
    /// error wins over a value; neither is a fault of its own.
    pub fn resolve(&self, value: Option<T>, error: Option<String>) {
        let resolution = match error {
            Some(description) => Err(description),
            None => Ok(value),
        };

        let Some(tx) = self.slot.lock().take() else {
            tracing::debug!("completion already resolved, discarding");
            return;
        };
        // The receiver is gone only if the caller timed out.
        if tx.send(resolution).is_err() {
            tracing::debug!("completion resolved after the caller stopped waiting");
        }
    }

    pub fn succeed(&self, value: T) {
        self.resolve(Some(value), None);
    }

    pub fn fail(&self, description: impl Into<String>) {
        self.resolve(None, Some(description.into()));
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.lock().is_none()
    }
}

/// Run `operation` and block until its completion resolves.
pub fn invoke<T, F>(operation: F) -> Result<T>
where
    F: FnOnce(Completion<T>),
{
    let (completion, rx) = Completion::new();
    operation(completion);
    // Every clone dropped unresolved also ends the wait.
    into_result(rx.recv().map_err(|_| Error::NoResult)?)
}

/// Like [`invoke`], giving up with [`Error::Timeout`] after `timeout`.
pub fn invoke_with_timeout<T, F>(operation: F, timeout: Duration) -> Result<T>
where
    F: FnOnce(Completion<T>),
{
    let (completion, rx) = Completion::new();
    operation(completion);
    match rx.recv_timeout(timeout) {
        Ok(resolution) => into_result(resolution),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(Error::Timeout(timeout)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(Error::NoResult),
    }
}

fn into_result<T>(resolution: Resolution<T>) -> Result<T> {
    match resolution {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(Error::NoResult),
        Err(description) => Err(Error::Native(description)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn resolves_synchronously() {
        let result = invoke(|completion: Completion<u32>| completion.succeed(7));
        assert_eq!(result, Ok(7));
    }

    #[test]
    fn resolves_from_another_thread() {
        let result = invoke(|completion: Completion<String>| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                completion.succeed("done".to_string());
            });
        });
        assert_eq!(result.unwrap(), "done");
    }

    #[test]
    fn only_first_resolution_is_observed() {
        let kept = Arc::new(Mutex::new(None));
        let kept_inner = Arc::clone(&kept);
        let result = invoke(move |completion: Completion<u32>| {
            completion.succeed(1);
            completion.succeed(2);
            completion.fail("late failure");
            *kept_inner.lock() = Some(completion);
        });
        assert_eq!(result, Ok(1));

        // Resolving after the caller returned must not panic.
        let completion = kept.lock().take().unwrap();
        assert!(completion.is_resolved());
        completion.succeed(3);
    }

    #[test]
    fn native_error_is_wrapped() {
        let result = invoke(|completion: Completion<u32>| {
            completion.resolve(Some(1), Some("access denied by policy".into()))
        });
        assert_eq!(result, Err(Error::Native("access denied by policy".into())));
    }

    #[test]
    fn empty_resolution_is_no_result() {
        let result = invoke(|completion: Completion<u32>| completion.resolve(None, None));
        assert_eq!(result, Err(Error::NoResult));
    }

    #[test]
    fn dropped_completion_is_no_result() {
        let result = invoke(|completion: Completion<u32>| drop(completion));
        assert_eq!(result, Err(Error::NoResult));
    }

    #[test]
    fn timeout_is_reported() {
        let parked = Arc::new(Mutex::new(None));
        let parked_inner = Arc::clone(&parked);
        let timeout = Duration::from_millis(20);

        let result = invoke_with_timeout(
            move |completion: Completion<u32>| *parked_inner.lock() = Some(completion),
            timeout,
        );
        assert_eq!(result, Err(Error::Timeout(timeout)));

        // A resolution after the timeout is discarded quietly.
        parked.lock().take().unwrap().succeed(1);
    }
}
