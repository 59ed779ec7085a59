//! Shared-secret check for callers of the store.
//!
//! Unrelated to the host reminders permission: this decides whether a caller
//! may use the service at all, not whether the service may read reminders.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid API key")]
pub struct AccessDenied;

#[derive(Debug, Clone, Default)]
pub struct ApiKeyGuard {
    expected: Option<String>,
}

impl ApiKeyGuard {
    /// With no key configured every caller is let through.
    pub fn new(expected: Option<String>) -> Self {
        Self { expected }
    }

    pub fn is_enabled(&self) -> bool {
        self.expected.is_some()
    }

    pub fn verify(&self, provided: Option<&str>) -> Result<(), AccessDenied> {
        let Some(expected) = &self.expected else {
            return Ok(());
        };
        match provided {
            Some(key) if constant_time_eq(key.as_bytes(), expected.as_bytes()) => Ok(()),
            _ => Err(AccessDenied),
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_when_no_key_configured() {
        let guard = ApiKeyGuard::new(None);
        assert!(!guard.is_enabled());
        assert_eq!(guard.verify(None), Ok(()));
    }

    #[test]
    fn requires_matching_key() {
        let guard = ApiKeyGuard::new(Some("s3cret".into()));
        assert_eq!(guard.verify(Some("s3cret")), Ok(()));
        assert_eq!(guard.verify(Some("s3cre")), Err(AccessDenied));
        assert_eq!(guard.verify(Some("wrong!")), Err(AccessDenied));
        assert_eq!(guard.verify(None), Err(AccessDenied));
    }
}
