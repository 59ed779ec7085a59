use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::bridge;
use super::native::NativeStore;
use crate::error::{Error, Result};

/// Kind of calendar entity a permission applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Event,
    Reminder,
}

/// Host permission state for an entity type. Owned by the host and shared by
/// the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    NotDetermined,
    Restricted,
    Denied,
    FullAccess,
    WriteOnly,
}

impl AuthorizationStatus {
    pub fn code(self) -> i64 {
        match self {
            AuthorizationStatus::NotDetermined => 0,
            AuthorizationStatus::Restricted => 1,
            AuthorizationStatus::Denied => 2,
            AuthorizationStatus::FullAccess => 3,
            AuthorizationStatus::WriteOnly => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(AuthorizationStatus::NotDetermined),
            1 => Some(AuthorizationStatus::Restricted),
            2 => Some(AuthorizationStatus::Denied),
            3 => Some(AuthorizationStatus::FullAccess),
            4 => Some(AuthorizationStatus::WriteOnly),
            _ => None,
        }
    }

    /// Only `NotDetermined` can still change within this process.
    pub fn is_terminal(self) -> bool {
        self != AuthorizationStatus::NotDetermined
    }

    pub fn allows(self, access: Access) -> bool {
        match access {
            Access::Read => self == AuthorizationStatus::FullAccess,
            Access::Write => matches!(
                self,
                AuthorizationStatus::FullAccess | AuthorizationStatus::WriteOnly
            ),
        }
    }
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthorizationStatus::NotDetermined => "not_determined",
            AuthorizationStatus::Restricted => "restricted",
            AuthorizationStatus::Denied => "denied",
            AuthorizationStatus::FullAccess => "full_access",
            AuthorizationStatus::WriteOnly => "write_only",
        };
        f.write_str(name)
    }
}

/// What an operation needs from the host permission.
///
/// Anything that reads an entity back, updates included, needs `Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Reminder permission checks and the one-time access request.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationGate {
    timeout: Option<Duration>,
}

impl AuthorizationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound how long [`AuthorizationGate::request`] waits for the host.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    pub fn status<N: NativeStore>(&self, native: &N) -> AuthorizationStatus {
        native.authorization_status(EntityType::Reminder)
    }

    /// Fail fast unless the current status allows `access`. Never prompts.
    pub fn check<N: NativeStore>(&self, native: &N, access: Access) -> Result<()> {
        let status = self.status(native);
        if status.allows(access) {
            Ok(())
        } else {
            tracing::debug!(%status, ?access, "reminders access check failed");
            Err(Error::Unauthorized(status))
        }
    }

    /// Ask the host for full reminders access and block until it answers.
    ///
    /// This may show a permission prompt and wait on a human, so it must not
    /// run on a request-serving path. Once the status has left
    /// `not_determined` the host will not ask again; the current status is
    /// reported without calling into it.
    pub fn request<N: NativeStore>(&self, native: &N) -> Result<bool> {
        let status = self.status(native);
        if status.is_terminal() {
            return Ok(status == AuthorizationStatus::FullAccess);
        }

        tracing::info!("requesting full access to reminders");
        let operation = |completion| native.request_full_access_to_reminders(completion);
        let granted = match self.timeout {
            Some(timeout) => bridge::invoke_with_timeout(operation, timeout)?,
            None => bridge::invoke(operation)?,
        };

        tracing::info!(
            granted,
            status = %self.status(native),
            "reminders access request finished"
        );
        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::memory::MemoryStore;

    #[test]
    fn codes_round_trip() {
        for code in 0..5 {
            let status = AuthorizationStatus::from_code(code).unwrap();
            assert_eq!(status.code(), code);
        }
        assert_eq!(AuthorizationStatus::from_code(7), None);
    }

    #[test]
    fn write_only_allows_writes_but_not_reads() {
        assert!(AuthorizationStatus::WriteOnly.allows(Access::Write));
        assert!(!AuthorizationStatus::WriteOnly.allows(Access::Read));
        assert!(AuthorizationStatus::FullAccess.allows(Access::Read));
        assert!(!AuthorizationStatus::NotDetermined.allows(Access::Write));
    }

    #[test]
    fn check_fails_with_current_status() {
        let native = MemoryStore::builder()
            .authorization(AuthorizationStatus::Denied)
            .build();
        let gate = AuthorizationGate::new();
        assert_eq!(
            gate.check(&native, Access::Read),
            Err(Error::Unauthorized(AuthorizationStatus::Denied))
        );
    }

    #[test]
    fn request_grants_from_not_determined() {
        let native = MemoryStore::builder()
            .authorization(AuthorizationStatus::NotDetermined)
            .grant_on_request(AuthorizationStatus::FullAccess)
            .build();
        let gate = AuthorizationGate::new();

        assert!(gate.request(&native).unwrap());
        assert_eq!(gate.status(&native), AuthorizationStatus::FullAccess);
    }

    #[test]
    fn request_does_not_prompt_again_once_decided() {
        let native = MemoryStore::builder()
            .authorization(AuthorizationStatus::Denied)
            .grant_on_request(AuthorizationStatus::FullAccess)
            .build();
        let gate = AuthorizationGate::new();

        assert!(!gate.request(&native).unwrap());
        assert_eq!(native.access_requests(), 0);
        assert_eq!(gate.status(&native), AuthorizationStatus::Denied);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&AuthorizationStatus::WriteOnly).unwrap();
        assert_eq!(json, r#""write_only""#);
    }
}
