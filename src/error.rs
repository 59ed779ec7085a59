use std::time::Duration;

use thiserror::Error;

use crate::calendar::AuthorizationStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(String),
    #[error("reminders access not granted (status: {0})")]
    Unauthorized(AuthorizationStatus),
    #[error("invalid date components: {0}")]
    InvalidDateComponents(String),
    #[error("{0}")]
    SaveFailed(String),
    #[error("native error: {0}")]
    Native(String),
    #[error("completion resolved without a result")]
    NoResult,
    #[error("completion did not resolve within {0:?}")]
    Timeout(Duration),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} is not supported")]
    Unsupported(&'static str),
}

impl Error {
    /// HTTP status a routing layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::SaveFailed(_) | Error::InvalidDateComponents(_) | Error::InvalidInput(_) => 400,
            Error::Unauthorized(_) => 403,
            Error::Unsupported(_) => 501,
            Error::Native(_) | Error::NoResult | Error::Timeout(_) => 500,
        }
    }

    /// Whether the failure came from the caller's input rather than the host.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::InvalidDateComponents(_) | Error::InvalidInput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(Error::NotFound("reminder list".into()).status_code(), 404);
    }

    #[test]
    fn value_errors_map_to_400() {
        assert_eq!(Error::SaveFailed("Failed to save reminder".into()).status_code(), 400);
        assert_eq!(Error::InvalidDateComponents("month 13".into()).status_code(), 400);
    }

    #[test]
    fn unauthorized_maps_to_403() {
        let err = Error::Unauthorized(AuthorizationStatus::Denied);
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.to_string(), "reminders access not granted (status: denied)");
    }

    #[test]
    fn native_failures_are_not_caller_errors() {
        assert!(!Error::Native("boom".into()).is_caller_error());
        assert!(!Error::NoResult.is_caller_error());
        assert!(Error::NotFound("reminder".into()).is_caller_error());
    }
}
