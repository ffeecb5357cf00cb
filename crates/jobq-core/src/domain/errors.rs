//! Error types.

use thiserror::Error;

/// Errors visible to callers of the queue engine.
///
/// Dispatch failures never show up here: they are absorbed by the retry
/// logic and reported through job records, events and metrics.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("queue engine has been shut down")]
    ShutDown,

    #[error("failed to encode job payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Failure reported by a job handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap any error, keeping its display text.
    pub fn from_error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        Self::new(err.to_string())
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_displays_message() {
        let err = HandlerError::from("smtp unavailable");
        assert_eq!(err.to_string(), "smtp unavailable");
        assert_eq!(err.message(), "smtp unavailable");
    }

    #[test]
    fn handler_error_wraps_other_errors() {
        let io = std::io::Error::other("disk full");
        let err = HandlerError::from_error(&io);
        assert_eq!(err.message(), "disk full");
    }

    #[test]
    fn payload_error_converts() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: EngineError = json_err.into();
        assert!(err.to_string().starts_with("failed to encode job payload"));
    }
}
