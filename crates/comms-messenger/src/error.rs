//! Messenger errors.

use thiserror::Error;

/// Errors from registry operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MessengerError {
    /// The control loop has shut down.
    #[error("messenger stopped")]
    Stopped,
}

/// Convenience result type for messenger operations.
pub type Result<T> = std::result::Result<T, MessengerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_display() {
        assert_eq!(MessengerError::Stopped.to_string(), "messenger stopped");
    }
}
