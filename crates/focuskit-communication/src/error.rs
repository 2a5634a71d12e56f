//! Error types for the communication crate.

use thiserror::Error;

/// Errors raised by collaborator links and the runtime handle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinkError {
    /// The motion controller link is down
    #[error("Motion controller not connected")]
    NotConnected,

    /// A command could not be delivered
    #[error("Failed to send '{command}': {reason}")]
    SendFailed {
        /// The command line, without its newline
        command: String,
        /// Why delivery failed
        reason: String,
    },

    /// The scan program player rejected a request
    #[error("Scan player error: {0}")]
    Player(String),

    /// The runtime is no longer receiving events
    #[error("Automation runtime stopped")]
    RuntimeStopped,
}

/// Result type alias for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error_display() {
        let err = LinkError::SendFailed {
            command: "M24".to_string(),
            reason: "port closed".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to send 'M24': port closed");
        assert_eq!(
            LinkError::RuntimeStopped.to_string(),
            "Automation runtime stopped"
        );
    }
}
