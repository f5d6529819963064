//! OBD-II Error Types

use thiserror::Error;

/// Errors that can occur while talking to an OBD-II adapter
#[derive(Debug, Error)]
pub enum ObdError {
    /// Command or configuration parameters are out of bounds
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Frame is structurally invalid or too short for its PID
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Adapter answered without usable payload
    #[error("No data received: {0}")]
    NoDataReceived(String),

    /// Frame decoded fine but the PID is not in the catalog
    #[error("Unrecognized PID: {0}")]
    UnrecognizedPid(String),

    /// Frame does not match any expected discriminator
    #[error("Unmatched response: {0}")]
    UnmatchedResponse(String),

    /// Adapter is still searching for a vehicle protocol
    #[error("Adapter is still searching for a vehicle protocol")]
    AdapterSearching,

    /// Neither the primary nor the fallback connection strategy worked
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Operation attempted after the engine was closed
    #[error("Adapter engine is closed")]
    EngineClosed,

    /// Timeout waiting for the adapter
    #[error("Timeout waiting for OBD adapter after {0}ms")]
    Timeout(u64),

    /// Serial port / socket I/O error
    #[error("Serial port error: {0}")]
    SerialError(String),
}

impl ObdError {
    /// Frame-level errors only affect the frame they were raised for.
    /// The connection carries on after logging them.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            ObdError::MalformedFrame(_)
                | ObdError::NoDataReceived(_)
                | ObdError::UnrecognizedPid(_)
                | ObdError::UnmatchedResponse(_)
                | ObdError::AdapterSearching
        )
    }
}

impl From<std::io::Error> for ObdError {
    fn from(err: std::io::Error) -> Self {
        ObdError::SerialError(err.to_string())
    }
}

/// Result alias used across the OBD crates
pub type Result<T> = std::result::Result<T, ObdError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_errors_are_not_fatal() {
        assert!(ObdError::MalformedFrame("short".into()).is_frame_error());
        assert!(ObdError::NoDataReceived("empty".into()).is_frame_error());
        assert!(ObdError::UnrecognizedPid("FF".into()).is_frame_error());
        assert!(!ObdError::EngineClosed.is_frame_error());
        assert!(!ObdError::TransportUnavailable("refused".into()).is_frame_error());
        assert!(!ObdError::InvalidConfiguration("lines".into()).is_frame_error());
    }
}
