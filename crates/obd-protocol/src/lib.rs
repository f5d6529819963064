//! OBD-II Protocol Primitives
//!
//! PID catalog, request commands, and the Mode 01 response parser shared by
//! the adapter engine and its transports.

mod command;
mod error;
mod pid;
mod protocol;
mod response;
mod supported;

pub use command::{BasicCommand, CommandKind, MAX_EXPECTED_LINES};
pub use error::{ObdError, Result};
pub use pid::{Pid, Unit};
pub use protocol::ObdProtocol;
pub use response::{DataResponse, ResponseParser, SensorFrame, CURRENT_DATA_RESPONSE};
pub use supported::PidSupported;

/// OBD-II mode strings as sent on the wire
pub mod mode {
    /// Current data
    pub const CURRENT_DATA: &str = "01";
}
