//! DriveDeck Sport (W4) adapter
//!
//! The DriveDeck streams vendor frames prefixed with `B` followed by a
//! two-character group code, and reports the vehicle protocol in frames
//! prefixed with `C`. PID values arrive in vendor codes that are mapped onto
//! the standard catalog through [`DRIVEDECK_TABLE`].

mod cycle;
mod quirk;

pub use cycle::{build_cycle_command, drivedeck_code};
pub use quirk::PidSupportedQuirk;

use crate::adapter::{AdapterProtocol, FrameOutcome, StatusUpdate};
use crate::decode::{DecodeRule, VendorTable};
use crate::fingerprint::Fingerprint;
use crate::framer::{trim_trailing_line_endings, FrameDelimiters};
use crate::quirk::ResponseQuirk;
use obd_protocol::{
    BasicCommand, ObdError, ObdProtocol, Pid, PidSupported, ResponseParser, Result,
    CURRENT_DATA_RESPONSE,
};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const CARRIAGE_RETURN: u8 = b'\r';
pub const END_OF_LINE_RESPONSE: u8 = b'>';

pub(crate) const RESPONSE_PREFIX_CHAR: u8 = b'B';
const PROTOCOL_PREFIX_CHAR: u8 = b'C';
const CYCLIC_TOKEN_SEPARATOR_CHAR: u8 = b'<';

const CONNECTING_GROUP: &str = "14";
const VIN_GROUP: &str = "15";
pub(crate) const SUPPORTED_PIDS_GROUP: &str = "70";
const CONTROL_UNITS_GROUP: &str = "71";
const ENGINE_ON_GROUP: &str = "31";
const ENGINE_OFF_GROUP: &str = "32";

/// More connecting notices than this certify the adapter on their own
const CONNECTING_MESSAGE_THRESHOLD: u32 = 4;
/// Status frames to wait for after certification before streaming starts;
/// PID-supported reports may arrive out of group order.
const CYCLE_FRAME_THRESHOLD: u32 = 7;
const SEND_CYCLIC_COMMAND_DELTA: Duration = Duration::from_secs(60);
const EXPECTED_INIT_PERIOD: Duration = Duration::from_secs(30);

/// Minimum length of a PID data frame: prefix, code, one spare byte, data
const MIN_DATA_FRAME_LEN: usize = 6;
const DATA_OFFSET: usize = 4;
const PAYLOAD_LEN: usize = 6;
/// Minimum length of a `B70` PID-supported report
const MIN_SUPPORTED_REPORT_LEN: usize = 14;

/// Vendor wire codes. RPM also arrives as `51` with its data in bytes 2-3.
pub const DRIVEDECK_TABLE: VendorTable = VendorTable::new(&[
    ("40", DecodeRule::Direct(Pid::Rpm)),
    ("41", DecodeRule::Direct(Pid::Speed)),
    ("42", DecodeRule::Direct(Pid::Maf)),
    ("44", DecodeRule::Direct(Pid::Tps)),
    ("45", DecodeRule::Direct(Pid::CalculatedEngineLoad)),
    ("49", DecodeRule::Direct(Pid::IntakeAirTemp)),
    ("4D", DecodeRule::LambdaProbe { value_offset: 4 }),
    ("51", DecodeRule::Shifted { pid: Pid::Rpm, offset: 2 }),
    ("52", DecodeRule::Direct(Pid::IntakeMap)),
]);

pub struct DriveDeckAdapter {
    fingerprint: Fingerprint,
    parser: ResponseParser,
    logged_wire_codes: HashSet<String>,
}

impl DriveDeckAdapter {
    pub fn new() -> Self {
        Self {
            fingerprint: Fingerprint::new(),
            parser: ResponseParser::new(),
            logged_wire_codes: HashSet::new(),
        }
    }

    fn protocol_from_code(code: &str) -> Option<ObdProtocol> {
        let code: u8 = code.trim().parse().ok()?;
        let protocol = match code {
            1 => ObdProtocol::Can11bit500,
            2 => ObdProtocol::Can11bit250,
            3 => ObdProtocol::Can29bit500,
            4 => ObdProtocol::Can29bit250,
            5 => ObdProtocol::KwpSlow,
            6 => ObdProtocol::KwpFast,
            7 => ObdProtocol::Iso9141,
            _ => return None,
        };
        Some(protocol)
    }

    fn determine_protocol(&mut self, frame: &[u8]) -> FrameOutcome {
        let code = String::from_utf8_lossy(trim_trailing_line_endings(&frame[1..]));
        match Self::protocol_from_code(&code) {
            Some(protocol) if self.fingerprint.detect_protocol(protocol) => {
                FrameOutcome::Status(StatusUpdate::Protocol(protocol))
            }
            Some(_) => FrameOutcome::Skipped,
            None => {
                warn!("Unknown protocol code {:?}", code);
                FrameOutcome::Skipped
            }
        }
    }

    /// `B70` layout: group characters at 6-7, bitmap bytes at 9, 10, 12, 13
    fn process_supported_pids(&mut self, frame: &[u8]) -> Result<FrameOutcome> {
        debug!("PID Supported response: {}", hex::encode(frame));

        if frame.len() < MIN_SUPPORTED_REPORT_LEN {
            info!("PID Supported response too small: {}", frame.len());
            return Ok(FrameOutcome::Skipped);
        }

        let group = std::str::from_utf8(&frame[6..8])
            .map_err(|_| ObdError::MalformedFrame("PID supported group is not ASCII".into()))?;
        let request = PidSupported::new(group)?;

        let bitmap: Vec<u8> = (9..MIN_SUPPORTED_REPORT_LEN)
            .filter(|i| *i != 11)
            .map(|i| frame[i])
            .collect();
        let canonical = format!(
            "{}{}{}",
            CURRENT_DATA_RESPONSE,
            request.group_hex(),
            hex::encode_upper(bitmap)
        );

        let pids = request.parse_pids(canonical.as_bytes())?;
        self.fingerprint.merge_supported(pids.iter().copied());
        Ok(FrameOutcome::Status(StatusUpdate::SupportedPids(pids)))
    }

    fn process_status(&mut self, group: &str, frame: &[u8]) -> Result<FrameOutcome> {
        let outcome = match group {
            CONNECTING_GROUP => {
                debug!("Status: CONNECTING");
                let count = self.fingerprint.count_connecting_message();
                FrameOutcome::Status(StatusUpdate::Connecting(count))
            }
            VIN_GROUP => {
                let vin = String::from_utf8_lossy(trim_trailing_line_endings(&frame[3..]));
                if self.fingerprint.record_vin(&vin) {
                    FrameOutcome::Status(StatusUpdate::Vin(vin.trim().to_string()))
                } else {
                    FrameOutcome::Skipped
                }
            }
            SUPPORTED_PIDS_GROUP => self.process_supported_pids(frame)?,
            CONTROL_UNITS_GROUP => {
                info!("Discovered CUs... ");
                let units = String::from_utf8_lossy(trim_trailing_line_endings(&frame[3..]))
                    .trim()
                    .to_string();
                FrameOutcome::Status(StatusUpdate::ControlUnits(units))
            }
            ENGINE_ON_GROUP => {
                debug!("Engine: On");
                FrameOutcome::Status(StatusUpdate::EngineOn)
            }
            ENGINE_OFF_GROUP => {
                debug!("Engine: Off");
                FrameOutcome::Status(StatusUpdate::EngineOff)
            }
            other => {
                return Err(ObdError::UnmatchedResponse(format!(
                    "{} is not a status group",
                    other
                )))
            }
        };

        if self.has_certified_connection() {
            self.fingerprint.count_frame();
        }

        Ok(outcome)
    }

    fn process_data(&mut self, wire_code: &str, frame: &[u8]) -> Result<FrameOutcome> {
        if frame.len() < MIN_DATA_FRAME_LEN {
            return Err(ObdError::NoDataReceived(format!(
                "the response did only contain {} bytes. For PID responses {} are minimum",
                frame.len(),
                MIN_DATA_FRAME_LEN
            )));
        }

        // echo of our own cycle command
        if frame[DATA_OFFSET] == CYCLIC_TOKEN_SEPARATOR_CHAR {
            return Ok(FrameOutcome::Skipped);
        }

        let mut payload: Vec<u8> = frame[DATA_OFFSET..]
            .iter()
            .copied()
            .filter(|b| *b != CYCLIC_TOKEN_SEPARATOR_CHAR)
            .take(PAYLOAD_LEN)
            .collect();
        payload.resize(PAYLOAD_LEN, 0);

        if self.logged_wire_codes.insert(wire_code.to_string()) {
            info!("First response for PID: {}; raw: {}", wire_code, hex::encode(&payload));
        }

        let rule = DRIVEDECK_TABLE
            .lookup(wire_code)
            .ok_or_else(|| ObdError::UnrecognizedPid(wire_code.to_string()))?;
        let (pid, data) = rule.resolve(&payload, self.fingerprint.supported_pids());

        let canonical = format!(
            "{}{}{}",
            CURRENT_DATA_RESPONSE,
            pid.hex_code(),
            hex::encode_upper(data)
        );
        let response = self.parser.parse(canonical.as_bytes())?;
        Ok(FrameOutcome::Data(response))
    }
}

impl Default for DriveDeckAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterProtocol for DriveDeckAdapter {
    fn name(&self) -> &'static str {
        "DriveDeck Sport"
    }

    fn delimiters(&self) -> FrameDelimiters {
        FrameDelimiters {
            command_terminator: CARRIAGE_RETURN,
            response_terminator: END_OF_LINE_RESPONSE,
        }
    }

    fn supports_device(&self, device_name: &str) -> bool {
        let name = device_name.to_lowercase();
        name.contains("drivedeck") && name.contains("w4")
    }

    /// A VIN or protocol report is only ever sent by a DriveDeck. A single
    /// connecting notice could come from any adapter, several in a row do not.
    fn has_certified_connection(&self) -> bool {
        self.fingerprint.vin().is_some()
            || self.fingerprint.protocol().is_known()
            || self.fingerprint.connecting_messages() > CONNECTING_MESSAGE_THRESHOLD
    }

    fn has_established_connection(&self) -> bool {
        self.fingerprint.vin().is_some() || self.fingerprint.protocol().is_known()
    }

    fn expected_init_period(&self) -> Duration {
        EXPECTED_INIT_PERIOD
    }

    fn keepalive_interval(&self) -> Duration {
        SEND_CYCLIC_COMMAND_DELTA
    }

    fn initial_commands(&self) -> Vec<BasicCommand> {
        vec![BasicCommand::carriage_return()]
    }

    fn quirk(&self) -> Box<dyn ResponseQuirk> {
        Box::new(PidSupportedQuirk)
    }

    fn decode_frame(&mut self, frame: &[u8]) -> Result<FrameOutcome> {
        let Some(&kind) = frame.first() else {
            return Err(ObdError::NoDataReceived("empty frame".into()));
        };

        match kind {
            RESPONSE_PREFIX_CHAR => {
                if frame.len() < 3 {
                    return Err(ObdError::NoDataReceived(format!(
                        "Received a response with too less bytes. length={}",
                        frame.len()
                    )));
                }
                let code = std::str::from_utf8(&frame[1..3])
                    .map_err(|_| ObdError::MalformedFrame("group code is not ASCII".into()))?
                    .to_ascii_uppercase();

                match code.as_str() {
                    CONNECTING_GROUP | VIN_GROUP | SUPPORTED_PIDS_GROUP | CONTROL_UNITS_GROUP
                    | ENGINE_ON_GROUP | ENGINE_OFF_GROUP => self.process_status(&code, frame),
                    _ => self.process_data(&code, frame),
                }
            }
            PROTOCOL_PREFIX_CHAR => Ok(self.determine_protocol(frame)),
            other => Err(ObdError::UnmatchedResponse(format!(
                "unexpected response prefix {:?}",
                other as char
            ))),
        }
    }

    /// PID-supported reports may come out of order (group 40 before 20), so
    /// a few more status frames are awaited before streaming starts.
    fn check_for_cycle_command(&mut self) -> Option<BasicCommand> {
        if self.fingerprint.cycle_command().is_some()
            || self.fingerprint.pid_supported_reports() == 0
            || self.fingerprint.frames_since_certification() <= CYCLE_FRAME_THRESHOLD
        {
            return None;
        }

        info!("Received PID supported responses and enough responses to start pulling data. Creating cycle command");
        let command = build_cycle_command(self.fingerprint.supported_pids());
        info!("Static Cycle Command: {}", hex::encode(command.output_bytes()));
        self.fingerprint.set_cycle_command(command.clone());
        Some(command)
    }

    fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}
