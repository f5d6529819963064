//! Response Parsing
//!
//! Turns a canonical Mode 01 response (`"41" || PID || data`, ASCII hex) into a
//! typed [`DataResponse`].

use crate::error::{ObdError, Result};
use crate::pid::{Pid, Unit};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Response type of a positive Mode 01 reply
pub const CURRENT_DATA_RESPONSE: &str = "41";

/// Decoded value of one PID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    /// The PID the value belongs to
    pub pid: Pid,
    /// Physical value in [`DataResponse::unit`]
    pub value: f64,
    /// Unit implied by the PID
    pub unit: Unit,
    /// Equivalence ratio (lambda) reported alongside wide-band probe values
    pub equivalence_ratio: Option<f64>,
    /// Timestamp when the response was decoded (Unix ms)
    pub timestamp_ms: u64,
}

impl fmt::Display for DataResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.pid, self.value)?;
        let symbol = self.unit.symbol();
        if !symbol.is_empty() {
            write!(f, " {}", symbol)?;
        }
        if let Some(ratio) = self.equivalence_ratio {
            write!(f, " (lambda {:.3})", ratio)?;
        }
        Ok(())
    }
}

pub(crate) fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Strips whitespace and uppercases an ASCII response. Non-ASCII bytes become
/// `.` so the result can be sliced by byte offset.
pub(crate) fn normalize(frame: &[u8]) -> String {
    frame
        .iter()
        .filter(|b| !b.is_ascii_whitespace())
        .map(|b| if b.is_ascii() { b.to_ascii_uppercase() as char } else { '.' })
        .collect()
}

/// Map adapter status words to errors. `Ok(())` means the frame looks like data.
pub(crate) fn check_status_words(normalized: &str) -> Result<()> {
    if normalized.is_empty() {
        return Err(ObdError::NoDataReceived("empty response".to_string()));
    }
    if normalized.contains("SEARCHING") {
        return Err(ObdError::AdapterSearching);
    }
    if normalized.contains("NODATA") {
        return Err(ObdError::NoDataReceived(normalized.to_string()));
    }
    if normalized.contains("STOPPED")
        || normalized.contains("ERROR")
        || normalized.contains("UNABLETOCONNECT")
        || normalized.starts_with('?')
    {
        return Err(ObdError::UnmatchedResponse(normalized.to_string()));
    }
    Ok(())
}

/// Stateless, table-driven decoder for canonical Mode 01 frames
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// Decode one canonical frame
    pub fn parse(&self, frame: &[u8]) -> Result<DataResponse> {
        let normalized = normalize(frame);
        check_status_words(&normalized)?;

        if normalized.len() < 4 {
            return Err(ObdError::MalformedFrame(format!(
                "frame {:?} is shorter than response type + PID",
                normalized
            )));
        }

        let (response_type, rest) = normalized.split_at(2);
        if response_type != CURRENT_DATA_RESPONSE {
            return Err(ObdError::UnmatchedResponse(format!(
                "unexpected response type {}",
                response_type
            )));
        }

        let (pid_code, data_hex) = rest.split_at(2);
        let pid = Pid::from_hex(pid_code)
            .ok_or_else(|| ObdError::UnrecognizedPid(pid_code.to_string()))?;

        let data = hex::decode(data_hex).map_err(|e| {
            ObdError::MalformedFrame(format!("PID {} payload {:?}: {}", pid_code, data_hex, e))
        })?;

        let (value, equivalence_ratio) = pid.decode(&data)?;
        let response = DataResponse {
            pid,
            value,
            unit: pid.unit(),
            equivalence_ratio,
            timestamp_ms: unix_millis(),
        };
        trace!("Decoded {}", response);
        Ok(response)
    }
}

/// Latest decoded value per sensor, as handed to the trip recorder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    /// Timestamp of the most recent update (Unix ms)
    pub timestamp_ms: u64,
    pub rpm: Option<f64>,
    pub speed: Option<f64>,
    pub engine_load: Option<f64>,
    pub coolant_temp: Option<f64>,
    pub intake_map: Option<f64>,
    pub intake_air_temp: Option<f64>,
    pub maf: Option<f64>,
    pub throttle_position: Option<f64>,
    pub fuel_pressure: Option<f64>,
    pub short_term_fuel_trim: Option<f64>,
    pub long_term_fuel_trim: Option<f64>,
    pub lambda_voltage: Option<f64>,
    pub lambda_current: Option<f64>,
    pub equivalence_ratio: Option<f64>,
}

impl SensorFrame {
    /// Create a new empty frame with the given timestamp
    pub fn new(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            ..Default::default()
        }
    }

    /// Update a field from a decoded response
    pub fn update_from_response(&mut self, response: &DataResponse) {
        let value = Some(response.value);
        match response.pid {
            Pid::Rpm => self.rpm = value,
            Pid::Speed => self.speed = value,
            Pid::CalculatedEngineLoad => self.engine_load = value,
            Pid::CoolantTemp => self.coolant_temp = value,
            Pid::IntakeMap => self.intake_map = value,
            Pid::IntakeAirTemp => self.intake_air_temp = value,
            Pid::Maf => self.maf = value,
            Pid::Tps => self.throttle_position = value,
            Pid::FuelPressure => self.fuel_pressure = value,
            Pid::ShortTermFuelTrim => self.short_term_fuel_trim = value,
            Pid::LongTermFuelTrim => self.long_term_fuel_trim = value,
            Pid::O2LambdaProbe1Voltage => self.lambda_voltage = value,
            Pid::O2LambdaProbe1Current => self.lambda_current = value,
            Pid::FuelSystemStatus => {}
        }
        if response.equivalence_ratio.is_some() {
            self.equivalence_ratio = response.equivalence_ratio;
        }
        self.timestamp_ms = self.timestamp_ms.max(response.timestamp_ms);
    }
}
