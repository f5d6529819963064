//! OBD-II PID Catalog
//!
//! Defines the Mode 01 Parameter IDs (PIDs) understood by the engine and their
//! SAE J1979 decoding formulas.

use crate::error::{ObdError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Physical unit implied by a PID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Percent,
    Celsius,
    KiloPascal,
    Rpm,
    KilometersPerHour,
    GramsPerSecond,
    Volt,
    MilliAmpere,
    /// Enumerated / bit-coded value without a physical unit
    Raw,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Percent => "%",
            Unit::Celsius => "°C",
            Unit::KiloPascal => "kPa",
            Unit::Rpm => "rpm",
            Unit::KilometersPerHour => "km/h",
            Unit::GramsPerSecond => "g/s",
            Unit::Volt => "V",
            Unit::MilliAmpere => "mA",
            Unit::Raw => "",
        }
    }
}

/// Mode 01 PIDs known to the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Pid {
    /// Fuel system status (0x03)
    FuelSystemStatus = 0x03,
    /// Calculated engine load (0x04)
    CalculatedEngineLoad = 0x04,
    /// Engine coolant temperature (0x05)
    CoolantTemp = 0x05,
    /// Short-term fuel trim bank 1 (0x06)
    ShortTermFuelTrim = 0x06,
    /// Long-term fuel trim bank 1 (0x07)
    LongTermFuelTrim = 0x07,
    /// Fuel pressure (0x0A)
    FuelPressure = 0x0A,
    /// Intake manifold absolute pressure (0x0B)
    IntakeMap = 0x0B,
    /// Engine RPM (0x0C)
    Rpm = 0x0C,
    /// Vehicle speed (0x0D)
    Speed = 0x0D,
    /// Intake air temperature (0x0F)
    IntakeAirTemp = 0x0F,
    /// Mass air flow rate (0x10)
    Maf = 0x10,
    /// Throttle position (0x11)
    Tps = 0x11,
    /// Wide-band O2 sensor 1, equivalence ratio + voltage (0x24)
    O2LambdaProbe1Voltage = 0x24,
    /// Wide-band O2 sensor 1, equivalence ratio + current (0x34)
    O2LambdaProbe1Current = 0x34,
}

impl Pid {
    /// Every PID in the catalog, ordered by code
    pub const ALL: [Pid; 14] = [
        Pid::FuelSystemStatus,
        Pid::CalculatedEngineLoad,
        Pid::CoolantTemp,
        Pid::ShortTermFuelTrim,
        Pid::LongTermFuelTrim,
        Pid::FuelPressure,
        Pid::IntakeMap,
        Pid::Rpm,
        Pid::Speed,
        Pid::IntakeAirTemp,
        Pid::Maf,
        Pid::Tps,
        Pid::O2LambdaProbe1Voltage,
        Pid::O2LambdaProbe1Current,
    ];

    /// Get the PID hex value
    pub fn as_hex(&self) -> u8 {
        *self as u8
    }

    /// Two-digit uppercase hexadecimal representation, e.g. "0C"
    pub fn hex_code(&self) -> String {
        format!("{:02X}", self.as_hex())
    }

    /// Look up a PID by its numeric code
    pub fn from_code(code: u8) -> Option<Pid> {
        Self::ALL.iter().copied().find(|p| p.as_hex() == code)
    }

    /// Look up a PID by its two-digit hexadecimal code (case-insensitive)
    pub fn from_hex(code: &str) -> Option<Pid> {
        if code.len() != 2 {
            return None;
        }
        u8::from_str_radix(code, 16).ok().and_then(Self::from_code)
    }

    /// Stable machine name
    pub fn name(&self) -> &'static str {
        match self {
            Pid::FuelSystemStatus => "fuel_system_status",
            Pid::CalculatedEngineLoad => "engine_load",
            Pid::CoolantTemp => "coolant_temp",
            Pid::ShortTermFuelTrim => "short_term_fuel_trim",
            Pid::LongTermFuelTrim => "long_term_fuel_trim",
            Pid::FuelPressure => "fuel_pressure",
            Pid::IntakeMap => "intake_map",
            Pid::Rpm => "rpm",
            Pid::Speed => "speed",
            Pid::IntakeAirTemp => "intake_air_temp",
            Pid::Maf => "maf",
            Pid::Tps => "throttle_position",
            Pid::O2LambdaProbe1Voltage => "o2_lambda_probe_1_voltage",
            Pid::O2LambdaProbe1Current => "o2_lambda_probe_1_current",
        }
    }

    /// Get the number of data bytes the formula consumes
    pub fn data_bytes(&self) -> usize {
        match self {
            Pid::Rpm | Pid::Maf => 2,
            Pid::O2LambdaProbe1Voltage | Pid::O2LambdaProbe1Current => 4,
            _ => 1,
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            Pid::FuelSystemStatus => Unit::Raw,
            Pid::CalculatedEngineLoad
            | Pid::ShortTermFuelTrim
            | Pid::LongTermFuelTrim
            | Pid::Tps => Unit::Percent,
            Pid::CoolantTemp | Pid::IntakeAirTemp => Unit::Celsius,
            Pid::FuelPressure | Pid::IntakeMap => Unit::KiloPascal,
            Pid::Rpm => Unit::Rpm,
            Pid::Speed => Unit::KilometersPerHour,
            Pid::Maf => Unit::GramsPerSecond,
            Pid::O2LambdaProbe1Voltage => Unit::Volt,
            Pid::O2LambdaProbe1Current => Unit::MilliAmpere,
        }
    }

    /// Decode data bytes into the physical value.
    ///
    /// Lambda probes additionally yield the equivalence ratio (bytes A, B);
    /// the returned value is the probe voltage / current (bytes C, D).
    /// Bytes beyond [`Pid::data_bytes`] are ignored.
    pub fn decode(&self, bytes: &[u8]) -> Result<(f64, Option<f64>)> {
        if bytes.len() < self.data_bytes() {
            return Err(ObdError::MalformedFrame(format!(
                "PID {} needs {} data bytes, got {}",
                self.hex_code(),
                self.data_bytes(),
                bytes.len()
            )));
        }

        let a = bytes[0] as f64;
        let word = |hi: usize| (bytes[hi] as f64 * 256.0) + bytes[hi + 1] as f64;

        let decoded = match self {
            // A (bit-coded loop status)
            Pid::FuelSystemStatus => (a, None),
            // A * 100 / 255 (%)
            Pid::CalculatedEngineLoad | Pid::Tps => (a * 100.0 / 255.0, None),
            // A - 40 (°C)
            Pid::CoolantTemp | Pid::IntakeAirTemp => (a - 40.0, None),
            // (A - 128) * 100 / 128 (%)
            Pid::ShortTermFuelTrim | Pid::LongTermFuelTrim => ((a - 128.0) * 100.0 / 128.0, None),
            // 3 * A (kPa)
            Pid::FuelPressure => (a * 3.0, None),
            // A (kPa), A (km/h)
            Pid::IntakeMap | Pid::Speed => (a, None),
            // ((A*256)+B)/4
            Pid::Rpm => (word(0) / 4.0, None),
            // ((A*256)+B) / 100 (g/s)
            Pid::Maf => (word(0) / 100.0, None),
            // ER = ((A*256)+B) * 2 / 65536, V = ((C*256)+D) * 8 / 65536
            Pid::O2LambdaProbe1Voltage => {
                (word(2) * 8.0 / 65536.0, Some(word(0) * 2.0 / 65536.0))
            }
            // ER = ((A*256)+B) / 32768, mA = ((C*256)+D) / 256 - 128
            Pid::O2LambdaProbe1Current => {
                (word(2) / 256.0 - 128.0, Some(word(0) / 32768.0))
            }
        };

        Ok(decoded)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.hex_code())
    }
}

impl FromStr for Pid {
    type Err = ObdError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .or_else(|| Self::from_hex(s))
            .ok_or_else(|| ObdError::UnrecognizedPid(s.to_string()))
    }
}
