use serde::Deserialize;
use std::fmt;

use super::{deserialize_reading, PayloadError, Telemetry, NO_READING};

/// State of one of the car's infrared line sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IrState {
    Detected,
    #[default]
    NotDetected,
}

impl IrState {
    /// The device reports `L` for a detection; anything else is a miss.
    fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("L") => Self::Detected,
            _ => Self::NotDetected,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Detected => "detected",
            Self::NotDetected => "not detected",
        }
    }
}

impl fmt::Display for IrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarTelemetry {
    /// Centimetres to the nearest obstacle.
    pub distance: f64,
    pub right_ir: IrState,
    pub left_ir: IrState,
}

impl Default for CarTelemetry {
    fn default() -> Self {
        Self {
            distance: NO_READING,
            right_ir: IrState::NotDetected,
            left_ir: IrState::NotDetected,
        }
    }
}

/// Body of `/update_d`.
#[derive(Debug, Deserialize)]
struct DistancePayload {
    #[serde(deserialize_with = "deserialize_reading")]
    d: f64,
    #[serde(default)]
    r: Option<serde_json::Value>,
    #[serde(default)]
    l: Option<serde_json::Value>,
}

impl Telemetry for CarTelemetry {
    fn from_body(body: &str) -> Result<Self, PayloadError> {
        let payload: DistancePayload = serde_json::from_str(body)?;
        if payload.d < 0.0 {
            return Err(PayloadError::OutOfRange {
                field: "distance",
                value: payload.d,
            });
        }

        Ok(Self {
            distance: payload.d,
            right_ir: IrState::from_code(payload.r.as_ref().and_then(|v| v.as_str())),
            left_ir: IrState::from_code(payload.l.as_ref().and_then(|v| v.as_str())),
        })
    }
}
