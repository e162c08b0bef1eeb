use serde::Deserialize;

use super::{deserialize_reading, PayloadError, Telemetry, NO_READING};

/// Readings below this are treated as a broken temperature sensor.
const MIN_TEMPERATURE: f64 = -50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct HubTelemetry {
    pub temperature: f64,
    pub humidity: f64,
    pub illuminance: f64,
}

impl Default for HubTelemetry {
    fn default() -> Self {
        Self {
            temperature: NO_READING,
            humidity: NO_READING,
            illuminance: NO_READING,
        }
    }
}

/// Body of `/update`.
#[derive(Debug, Deserialize)]
struct EnvironmentPayload {
    #[serde(deserialize_with = "deserialize_reading")]
    t: f64,
    #[serde(deserialize_with = "deserialize_reading")]
    h: f64,
    #[serde(deserialize_with = "deserialize_reading")]
    l: f64,
}

impl Telemetry for HubTelemetry {
    fn from_body(body: &str) -> Result<Self, PayloadError> {
        let payload: EnvironmentPayload = serde_json::from_str(body)?;
        if payload.t <= MIN_TEMPERATURE {
            return Err(PayloadError::OutOfRange {
                field: "temperature",
                value: payload.t,
            });
        }

        Ok(Self {
            temperature: payload.t,
            humidity: payload.h,
            illuminance: payload.l,
        })
    }
}
