use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub mod car;
pub mod remocon;

/// Reading stored for every numeric field until a poll succeeds.
pub const NO_READING: f64 = -99.0;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("invalid sensor payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} reading {value} is out of range")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Last confirmed sensor snapshot of a device.
///
/// `Default` is the sentinel snapshot meaning "no reading yet"; a
/// snapshot is only ever replaced whole, by `Default` or by a parsed
/// payload.
pub trait Telemetry: Clone + Default + Send + 'static {
    fn from_body(body: &str) -> Result<Self, PayloadError>;
}

// Devices send numbers either bare or quoted, e.g. `{"d": 42}` or `{"d": "42"}`
fn deserialize_reading<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Number(value) => value,
        Raw::Text(text) => text.trim().parse::<f64>().map_err(serde::de::Error::custom)?,
    };
    if !value.is_finite() {
        return Err(serde::de::Error::custom(format!("{} is not a finite reading", value)));
    }
    Ok(value)
}
