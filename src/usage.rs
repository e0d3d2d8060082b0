//! Usage payload types and display helpers.
//!
//! A nominal `Success` only guarantees well-formed JSON. Whether the payload
//! actually carries a usable five-hour window is the consumer's last-mile
//! check, performed through [`UsagePayload::five_hour_window`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Top-level usage document returned by the organization API.
///
/// Only `five_hour` is interpreted. Every other field (`seven_day` included)
/// is retained verbatim in `rest` for callers that want to forward it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsagePayload {
    #[serde(default)]
    pub five_hour: Option<WindowPayload>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Raw five-hour window as sent on the wire; fields may be missing or junk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowPayload {
    #[serde(default)]
    pub utilization: Option<f64>,
    #[serde(default)]
    pub resets_at: Option<String>,
}

/// Validated five-hour window.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageWindow {
    /// Percentage of the window consumed, 0-100, possibly fractional.
    pub utilization: f64,
    /// Moment the window resets.
    pub resets_at: DateTime<Utc>,
}

/// Ways a 2xx payload can still be unusable.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("payload has no five_hour window")]
    MissingWindow,
    #[error("five_hour.utilization is missing or not a finite number")]
    BadUtilization,
    #[error("five_hour.resets_at is missing or not a valid timestamp: {0}")]
    BadTimestamp(String),
}

impl UsagePayload {
    /// Validate the five-hour window, the only part of the payload the core
    /// contract interprets.
    pub fn five_hour_window(&self) -> Result<UsageWindow, ShapeError> {
        let window = self.five_hour.as_ref().ok_or(ShapeError::MissingWindow)?;

        let utilization = window
            .utilization
            .filter(|value| value.is_finite())
            .ok_or(ShapeError::BadUtilization)?;

        let raw_ts = window
            .resets_at
            .as_deref()
            .ok_or_else(|| ShapeError::BadTimestamp("field absent".to_string()))?;
        let resets_at = DateTime::parse_from_rfc3339(raw_ts)
            .map_err(|err| ShapeError::BadTimestamp(err.to_string()))?
            .with_timezone(&Utc);

        Ok(UsageWindow {
            utilization,
            resets_at,
        })
    }
}

/// Round and clamp a utilization value into a displayable 0-100 percentage.
/// Non-finite input collapses to 0.
pub fn clamp_percent(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

/// Percentage of the window still available.
pub fn percent_left(utilization: f64) -> u8 {
    100 - clamp_percent(utilization)
}
