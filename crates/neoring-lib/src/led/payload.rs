//! Set-color command parsing and status payload formatting.
//!
//! Inbound set-color payloads are JSON objects with keys `r`, `g`, `b` and an
//! optional `time`. Values are coerced the way a small embedded JSON reader
//! would: anything missing, non-numeric or out of range becomes 0.

use serde::Serialize;
use serde_json::Value;

use super::Rgb;
use crate::NeoringError;

/// A parsed set-color request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetColorCommand {
    pub color: Rgb,
    /// Fade duration. 0 means set immediately.
    pub time: u16,
}

impl SetColorCommand {
    /// Parse a set-color payload.
    ///
    /// The payload is read as text up to the first NUL byte. Invalid JSON and
    /// JSON that is not an object are rejected as malformed.
    pub fn parse(payload: &[u8]) -> crate::error::Result<Self> {
        let text = payload.split(|&b| b == 0).next().unwrap_or_default();
        let value: Value = serde_json::from_slice(text)
            .map_err(|e| NeoringError::Payload(format!("deserialization failed: {e}")))?;
        let Value::Object(map) = value else {
            return Err(NeoringError::Payload("expected a JSON object".into()));
        };

        Ok(SetColorCommand {
            color: Rgb {
                r: coerce(map.get("r")),
                g: coerce(map.get("g")),
                b: coerce(map.get("b")),
            },
            time: coerce(map.get("time")),
        })
    }

    /// True when the command asks for a timed fade rather than an immediate set.
    pub fn is_fade(&self) -> bool {
        self.time > 0
    }
}

/// Coerce a JSON value into an unsigned integer type, defaulting to 0.
fn coerce<T: TryFrom<u64> + Default>(value: Option<&Value>) -> T {
    let Some(value) = value else {
        return T::default();
    };
    let raw = match value.as_u64() {
        Some(n) => Some(n),
        None => value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.trunc() as u64),
    };
    raw.and_then(|n| T::try_from(n).ok()).unwrap_or_default()
}

/// Outbound status message: the ring's current color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusPayload {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl StatusPayload {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<Rgb> for StatusPayload {
    fn from(c: Rgb) -> Self {
        StatusPayload {
            r: c.r,
            g: c.g,
            b: c.b,
        }
    }
}
