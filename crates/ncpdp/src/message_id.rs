//! Time-derived message identifiers.
//!
//! Format: `MSG<unix-milliseconds>`, for example `MSG1705314600000`.
//!
//! The identifier is derived from a timestamp supplied by the caller rather than from a
//! global clock, so rendering stays deterministic. Two messages rendered in the same
//! millisecond share an identifier; the downstream intake service assigns its own
//! prescription id, so this is only a correlation token.

use crate::NcpdpError;
use chrono::{DateTime, Utc};
use std::{fmt, str::FromStr};

/// Prefix for every message identifier.
pub const MESSAGE_ID_PREFIX: &str = "MSG";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId {
    millis: i64,
}

impl MessageId {
    /// Derive the identifier for a message issued at `issued_at`.
    pub fn from_time(issued_at: DateTime<Utc>) -> Self {
        Self {
            millis: issued_at.timestamp_millis(),
        }
    }

    /// The instant this identifier was derived from, truncated to milliseconds.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.millis)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{MESSAGE_ID_PREFIX}{}", self.millis)
    }
}

impl FromStr for MessageId {
    type Err = NcpdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(MESSAGE_ID_PREFIX)
            .ok_or_else(|| NcpdpError::InvalidMessageId(format!("missing 'MSG' prefix: '{s}'")))?;

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NcpdpError::InvalidMessageId(format!(
                "expected milliseconds after prefix: '{s}'"
            )));
        }

        let millis = digits
            .parse::<i64>()
            .map_err(|e| NcpdpError::InvalidMessageId(format!("'{s}': {e}")))?;

        if DateTime::from_timestamp_millis(millis).is_none() {
            return Err(NcpdpError::InvalidMessageId(format!(
                "timestamp out of range: '{s}'"
            )));
        }

        Ok(Self { millis })
    }
}
