use std::fmt;

use chrono::{DateTime, ParseError, TimeDelta, Utc};

use crate::errors::ResolutionError;

/// Step used when a period's resolution cannot be read.
pub const DEFAULT_RESOLUTION: Resolution = Resolution::from_minutes(60);

/// Fixed step between consecutive points of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    minutes: u32,
}

impl Resolution {
    pub const fn from_minutes(minutes: u32) -> Self {
        Self { minutes }
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// Parses an ISO-8601 duration of the form `PT<n>M`, `n >= 1`.
    pub fn parse(raw: &str) -> Result<Self, ResolutionError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("PT")
            .and_then(|rest| rest.strip_suffix('M'))
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| ResolutionError::Unrecognized(trimmed.to_string()))?;
        let minutes: u32 = digits
            .parse()
            .map_err(|_| ResolutionError::Unrecognized(trimmed.to_string()))?;
        if minutes == 0 {
            return Err(ResolutionError::ZeroStep(trimmed.to_string()));
        }
        Ok(Self::from_minutes(minutes))
    }

    /// Like [`Resolution::parse`], falling back to [`DEFAULT_RESOLUTION`] and
    /// handing back the reason so the caller can report it.
    pub fn parse_or_default(raw: &str) -> (Self, Option<ResolutionError>) {
        match Self::parse(raw) {
            Ok(resolution) => (resolution, None),
            Err(err) => (DEFAULT_RESOLUTION, Some(err)),
        }
    }

    /// Offset of the 1-based `position` from the period start.
    pub fn offset(&self, position: u32) -> Option<TimeDelta> {
        let steps = i64::from(position).checked_sub(1)?;
        let minutes = i64::from(self.minutes).checked_mul(steps)?;
        TimeDelta::try_minutes(minutes)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PT{}M", self.minutes)
    }
}

/// Parses a period anchor such as `2024-01-01T00:00Z` into UTC.
///
/// Seconds are optional; a `Z` suffix or a `+HH:MM` offset is required.
pub fn parse_anchor(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    let trimmed = raw.trim();
    let normalized = match trimmed.strip_suffix(['Z', 'z']) {
        Some(base) => format!("{base}+00:00"),
        None => trimmed.to_string(),
    };

    DateTime::parse_from_rfc3339(&normalized)
        .or_else(|_| DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M%:z"))
        .map(|dt| dt.with_timezone(&Utc))
}
