use std::fmt;

use thiserror::Error;

/// ENTSO-E reason code for "No matching data found".
pub const NO_DATA_REASON_CODE: &str = "999";

#[derive(Debug, Clone)]
pub struct FormatAttempt {
    pub format: &'static str,
    pub message: String,
}

impl FormatAttempt {
    pub fn new(format: &'static str, message: impl Into<String>) -> Self {
        Self {
            format,
            message: message.into(),
        }
    }
}

impl fmt::Display for FormatAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.format, self.message)
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is empty")]
    Empty,

    #[error("malformed XML: {0}")]
    Syntax(String),

    #[error("{format} format mismatch: {reason}")]
    FormatMismatch {
        format: &'static str,
        reason: String,
    },

    #[error("{format} XML error: {source}")]
    Xml {
        format: &'static str,
        #[source]
        source: quick_xml::DeError,
    },

    #[error("ENTSO-E acknowledgement {code}: {text}")]
    Acknowledgement { code: String, text: String },

    #[error("no format recognized this document; attempts: {attempts:?}")]
    NoMatchingFormat { attempts: Vec<FormatAttempt> },
}

impl DocumentError {
    /// True when the platform answered with an acknowledgement saying the query had no data.
    pub fn is_no_data(&self) -> bool {
        matches!(self, DocumentError::Acknowledgement { code, .. } if code == NO_DATA_REASON_CODE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("resolution '{0}' is not of the form PT<minutes>M")]
    Unrecognized(String),
    #[error("resolution '{0}' has a zero-minute step")]
    ZeroStep(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointError {
    #[error("position '{0}' is not an integer")]
    Position(String),
    #[error("position {0} is outside 1..=4294967295")]
    PositionOutOfRange(i64),
    #[error("quantity '{0}' is not a number")]
    Quantity(String),
    #[error("position {0} resolves past the representable time range")]
    TimestampOverflow(u32),
}

#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("series {series} period {period}: malformed start timestamp '{raw}': {source}")]
    MalformedTimestamp {
        series: usize,
        period: usize,
        raw: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("series {series} period {period} point {point}: {reason}")]
    MalformedPoint {
        series: usize,
        period: usize,
        point: usize,
        reason: PointError,
    },
}
