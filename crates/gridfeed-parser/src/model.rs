//! Parsed ENTSO-E document and the flat records derived from it.
//!
//! Leaf values stay as the text that appeared in the XML; validation of
//! timestamps, resolutions and point values happens in the flattener.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label given to series that carry no production type.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub header: DocumentHeader,
    pub series: Vec<Series>,
}

impl Document {
    pub fn new(series: Vec<Series>) -> Self {
        Self {
            header: DocumentHeader::default(),
            series,
        }
    }

    pub fn point_count(&self) -> usize {
        self.series
            .iter()
            .flat_map(|series| series.periods.iter())
            .map(|period| period.points.len())
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHeader {
    pub mrid: Option<String>,
    pub revision_number: Option<String>,
    pub doc_type: Option<String>,
    pub process_type: Option<String>,
    pub created_date_time: Option<String>,
    pub interval_start: Option<String>,
    pub interval_end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Series {
    pub mrid: Option<String>,
    pub business_type: Option<String>,
    pub psr_type: Option<String>,
    pub unit: Option<String>,
    pub periods: Vec<Period>,
}

impl Series {
    pub fn new(psr_type: impl Into<String>) -> Self {
        Self {
            psr_type: Some(psr_type.into()),
            ..Self::default()
        }
    }

    pub fn unlabeled() -> Self {
        Self::default()
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.periods.push(period);
        self
    }

    /// Production type of the series, or `None` when it is missing or blank.
    pub fn label(&self) -> Option<&str> {
        self.psr_type
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Period {
    pub start: String,
    pub end: Option<String>,
    pub resolution: String,
    pub points: Vec<Point>,
}

impl Period {
    pub fn new(start: impl Into<String>, resolution: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: None,
            resolution: resolution.into(),
            points: Vec::new(),
        }
    }

    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn with_point(mut self, position: impl Into<String>, quantity: impl Into<String>) -> Self {
        self.points.push(Point {
            position: position.into(),
            quantity: quantity.into(),
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Point {
    pub position: String,
    pub quantity: String,
}

/// One flattened observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub label: String,
    pub timestamp: DateTime<Utc>,
    pub quantity: f64,
    pub detail: Option<RecordDetail>,
}

/// Document, series and period metadata retained by the full variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDetail {
    pub document_id: Option<String>,
    pub revision: Option<String>,
    pub doc_type: Option<String>,
    pub process_type: Option<String>,
    pub created_time: Option<String>,
    pub time_series_id: Option<String>,
    pub business_type: Option<String>,
    pub unit: Option<String>,
    pub period_start: String,
    pub period_end: Option<String>,
    pub resolution: String,
    pub position: u32,
}
