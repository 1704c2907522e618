//! Converts `TimeSeries/Period/Point` documents into flat, timestamped records.
//!
//! Records come out in document order: series, then period, then ascending
//! position within the period. They are not re-sorted by timestamp.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{FlattenError, PointError, ResolutionError};
use crate::model::{Document, Period, Point, Record, RecordDetail, Series, UNKNOWN_LABEL};
use crate::time::{parse_anchor, Resolution};

/// How much metadata each record carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detail {
    /// Label, timestamp and quantity.
    #[default]
    Minimal,
    /// Adds document, series and period metadata.
    Full,
}

/// What to do with a point whose position or quantity cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointPolicy {
    /// Drop the point, keep the rest of the period and report a warning.
    #[default]
    Skip,
    /// Fail the whole call.
    Strict,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenOptions {
    #[serde(default)]
    pub detail: Detail,
    #[serde(default)]
    pub points: PointPolicy,
}

impl FlattenOptions {
    pub fn minimal() -> Self {
        Self {
            detail: Detail::Minimal,
            ..Self::default()
        }
    }

    pub fn full() -> Self {
        Self {
            detail: Detail::Full,
            ..Self::default()
        }
    }

    pub fn with_point_policy(mut self, points: PointPolicy) -> Self {
        self.points = points;
        self
    }
}

/// A problem recovered from locally while flattening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlattenWarning {
    MissingLabel {
        series: usize,
    },
    UnrecognizedResolution {
        series: usize,
        period: usize,
        reason: ResolutionError,
        fallback_minutes: u32,
    },
    MalformedPoint {
        series: usize,
        period: usize,
        point: usize,
        reason: PointError,
    },
}

impl fmt::Display for FlattenWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlattenWarning::MissingLabel { series } => {
                write!(f, "series {series}: no psrType, labelled '{UNKNOWN_LABEL}'")
            }
            FlattenWarning::UnrecognizedResolution {
                series,
                period,
                reason,
                fallback_minutes,
            } => write!(
                f,
                "series {series} period {period}: {reason}; assuming {fallback_minutes} minutes"
            ),
            FlattenWarning::MalformedPoint {
                series,
                period,
                point,
                reason,
            } => write!(f, "series {series} period {period} point {point} skipped: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flattened {
    pub records: Vec<Record>,
    pub warnings: Vec<FlattenWarning>,
}

impl Flattened {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Label, timestamp and quantity only. Malformed points are skipped.
pub fn flatten_minimal(document: &Document) -> Result<Flattened, FlattenError> {
    flatten(document, &FlattenOptions::minimal())
}

/// Records carrying the full document/series/period metadata. Malformed points are skipped.
pub fn flatten_full(document: &Document) -> Result<Flattened, FlattenError> {
    flatten(document, &FlattenOptions::full())
}

pub fn flatten(document: &Document, options: &FlattenOptions) -> Result<Flattened, FlattenError> {
    let mut flattener = Flattener {
        document,
        options,
        out: Flattened {
            records: Vec::with_capacity(document.point_count()),
            warnings: Vec::new(),
        },
    };

    for (index, series) in document.series.iter().enumerate() {
        flattener.series(index, series)?;
    }

    Ok(flattener.out)
}

struct Flattener<'a> {
    document: &'a Document,
    options: &'a FlattenOptions,
    out: Flattened,
}

struct ResolvedPoint {
    position: u32,
    timestamp: DateTime<Utc>,
    quantity: f64,
}

impl Flattener<'_> {
    fn series(&mut self, index: usize, series: &Series) -> Result<(), FlattenError> {
        let label = match series.label() {
            Some(label) => label.to_string(),
            None => {
                warn!(series = index, "time series has no psrType; using '{UNKNOWN_LABEL}'");
                self.out
                    .warnings
                    .push(FlattenWarning::MissingLabel { series: index });
                UNKNOWN_LABEL.to_string()
            }
        };

        for (period_index, period) in series.periods.iter().enumerate() {
            self.period(index, series, &label, period_index, period)?;
        }
        Ok(())
    }

    fn period(
        &mut self,
        series_index: usize,
        series: &Series,
        label: &str,
        period_index: usize,
        period: &Period,
    ) -> Result<(), FlattenError> {
        let start =
            parse_anchor(&period.start).map_err(|source| FlattenError::MalformedTimestamp {
                series: series_index,
                period: period_index,
                raw: period.start.clone(),
                source,
            })?;

        let (resolution, problem) = Resolution::parse_or_default(&period.resolution);
        if let Some(reason) = problem {
            warn!(
                series = series_index,
                period = period_index,
                resolution = %period.resolution,
                fallback_minutes = resolution.minutes(),
                "unrecognized resolution; timestamps may be misplaced"
            );
            self.out.warnings.push(FlattenWarning::UnrecognizedResolution {
                series: series_index,
                period: period_index,
                reason,
                fallback_minutes: resolution.minutes(),
            });
        }

        let mut resolved = Vec::with_capacity(period.points.len());
        for (point_index, point) in period.points.iter().enumerate() {
            match resolve_point(point, start, resolution) {
                Ok(point) => resolved.push(point),
                Err(reason) => match self.options.points {
                    PointPolicy::Strict => {
                        return Err(FlattenError::MalformedPoint {
                            series: series_index,
                            period: period_index,
                            point: point_index,
                            reason,
                        })
                    }
                    PointPolicy::Skip => {
                        warn!(
                            series = series_index,
                            period = period_index,
                            point = point_index,
                            %reason,
                            "skipping malformed point"
                        );
                        self.out.warnings.push(FlattenWarning::MalformedPoint {
                            series: series_index,
                            period: period_index,
                            point: point_index,
                            reason,
                        });
                    }
                },
            }
        }

        resolved.sort_by_key(|point| point.position);

        for point in resolved {
            let detail = match self.options.detail {
                Detail::Minimal => None,
                Detail::Full => Some(self.detail(series, period, point.position)),
            };
            self.out.records.push(Record {
                label: label.to_string(),
                timestamp: point.timestamp,
                quantity: point.quantity,
                detail,
            });
        }
        Ok(())
    }

    fn detail(&self, series: &Series, period: &Period, position: u32) -> RecordDetail {
        let header = &self.document.header;
        RecordDetail {
            document_id: header.mrid.clone(),
            revision: header.revision_number.clone(),
            doc_type: header.doc_type.clone(),
            process_type: header.process_type.clone(),
            created_time: header.created_date_time.clone(),
            time_series_id: series.mrid.clone(),
            business_type: series.business_type.clone(),
            unit: series.unit.clone(),
            period_start: period.start.trim().to_string(),
            period_end: period.end.clone(),
            resolution: period.resolution.trim().to_string(),
            position,
        }
    }
}

fn resolve_point(
    point: &Point,
    start: DateTime<Utc>,
    resolution: Resolution,
) -> Result<ResolvedPoint, PointError> {
    let raw_position = point.position.trim();
    let position: i64 = raw_position
        .parse()
        .map_err(|_| PointError::Position(raw_position.to_string()))?;
    let position = u32::try_from(position)
        .ok()
        .filter(|position| *position >= 1)
        .ok_or(PointError::PositionOutOfRange(position))?;

    let raw_quantity = point.quantity.trim();
    let quantity: f64 = raw_quantity
        .parse()
        .map_err(|_| PointError::Quantity(raw_quantity.to_string()))?;

    let timestamp = resolution
        .offset(position)
        .and_then(|offset| start.checked_add_signed(offset))
        .ok_or(PointError::TimestampOverflow(position))?;

    Ok(ResolvedPoint {
        position,
        timestamp,
        quantity,
    })
}
