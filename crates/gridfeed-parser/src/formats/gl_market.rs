use serde::Deserialize;

use crate::errors::DocumentError;
use crate::formats::{deserialize_error, expect_root, non_blank};
use crate::model::{Document, DocumentHeader, Period, Point, Series};
use crate::registry::DocumentFormat;

const FORMAT: &str = "gl_market";
const ROOT: &str = "GL_MarketDocument";

/// `GL_MarketDocument`: actual generation/load per production type (A75)
/// and wind/solar forecasts (A69).
pub struct GlMarketFormat;

impl DocumentFormat for GlMarketFormat {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn parse(&self, content: &str) -> Result<Document, DocumentError> {
        expect_root(FORMAT, ROOT, content)?;
        let raw: RawDocument = quick_xml::de::from_str(content)
            .map_err(|source| deserialize_error(FORMAT, source))?;
        Ok(raw.into_document())
    }
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(rename = "mRID")]
    mrid: Option<String>,
    #[serde(rename = "revisionNumber")]
    revision_number: Option<String>,
    #[serde(rename = "type")]
    doc_type: Option<String>,
    #[serde(rename = "process.processType")]
    process_type: Option<String>,
    #[serde(rename = "createdDateTime")]
    created_date_time: Option<String>,
    #[serde(rename = "time_Period.timeInterval")]
    time_interval: Option<RawInterval>,
    #[serde(rename = "TimeSeries", default)]
    time_series: Vec<RawTimeSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct RawInterval {
    start: Option<String>,
    end: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTimeSeries {
    #[serde(rename = "mRID")]
    mrid: Option<String>,
    #[serde(rename = "businessType")]
    business_type: Option<String>,
    #[serde(rename = "MktPSRType")]
    psr: Option<RawPsrType>,
    #[serde(rename = "quantity_Measure_Unit.name")]
    unit: Option<String>,
    #[serde(rename = "Period", default)]
    periods: Vec<RawPeriod>,
}

#[derive(Debug, Deserialize)]
struct RawPsrType {
    #[serde(rename = "psrType")]
    psr_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPeriod {
    #[serde(rename = "timeInterval")]
    time_interval: Option<RawInterval>,
    resolution: Option<String>,
    #[serde(rename = "Point", default)]
    points: Vec<RawPoint>,
}

#[derive(Debug, Deserialize)]
struct RawPoint {
    position: Option<String>,
    quantity: Option<String>,
}

impl RawDocument {
    fn into_document(self) -> Document {
        let interval = self.time_interval.unwrap_or_default();
        let header = DocumentHeader {
            mrid: non_blank(self.mrid),
            revision_number: non_blank(self.revision_number),
            doc_type: non_blank(self.doc_type),
            process_type: non_blank(self.process_type),
            created_date_time: non_blank(self.created_date_time),
            interval_start: non_blank(interval.start),
            interval_end: non_blank(interval.end),
        };

        Document {
            header,
            series: self
                .time_series
                .into_iter()
                .map(RawTimeSeries::into_series)
                .collect(),
        }
    }
}

impl RawTimeSeries {
    fn into_series(self) -> Series {
        Series {
            mrid: non_blank(self.mrid),
            business_type: non_blank(self.business_type),
            psr_type: non_blank(self.psr.and_then(|psr| psr.psr_type)),
            unit: non_blank(self.unit),
            periods: self.periods.into_iter().map(RawPeriod::into_period).collect(),
        }
    }
}

impl RawPeriod {
    fn into_period(self) -> Period {
        let interval = self.time_interval.unwrap_or_default();
        Period {
            start: interval.start.unwrap_or_default(),
            end: non_blank(interval.end),
            resolution: self.resolution.unwrap_or_default(),
            points: self
                .points
                .into_iter()
                .map(|point| Point {
                    position: point.position.unwrap_or_default(),
                    quantity: point.quantity.unwrap_or_default(),
                })
                .collect(),
        }
    }
}
