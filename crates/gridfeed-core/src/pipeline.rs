//! Yearly ENTSO-E ingestion and the Open-Meteo upload:
//! fetch -> parse -> flatten -> tabulate -> publish.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use gridfeed_bucket::{publish, BucketStore};
use gridfeed_parser::{flatten, parse_document, FlattenOptions};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{IngestConfig, OpenMeteoConfig};
use crate::entsoe::{Dataset, DocumentSource, YearWindow};
use crate::error::Result;
use crate::open_meteo::{HourlyForecast, Location, OpenMeteoClient};
use crate::tabulate::{csv_bytes, parquet_bytes, records_to_frame, CSV_CONTENT_TYPE, PARQUET_CONTENT_TYPE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedArtifact {
    pub key: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum YearOutcome {
    Published {
        year: i32,
        key: String,
        rows: usize,
        warnings: usize,
    },
    /// The platform acknowledged the query but had no data for it.
    Empty { year: i32, reason: String },
    Failed { year: i32, error: String },
}

impl YearOutcome {
    pub fn year(&self) -> i32 {
        match self {
            YearOutcome::Published { year, .. }
            | YearOutcome::Empty { year, .. }
            | YearOutcome::Failed { year, .. } => *year,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub dataset: Dataset,
    pub outcomes: Vec<YearOutcome>,
}

impl IngestReport {
    pub fn failed_years(&self) -> Vec<i32> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, YearOutcome::Failed { .. }))
            .map(YearOutcome::year)
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_years().is_empty()
    }

    pub fn published_rows(&self) -> usize {
        self.outcomes
            .iter()
            .map(|outcome| match outcome {
                YearOutcome::Published { rows, .. } => *rows,
                _ => 0,
            })
            .sum()
    }
}

pub struct EntsoePipeline {
    source: Arc<dyn DocumentSource>,
    bucket: Arc<dyn BucketStore>,
    config: IngestConfig,
}

impl EntsoePipeline {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        bucket: Arc<dyn BucketStore>,
        config: IngestConfig,
    ) -> Self {
        Self {
            source,
            bucket,
            config,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Runs every configured year. A failing year is recorded and the next one is attempted.
    pub async fn run(&self, dataset: Dataset) -> IngestReport {
        let mut outcomes = Vec::with_capacity(self.config.years.len());

        for &year in &self.config.years {
            info!(dataset = dataset.code(), year, "processing year");
            let outcome = match self.run_year(dataset, year).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(dataset = dataset.code(), year, error = %err, "year failed");
                    YearOutcome::Failed {
                        year,
                        error: err.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        IngestReport { dataset, outcomes }
    }

    pub async fn run_year(&self, dataset: Dataset, year: i32) -> Result<YearOutcome> {
        let window = YearWindow::for_year(year);
        let body = self.source.fetch(dataset, &window).await?;

        let document = match parse_document(&body) {
            Ok(document) => document,
            Err(err) if err.is_no_data() => {
                warn!(dataset = dataset.code(), year, reason = %err, "no data for year");
                return Ok(YearOutcome::Empty {
                    year,
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        let options = FlattenOptions {
            detail: dataset.detail(),
            points: self.config.point_policy,
        };
        let flattened = flatten(&document, &options)?;
        if !flattened.warnings.is_empty() {
            warn!(
                dataset = dataset.code(),
                year,
                count = flattened.warnings.len(),
                "recovered from malformed input while flattening"
            );
        }

        let frame = records_to_frame(&flattened.records, options.detail)?;
        let bytes = parquet_bytes(&frame)?;
        let key = dataset.artifact_key(year);

        if let Some(dir) = &self.config.output_dir {
            write_local_copy(dir, &key, &bytes).await?;
        }
        publish(self.bucket.as_ref(), &key, Bytes::from(bytes), PARQUET_CONTENT_TYPE).await?;

        Ok(YearOutcome::Published {
            year,
            key,
            rows: frame.height(),
            warnings: flattened.warnings.len(),
        })
    }
}

/// Tabulates a forecast and publishes it as CSV under `key`, writing the
/// same bytes into `output_dir` when one is given.
pub async fn publish_forecast(
    bucket: &dyn BucketStore,
    forecast: &HourlyForecast,
    key: &str,
    output_dir: Option<&Path>,
) -> Result<PublishedArtifact> {
    let frame = forecast.to_frame()?;
    let bytes = csv_bytes(&frame)?;
    if let Some(dir) = output_dir {
        write_local_copy(dir, key, &bytes).await?;
    }
    publish(bucket, key, Bytes::from(bytes), CSV_CONTENT_TYPE).await?;
    Ok(PublishedArtifact {
        key: key.to_string(),
        rows: frame.height(),
    })
}

pub async fn run_open_meteo(
    client: &OpenMeteoClient,
    bucket: &dyn BucketStore,
    config: &OpenMeteoConfig,
) -> Result<PublishedArtifact> {
    let location = Location {
        latitude: config.latitude,
        longitude: config.longitude,
    };
    let forecast = client.fetch_hourly(location, &config.hourly).await?;
    info!(
        latitude = forecast.latitude,
        longitude = forecast.longitude,
        elevation = ?forecast.elevation,
        utc_offset_seconds = forecast.utc_offset_seconds,
        hours = forecast.time.len(),
        "fetched hourly forecast"
    );
    publish_forecast(bucket, &forecast, &config.key, config.output_dir.as_deref()).await
}

async fn write_local_copy(dir: &Path, key: &str, bytes: &[u8]) -> Result<()> {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, bytes).await?;
    info!(path = %path.display(), "wrote local copy");
    Ok(())
}
