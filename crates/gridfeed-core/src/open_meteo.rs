//! Open-Meteo hourly forecast client.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use polars::prelude::{Column, DataFrame, NamedFrom, PolarsResult, Series};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::tabulate::datetime_column;

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum OpenMeteoError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API answered {status}: {reason}")]
    Api { status: u16, reason: String },
    #[error("invalid response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response has no hourly block")]
    MissingHourly,
    #[error("response has no hourly variable '{0}'")]
    MissingVariable(String),
    #[error("hourly variable '{variable}' has {found} values for {expected} timestamps")]
    LengthMismatch {
        variable: String,
        expected: usize,
        found: usize,
    },
    #[error("invalid unix timestamp {0}")]
    InvalidTimestamp(i64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Hourly values for one location, variables in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyForecast {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    pub utc_offset_seconds: i32,
    pub time: Vec<DateTime<Utc>>,
    pub variables: Vec<(String, Vec<Option<f64>>)>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    latitude: f64,
    longitude: f64,
    elevation: Option<f64>,
    #[serde(default)]
    utc_offset_seconds: i32,
    hourly: Option<HourlyBlock>,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<i64>,
    #[serde(flatten)]
    values: HashMap<String, Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    reason: String,
}

impl HourlyForecast {
    /// Decodes a `timeformat=unixtime` response, keeping `variables` in the given order.
    pub fn from_json(body: &str, variables: &[String]) -> Result<Self, OpenMeteoError> {
        let response: ForecastResponse = serde_json::from_str(body)?;
        let mut hourly = response.hourly.ok_or(OpenMeteoError::MissingHourly)?;

        let time = hourly
            .time
            .iter()
            .map(|&secs| DateTime::from_timestamp(secs, 0).ok_or(OpenMeteoError::InvalidTimestamp(secs)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut columns = Vec::with_capacity(variables.len());
        for variable in variables {
            let values = hourly
                .values
                .remove(variable)
                .ok_or_else(|| OpenMeteoError::MissingVariable(variable.clone()))?;
            if values.len() != time.len() {
                return Err(OpenMeteoError::LengthMismatch {
                    variable: variable.clone(),
                    expected: time.len(),
                    found: values.len(),
                });
            }
            columns.push((variable.clone(), values));
        }

        Ok(Self {
            latitude: response.latitude,
            longitude: response.longitude,
            elevation: response.elevation,
            utc_offset_seconds: response.utc_offset_seconds,
            time,
            variables: columns,
        })
    }

    /// `date` followed by one column per variable.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.variables.len() + 1);
        columns.push(datetime_column("date", self.time.iter().copied())?);
        for (name, values) in &self.variables {
            columns.push(Series::new(name.as_str().into(), values.clone()).into());
        }
        DataFrame::new(columns)
    }
}

pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, OpenMeteoError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub async fn fetch_hourly(
        &self,
        location: Location,
        variables: &[String],
    ) -> Result<HourlyForecast, OpenMeteoError> {
        debug!(
            latitude = location.latitude,
            longitude = location.longitude,
            "requesting Open-Meteo forecast"
        );

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("hourly", variables.join(",")),
                ("timeformat", "unixtime".to_string()),
                ("timezone", "GMT".to_string()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        let body = check_status(status, body)?;

        HourlyForecast::from_json(&body, variables)
    }
}

/// Maps a non-2xx answer to [`OpenMeteoError::Api`], preferring the
/// `reason` field of the JSON error body over the raw text.
pub fn check_status(status: StatusCode, body: String) -> Result<String, OpenMeteoError> {
    if status.is_success() {
        return Ok(body);
    }
    let reason = serde_json::from_str::<ErrorResponse>(&body)
        .map(|err| err.reason)
        .unwrap_or(body);
    Err(OpenMeteoError::Api {
        status: status.as_u16(),
        reason,
    })
}
