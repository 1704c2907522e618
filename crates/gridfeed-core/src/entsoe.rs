//! ENTSO-E transparency platform client and the datasets pulled from it.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use gridfeed_parser::Detail;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::EntsoeConfig;

pub const DEFAULT_BASE_URL: &str = "https://web-api.tp.entsoe.eu/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Error)]
pub enum EntsoeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("platform answered {status}: {body}")]
    Status { status: u16, body: String },
}

/// The two ENTSO-E ingestion use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    /// Actual generation per production type (A75/A16), Germany-Luxembourg.
    LoadGeneration,
    /// Day-ahead wind and solar forecast (A69/A01), Belgium.
    WindSolarForecast,
}

impl Dataset {
    pub const ALL: [Dataset; 2] = [Dataset::LoadGeneration, Dataset::WindSolarForecast];

    pub fn code(&self) -> &'static str {
        match self {
            Dataset::LoadGeneration => "load_generation",
            Dataset::WindSolarForecast => "wind_solar_forecast",
        }
    }

    pub fn document_type(&self) -> &'static str {
        match self {
            Dataset::LoadGeneration => "A75",
            Dataset::WindSolarForecast => "A69",
        }
    }

    pub fn process_type(&self) -> &'static str {
        match self {
            Dataset::LoadGeneration => "A16",
            Dataset::WindSolarForecast => "A01",
        }
    }

    pub fn in_domain(&self) -> &'static str {
        match self {
            Dataset::LoadGeneration => "10Y1001A1001A83F",
            Dataset::WindSolarForecast => "10YBE----------2",
        }
    }

    pub fn detail(&self) -> Detail {
        match self {
            Dataset::LoadGeneration => Detail::Minimal,
            Dataset::WindSolarForecast => Detail::Full,
        }
    }

    fn artifact_stem(&self) -> &'static str {
        match self {
            Dataset::LoadGeneration => "entsoe_data",
            Dataset::WindSolarForecast => "entsoe_data_ws",
        }
    }

    /// `data/entsoe/<dataset>/<artifact>_<year>.parquet`
    pub fn artifact_key(&self, year: i32) -> String {
        format!(
            "data/entsoe/{}/{}_{year}.parquet",
            self.code(),
            self.artifact_stem()
        )
    }

    /// Query parameters for one window, without the security token.
    pub fn query(&self, window: &YearWindow) -> Vec<(&'static str, String)> {
        vec![
            ("documentType", self.document_type().to_string()),
            ("processType", self.process_type().to_string()),
            ("in_Domain", self.in_domain().to_string()),
            ("periodStart", window.start.clone()),
            ("periodEnd", window.end.clone()),
        ]
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Dataset {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "load_generation" | "lg" => Ok(Dataset::LoadGeneration),
            "wind_solar_forecast" | "windsolar" | "ws" => Ok(Dataset::WindSolarForecast),
            other => Err(format!("unknown dataset '{other}'")),
        }
    }
}

/// `periodStart`/`periodEnd` bounds (UTC, `yyyyMMddHHmm`) for one calendar year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearWindow {
    pub year: i32,
    pub start: String,
    pub end: String,
}

impl YearWindow {
    /// Jan 1 00:00 through Dec 31 23:00.
    pub fn for_year(year: i32) -> Self {
        Self {
            year,
            start: format!("{year:04}01010000"),
            end: format!("{year:04}12312300"),
        }
    }
}

/// Where raw response bodies come from.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, dataset: Dataset, window: &YearWindow) -> Result<String, EntsoeError>;
}

pub struct EntsoeClient {
    client: Client,
    config: EntsoeConfig,
}

impl EntsoeClient {
    pub fn new(config: EntsoeConfig) -> Result<Self, EntsoeError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl DocumentSource for EntsoeClient {
    async fn fetch(&self, dataset: Dataset, window: &YearWindow) -> Result<String, EntsoeError> {
        debug!(dataset = dataset.code(), year = window.year, "requesting ENTSO-E document");

        let resp = self
            .client
            .get(&self.config.base_url)
            .query(&[("securityToken", self.config.api_key.as_str())])
            .query(&dataset.query(window))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        check_status(status, body)
    }
}

/// Keeps successful bodies and acknowledgement documents; any other
/// non-2xx answer becomes [`EntsoeError::Status`].
///
/// "No data" and most query errors come back as an acknowledgement with a
/// 400; the parser turns those into typed errors.
pub fn check_status(status: StatusCode, body: String) -> Result<String, EntsoeError> {
    if status.is_success() || is_acknowledgement(&body) {
        return Ok(body);
    }
    Err(EntsoeError::Status {
        status: status.as_u16(),
        body: truncate(&body, ERROR_BODY_LIMIT),
    })
}

fn is_acknowledgement(body: &str) -> bool {
    body.contains("Acknowledgement_MarketDocument")
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((index, _)) => format!("{}…", &text[..index]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_window_covers_calendar_year() {
        let window = YearWindow::for_year(2024);
        assert_eq!(window.start, "202401010000");
        assert_eq!(window.end, "202412312300");
    }

    #[test]
    fn artifact_keys_follow_source_dataset_layout() {
        assert_eq!(
            Dataset::LoadGeneration.artifact_key(2015),
            "data/entsoe/load_generation/entsoe_data_2015.parquet"
        );
        assert_eq!(
            Dataset::WindSolarForecast.artifact_key(2024),
            "data/entsoe/wind_solar_forecast/entsoe_data_ws_2024.parquet"
        );
    }

    #[test]
    fn query_names_document_process_and_domain() {
        let query = Dataset::WindSolarForecast.query(&YearWindow::for_year(2020));
        assert_eq!(
            query,
            vec![
                ("documentType", "A69".to_string()),
                ("processType", "A01".to_string()),
                ("in_Domain", "10YBE----------2".to_string()),
                ("periodStart", "202001010000".to_string()),
                ("periodEnd", "202012312300".to_string()),
            ]
        );
    }

    #[test]
    fn datasets_parse_from_cli_names() {
        assert_eq!("load-generation".parse::<Dataset>(), Ok(Dataset::LoadGeneration));
        assert_eq!("WS".parse::<Dataset>(), Ok(Dataset::WindSolarForecast));
        assert!("prices".parse::<Dataset>().is_err());
        for dataset in Dataset::ALL {
            assert_eq!(dataset.to_string().parse::<Dataset>(), Ok(dataset));
        }
    }

    #[test]
    fn detail_follows_use_case() {
        assert_eq!(Dataset::LoadGeneration.detail(), Detail::Minimal);
        assert_eq!(Dataset::WindSolarForecast.detail(), Detail::Full);
    }

    #[test]
    fn acknowledgement_with_error_status_reaches_the_parser() {
        let body = "<Acknowledgement_MarketDocument><Reason><code>999</code></Reason></Acknowledgement_MarketDocument>";
        let kept = check_status(StatusCode::BAD_REQUEST, body.to_string()).unwrap();
        assert_eq!(kept, body);
    }

    #[test]
    fn other_error_statuses_fail_with_truncated_body() {
        let body = format!("<html>{}</html>", "x".repeat(600));
        let err = check_status(StatusCode::SERVICE_UNAVAILABLE, body).unwrap_err();
        match err {
            EntsoeError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body.chars().count(), ERROR_BODY_LIMIT + 1);
                assert!(body.starts_with("<html>"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn success_bodies_pass_through() {
        let kept = check_status(StatusCode::OK, "<GL_MarketDocument/>".to_string()).unwrap();
        assert_eq!(kept, "<GL_MarketDocument/>");
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(600);
        let short = truncate(&body, ERROR_BODY_LIMIT);
        assert_eq!(short.chars().count(), ERROR_BODY_LIMIT + 1);
        assert_eq!(truncate("short", ERROR_BODY_LIMIT), "short");
    }
}
