//! Explicit configuration for the ingestion entry points.
//!
//! Values come from three places, lowest precedence first: built-in
//! defaults, an optional TOML file, and the process environment (usually
//! seeded from `.env`). Secrets are only ever read from the environment.

use std::fmt;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use gridfeed_bucket::S3Config;
use gridfeed_parser::PointPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::entsoe::DEFAULT_BASE_URL as ENTSOE_BASE_URL;
use crate::open_meteo::DEFAULT_BASE_URL as OPEN_METEO_BASE_URL;

pub const DEFAULT_CONTAINER: &str = "landing";
pub const DEFAULT_YEARS: RangeInclusive<i32> = 2015..=2024;

const ENTSOE_API_KEY: &str = "ENTSOE_API_KEY";
const ENTSOE_BASE_URL_VAR: &str = "ENTSOE_BASE_URL";
const S3_BUCKET: &str = "S3_BUCKET";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingVar(&'static str),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings shared by the yearly ENTSO-E ingestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub years: Vec<i32>,
    pub container: String,
    /// Also keep a copy of every artifact here.
    pub output_dir: Option<PathBuf>,
    pub point_policy: PointPolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            years: DEFAULT_YEARS.collect(),
            container: DEFAULT_CONTAINER.to_string(),
            output_dir: None,
            point_policy: PointPolicy::default(),
        }
    }
}

impl IngestConfig {
    /// Applies environment overrides; `S3_BUCKET` replaces the container.
    /// CLI flags are applied after this and win over both.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bucket) = lookup(S3_BUCKET).filter(|value| !value.trim().is_empty()) {
            if bucket != self.container {
                info!(from = %self.container, to = %bucket, "container taken from {S3_BUCKET}");
            }
            self.container = bucket;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.years.is_empty() {
            return Err(ConfigError::Invalid("at least one year is required".into()));
        }
        if let Some(year) = self.years.iter().find(|year| !(1000..=9999).contains(*year)) {
            return Err(ConfigError::Invalid(format!(
                "year {year} is not a four-digit year"
            )));
        }
        if self.container.trim().is_empty() {
            return Err(ConfigError::Invalid("container name cannot be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenMeteoConfig {
    pub base_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub hourly: Vec<String>,
    pub key: String,
    /// Also keep a copy of the CSV here.
    pub output_dir: Option<PathBuf>,
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            base_url: OPEN_METEO_BASE_URL.to_string(),
            latitude: 52.52,
            longitude: 13.41,
            hourly: vec!["temperature_2m".to_string()],
            key: "data/open_meteo/forecast/hourly.csv".to_string(),
            output_dir: None,
        }
    }
}

impl OpenMeteoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude)
        {
            return Err(ConfigError::Invalid(format!(
                "coordinates ({}, {}) are out of range",
                self.latitude, self.longitude
            )));
        }
        if self.hourly.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one hourly variable is required".into(),
            ));
        }
        Ok(())
    }
}

/// Layout of the optional TOML config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub ingest: IngestConfig,
    pub open_meteo: OpenMeteoConfig,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

#[derive(Clone)]
pub struct EntsoeConfig {
    pub api_key: String,
    pub base_url: String,
}

impl EntsoeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup(ENTSOE_API_KEY)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingVar(ENTSOE_API_KEY))?;
        let base_url = lookup(ENTSOE_BASE_URL_VAR)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| ENTSOE_BASE_URL.to_string());
        Ok(Self { api_key, base_url })
    }
}

impl fmt::Debug for EntsoeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntsoeConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Builds the S3 settings from `S3_*` variables for an already resolved
/// `container` (see [`IngestConfig::apply_env`]).
pub fn s3_config_from_env(container: &str) -> S3Config {
    s3_config_from_lookup(container, |name| std::env::var(name).ok())
}

pub fn s3_config_from_lookup(container: &str, lookup: impl Fn(&str) -> Option<String>) -> S3Config {
    let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
    let defaults = S3Config::default();

    S3Config {
        bucket: container.to_string(),
        region: get("S3_REGION")
            .or_else(|| get("AWS_REGION"))
            .unwrap_or(defaults.region),
        endpoint: get("S3_ENDPOINT_URL"),
        access_key_id: get("S3_ACCESS_KEY_ID"),
        secret_access_key: get("S3_SECRET_ACCESS_KEY"),
        force_path_style: get("S3_FORCE_PATH_STYLE")
            .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.force_path_style),
    }
}
