//! Energy and weather time-series ingestion: ENTSO-E documents and
//! Open-Meteo forecasts, tabulated with Polars and published to blob storage.

pub mod config;
pub mod entsoe;
pub mod error;
pub mod open_meteo;
pub mod pipeline;
pub mod tabulate;

pub use config::{ConfigError, EntsoeConfig, FileConfig, IngestConfig, OpenMeteoConfig};
pub use entsoe::{Dataset, DocumentSource, EntsoeClient, EntsoeError, YearWindow};
pub use error::{PipelineError, Result};
pub use gridfeed_parser::{Detail, PointPolicy};
pub use open_meteo::{HourlyForecast, Location, OpenMeteoClient, OpenMeteoError};
pub use pipeline::{EntsoePipeline, IngestReport, PublishedArtifact, YearOutcome};
