// crates/gridfeed-core/src/error.rs

use thiserror::Error;

use gridfeed_bucket::BucketError;
use gridfeed_parser::{DocumentError, FlattenError};

use crate::entsoe::EntsoeError;
use crate::open_meteo::OpenMeteoError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("ENTSO-E request failed: {0}")]
    Entsoe(#[from] EntsoeError),

    #[error("Open-Meteo request failed: {0}")]
    OpenMeteo(#[from] OpenMeteoError),

    #[error("Document could not be parsed: {0}")]
    Document(#[from] DocumentError),

    #[error("Flattening failed: {0}")]
    Flatten(#[from] FlattenError),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Upload failed: {0}")]
    Bucket(#[from] BucketError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
