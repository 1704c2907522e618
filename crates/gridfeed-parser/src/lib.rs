//! ENTSO-E transparency platform documents and the time-series flattener.

pub mod errors;
pub mod flatten;
pub mod formats;
pub mod model;
mod registry;
pub mod time;

pub use errors::{
    DocumentError, FlattenError, FormatAttempt, PointError, ResolutionError, NO_DATA_REASON_CODE,
};
pub use flatten::{
    flatten, flatten_full, flatten_minimal, Detail, FlattenOptions, FlattenWarning, Flattened,
    PointPolicy,
};
pub use model::{
    Document, DocumentHeader, Period, Point, Record, RecordDetail, Series, UNKNOWN_LABEL,
};
pub use registry::{parse_document, parse_with_formats, DocumentFormat};
pub use time::{parse_anchor, Resolution, DEFAULT_RESOLUTION};
