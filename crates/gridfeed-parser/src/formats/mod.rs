mod acknowledgement;
mod common;
mod gl_market;

pub use acknowledgement::AcknowledgementFormat;
pub use gl_market::GlMarketFormat;

pub(crate) use common::{deserialize_error, expect_root, non_blank};
