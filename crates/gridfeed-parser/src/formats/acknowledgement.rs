use serde::Deserialize;

use crate::errors::DocumentError;
use crate::formats::{deserialize_error, expect_root, non_blank};
use crate::model::Document;
use crate::registry::DocumentFormat;

const FORMAT: &str = "acknowledgement";
const ROOT: &str = "Acknowledgement_MarketDocument";

/// `Acknowledgement_MarketDocument`: the platform's answer when a query is
/// rejected or matches no data. Never yields a [`Document`]; the reason is
/// surfaced as [`DocumentError::Acknowledgement`].
pub struct AcknowledgementFormat;

impl DocumentFormat for AcknowledgementFormat {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn parse(&self, content: &str) -> Result<Document, DocumentError> {
        expect_root(FORMAT, ROOT, content)?;
        let raw: RawAcknowledgement = quick_xml::de::from_str(content)
            .map_err(|source| deserialize_error(FORMAT, source))?;

        let reason = raw.reasons.into_iter().next();
        let (code, text) = match reason {
            Some(reason) => (non_blank(reason.code), non_blank(reason.text)),
            None => (None, None),
        };

        Err(DocumentError::Acknowledgement {
            code: code.unwrap_or_else(|| "unknown".to_string()),
            text: text.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawAcknowledgement {
    #[serde(rename = "Reason", default)]
    reasons: Vec<RawReason>,
}

#[derive(Debug, Deserialize)]
struct RawReason {
    code: Option<String>,
    text: Option<String>,
}
