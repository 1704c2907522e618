use crate::errors::{DocumentError, FormatAttempt};
use crate::formats::{AcknowledgementFormat, GlMarketFormat};
use crate::model::Document;

pub trait DocumentFormat {
    fn name(&self) -> &'static str;
    fn parse(&self, content: &str) -> Result<Document, DocumentError>;
}

/// Parses an ENTSO-E response body, trying every known document format.
pub fn parse_document(content: &str) -> Result<Document, DocumentError> {
    if content.trim().is_empty() {
        return Err(DocumentError::Empty);
    }

    let gl_market = GlMarketFormat;
    let acknowledgement = AcknowledgementFormat;
    let formats: [&dyn DocumentFormat; 2] = [&gl_market, &acknowledgement];
    parse_with_formats(content, &formats)
}

pub fn parse_with_formats(
    content: &str,
    formats: &[&dyn DocumentFormat],
) -> Result<Document, DocumentError> {
    let mut attempts = Vec::new();

    for format in formats {
        match format.parse(content) {
            Ok(document) => return Ok(document),
            Err(DocumentError::FormatMismatch { reason, .. }) => {
                attempts.push(FormatAttempt::new(format.name(), reason));
            }
            Err(err) => return Err(err),
        }
    }

    Err(DocumentError::NoMatchingFormat { attempts })
}
