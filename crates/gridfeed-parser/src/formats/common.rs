use quick_xml::events::Event;
use quick_xml::{DeError, Reader};

use crate::errors::DocumentError;

/// Local name of the first element in `content`, skipping the declaration,
/// comments and whitespace.
pub(crate) fn root_element(content: &str) -> Result<String, DocumentError> {
    let mut reader = Reader::from_str(content);
    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                return Ok(String::from_utf8_lossy(element.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => return Err(DocumentError::Empty),
            Ok(_) => continue,
            Err(err) => return Err(DocumentError::Syntax(err.to_string())),
        }
    }
}

pub(crate) fn expect_root(
    format: &'static str,
    expected: &str,
    content: &str,
) -> Result<(), DocumentError> {
    let root = root_element(content)?;
    if root == expected {
        Ok(())
    } else {
        Err(DocumentError::FormatMismatch {
            format,
            reason: format!("root element is '{root}', expected '{expected}'"),
        })
    }
}

/// Malformed or truncated markup is a syntax problem regardless of which
/// format was decoding it; anything else is a shape mismatch for `format`.
pub(crate) fn deserialize_error(format: &'static str, source: DeError) -> DocumentError {
    match source {
        DeError::InvalidXml(err) => DocumentError::Syntax(err.to_string()),
        DeError::UnexpectedEof => {
            DocumentError::Syntax("document ends before its root element is closed".to_string())
        }
        source => DocumentError::Xml { format, source },
    }
}

/// Trims a leaf value and maps blank text to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_element_skips_prolog_and_namespace_prefix() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- generated -->
<ns:GL_MarketDocument xmlns:ns="urn:x"><ns:mRID>1</ns:mRID></ns:GL_MarketDocument>"#;
        assert_eq!(root_element(xml).unwrap(), "GL_MarketDocument");
    }

    #[test]
    fn root_element_of_blank_input_is_empty() {
        assert!(matches!(root_element("   "), Err(DocumentError::Empty)));
    }

    #[test]
    fn expect_root_reports_mismatch() {
        let err = expect_root("gl_market", "GL_MarketDocument", "<Other/>").unwrap_err();
        assert!(matches!(err, DocumentError::FormatMismatch { format: "gl_market", .. }));
    }
}
