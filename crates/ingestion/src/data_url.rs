//! `data:` URL parsing
//!
//! Only base64 image payloads are accepted: `data:image/<subtype>;base64,<data>`.

use crate::error::{IngestionError, Result};

const SCHEME: &str = "data:";

/// Borrowed view of a parsed data URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUrl<'a> {
    /// e.g. "image/png"
    pub mime: &'a str,
    /// Still-encoded base64 body
    pub data: &'a str,
}

/// Split a data URL into MIME type and base64 body.
///
/// The body is not decoded here.
pub fn parse_data_url(url: &str) -> Result<DataUrl<'_>> {
    if !url.starts_with("data:image/") {
        return Err(IngestionError::InvalidDataUrl {
            reason: "expected data:image/ prefix",
        });
    }

    let (Some(semi), Some(comma)) = (url.find(';'), url.find(',')) else {
        return Err(IngestionError::InvalidDataUrl {
            reason: "missing ';' or ','",
        });
    };
    if comma < semi {
        return Err(IngestionError::InvalidDataUrl {
            reason: "',' before ';'",
        });
    }

    let mime = &url[SCHEME.len()..semi];
    let encoding = &url[semi + 1..comma];
    let data = &url[comma + 1..];

    if !encoding.eq_ignore_ascii_case("base64") {
        return Err(IngestionError::InvalidDataUrl {
            reason: "encoding must be base64",
        });
    }
    if !mime
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
    {
        return Err(IngestionError::InvalidDataUrl {
            reason: "mime must be image/*",
        });
    }

    Ok(DataUrl { mime, data })
}
