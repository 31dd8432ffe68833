//! Converting binary data to and from `data:` URLs.
//!
//! Clients may send us either a full `data:` URL or bare Base64. Either way we
//! end up with raw bytes and a MIME type, and we never look inside the bytes
//! here.

use std::{error, fmt, sync::LazyLock};

use base64::{Engine as _, prelude::BASE64_STANDARD};
use regex::Regex;

/// The MIME type we use when nobody told us what we're looking at.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// A file name with no extension, used to ask `mime_guess` for a best guess
/// when the payload didn't declare a type.
const GENERIC_FILE_NAME: &str = "file";

/// Regex for parsing a `data:` URL. We split on the first comma, and the
/// header may carry parameters like `;base64` after the MIME type.
static DATA_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^data:(?P<header>[^,]*),(?P<data>.*)$")
        .expect("built-in regex should be valid")
});

/// Convert binary data to a `data:` URL.
pub fn data_url(mime_type: &str, data: &[u8]) -> String {
    let base64_data = BASE64_STANDARD.encode(data);
    format!("data:{};base64,{}", mime_type, base64_data)
}

/// A decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    /// The decoded bytes.
    pub bytes: Vec<u8>,

    /// The MIME type. Always present, but may be [`DEFAULT_MIME_TYPE`].
    pub mime_type: String,
}

/// Why we couldn't decode a payload.
#[derive(Debug)]
pub enum DecodeError {
    /// The input started with `data:` but had no comma separating the header
    /// from the data.
    MalformedDataUrl,

    /// The Base64 data was invalid.
    Base64(base64::DecodeError),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::MalformedDataUrl => {
                write!(f, "failed to decode base64: data URL has no ',' separator")
            }
            DecodeError::Base64(err) => write!(f, "failed to decode base64: {err}"),
        }
    }
}

impl error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            DecodeError::MalformedDataUrl => None,
            DecodeError::Base64(err) => Some(err),
        }
    }
}

/// Parse a `data:` URL into an optional MIME type and Base64-encoded data.
///
/// Returns `None` if this isn't a `data:` URL at all.
fn split_data_url(input: &str) -> Option<Result<(Option<&str>, &str), DecodeError>> {
    if !input.starts_with("data:") {
        return None;
    }
    let Some(caps) = DATA_URL_RE.captures(input) else {
        return Some(Err(DecodeError::MalformedDataUrl));
    };
    let header = caps.name("header").map_or("", |m| m.as_str());
    let data = caps.name("data").map_or("", |m| m.as_str());
    let mime_type = header
        .split(';')
        .next()
        .map(str::trim)
        .filter(|mime| !mime.is_empty());
    Some(Ok((mime_type, data)))
}

/// Decode either a `data:` URL or raw Base64 into bytes and a MIME type.
pub fn decode_payload(input: &str) -> Result<RawPayload, DecodeError> {
    let (declared_mime_type, data) = match split_data_url(input) {
        Some(parsed) => parsed?,
        None => (None, input),
    };

    let bytes = BASE64_STANDARD.decode(data).map_err(DecodeError::Base64)?;

    let mime_type = match declared_mime_type {
        Some(mime_type) => mime_type.to_owned(),
        None => mime_guess::from_path(GENERIC_FILE_NAME)
            .first_raw()
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_owned(),
    };
    Ok(RawPayload { bytes, mime_type })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_data_url_with_declared_mime_type() {
        let bytes = b"%PDF-1.7 not really a pdf".to_vec();
        let payload = decode_payload(&data_url("application/pdf", &bytes)).unwrap();
        assert_eq!(payload.bytes, bytes);
        assert_eq!(payload.mime_type, "application/pdf");
    }

    #[test]
    fn splits_data_url_on_first_comma_only() {
        // "YSxi" decodes to "a,b".
        let payload = decode_payload("data:text/plain;charset=utf-8;base64,YSxi").unwrap();
        assert_eq!(payload.bytes, b"a,b");
        assert_eq!(payload.mime_type, "text/plain");
    }

    #[test]
    fn decodes_raw_base64_with_default_mime_type() {
        let bytes = vec![0u8, 1, 2, 3, 254, 255];
        let payload = decode_payload(&BASE64_STANDARD.encode(&bytes)).unwrap();
        assert_eq!(payload.bytes, bytes);
        assert_eq!(payload.mime_type, DEFAULT_MIME_TYPE);
    }

    #[test]
    fn empty_declared_mime_type_falls_back_to_default() {
        let payload = decode_payload("data:;base64,aGk=").unwrap();
        assert_eq!(payload.bytes, b"hi");
        assert_eq!(payload.mime_type, DEFAULT_MIME_TYPE);
    }

    #[test]
    fn rejects_malformed_base64() {
        for input in ["aGk", "not base64!", "data:image/png;base64,aGk*"] {
            let err = decode_payload(input).unwrap_err();
            assert!(matches!(err, DecodeError::Base64(_)), "{input}: {err:?}");
            assert!(err.to_string().starts_with("failed to decode base64"));
        }
    }

    #[test]
    fn rejects_data_url_without_separator() {
        let err = decode_payload("data:image/png;base64").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedDataUrl));
    }
}
