//! Checks we run on uploads before spending remote-service quota on them.

use std::{error, fmt};

use crate::{
    config::LimitOpts,
    data_url::{DEFAULT_MIME_TYPE, DecodeError, RawPayload, decode_payload},
};

/// Is `data` within our size limit?
pub fn validate_file_size(data: &[u8], max_size: usize) -> bool {
    data.len() <= max_size
}

/// Work out what a payload actually contains.
///
/// A declared MIME type wins. If the client didn't declare one, we identify
/// the content from its magic bytes, which is enough to tell a PNG from a PDF
/// without parsing either.
pub fn resolve_content_type(payload: &RawPayload) -> Option<String> {
    if payload.mime_type != DEFAULT_MIME_TYPE {
        return Some(payload.mime_type.clone());
    }
    infer::get(&payload.bytes).map(|kind| kind.mime_type().to_owned())
}

/// The set of MIME types we accept.
#[derive(Debug, Clone)]
pub struct MimePolicy<'a> {
    supported: &'a [String],
}

impl<'a> MimePolicy<'a> {
    /// Build a policy from our configured limits.
    pub fn new(limits: &'a LimitOpts) -> Self {
        Self {
            supported: &limits.supported_formats,
        }
    }

    /// Do we accept this MIME type? Comparison ignores case.
    pub fn is_supported(&self, mime_type: &str) -> bool {
        self.supported
            .iter()
            .any(|supported| supported.trim().eq_ignore_ascii_case(mime_type.trim()))
    }
}

/// Why we rejected an upload.
#[derive(Debug)]
pub enum UploadError {
    /// No file data at all.
    Missing,

    /// The file data couldn't be decoded.
    Decode(DecodeError),

    /// The decoded file is over our size limit.
    TooLarge {
        /// The configured limit, in bytes.
        max_size: usize,
    },

    /// We couldn't tell what kind of file this is.
    UnknownType,

    /// We know what kind of file this is, and we don't accept it.
    UnsupportedType(String),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Missing => write!(f, "file_data is required"),
            UploadError::Decode(err) => write!(f, "{err}"),
            UploadError::TooLarge { max_size } => {
                write!(f, "file too large: maximum size is {max_size} bytes")
            }
            UploadError::UnknownType => write!(f, "could not determine file type"),
            UploadError::UnsupportedType(mime_type) => {
                write!(f, "unsupported file type: {mime_type}")
            }
        }
    }
}

impl error::Error for UploadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            UploadError::Decode(err) => Some(err),
            _ => None,
        }
    }
}

/// An upload that passed all our checks.
#[derive(Debug)]
pub struct CheckedUpload {
    /// The decoded payload.
    pub payload: RawPayload,

    /// What the payload actually contains.
    pub content_type: String,
}

/// Decode and check an upload, in order: presence, encoding, size, type.
pub fn check_upload(
    file_data: &str,
    limits: &LimitOpts,
) -> Result<CheckedUpload, UploadError> {
    if file_data.trim().is_empty() {
        return Err(UploadError::Missing);
    }
    let payload = decode_payload(file_data).map_err(UploadError::Decode)?;
    if !validate_file_size(&payload.bytes, limits.max_file_size) {
        return Err(UploadError::TooLarge {
            max_size: limits.max_file_size,
        });
    }
    let content_type = resolve_content_type(&payload).ok_or(UploadError::UnknownType)?;
    if !MimePolicy::new(limits).is_supported(&content_type) {
        return Err(UploadError::UnsupportedType(content_type));
    }
    Ok(CheckedUpload {
        payload,
        content_type,
    })
}
