//! Attachment validation logic
//!
//! Filters caller-supplied files by MIME type and size before they reach the
//! composer. Validation is pure: reporting rejections to the user is the
//! caller's job.

use thiserror::Error;

use crate::models::Attachment;

/// 10 MiB per file
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// MIME prefixes accepted as a whole family (`image/*` and so on)
pub const ALLOWED_TYPE_PREFIXES: &[&str] = &["image/", "video/", "text/"];

/// MIME types accepted individually
pub const ALLOWED_TYPES: &[&str] = &["application/pdf"];

/// Prefixes of the types that are transmitted to the model
pub const MEDIA_TYPE_PREFIXES: &[&str] = &["image/", "video/"];

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{mime_type} is not an allowed file type")]
    InvalidType { mime_type: String },

    #[error("file is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },
}

/// Outcome of validating a batch of files, in input order
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub accepted: Vec<Attachment>,
    pub rejected: Vec<(Attachment, ValidationError)>,
}

/// Validate a single file for attachment.
///
/// The type check runs first, so a disallowed type is reported as
/// `InvalidType` whatever its size.
pub fn validate_attachment(file: &Attachment) -> Result<(), ValidationError> {
    if !is_allowed_type(file.mime_type()) {
        return Err(ValidationError::InvalidType {
            mime_type: file.mime_type().to_string(),
        });
    }

    let size = file.size();
    if size > MAX_FILE_SIZE {
        return Err(ValidationError::TooLarge {
            size,
            max: MAX_FILE_SIZE,
        });
    }

    Ok(())
}

/// Split files into accepted and rejected ones
pub fn validate(files: Vec<Attachment>) -> ValidationReport {
    let mut report = ValidationReport::default();
    for file in files {
        match validate_attachment(&file) {
            Ok(()) => report.accepted.push(file),
            Err(reason) => report.rejected.push((file, reason)),
        }
    }
    report
}

/// Check if a MIME type is on the allowlist
pub fn is_allowed_type(mime_type: &str) -> bool {
    let mime = mime_type.to_ascii_lowercase();
    ALLOWED_TYPE_PREFIXES
        .iter()
        .any(|prefix| mime.starts_with(prefix))
        || ALLOWED_TYPES.contains(&mime.as_str())
}

/// Check if a MIME type is an image or video
pub fn is_media_type(mime_type: &str) -> bool {
    let mime = mime_type.to_ascii_lowercase();
    MEDIA_TYPE_PREFIXES
        .iter()
        .any(|prefix| mime.starts_with(prefix))
}
