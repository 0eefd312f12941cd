//! Email attachments.

use crate::{MailError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::path::Path;

/// MIME type used when none is known.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file sent along with an email, such as an uploaded CV or a payment
/// receipt.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        let content_type = content_type.into();
        Self {
            filename: filename.into(),
            content_type: if content_type.trim().is_empty() {
                DEFAULT_CONTENT_TYPE.to_string()
            } else {
                content_type
            },
            data: data.into(),
        }
    }

    /// Read an attachment from disk, guessing the MIME type from the extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MailError::Attachment("Invalid file name".to_string()))?
            .to_string();

        let data = std::fs::read(path)?;
        Ok(Self::from_bytes(filename, data))
    }

    /// Create an attachment from bytes, guessing the MIME type from `filename`.
    pub fn from_bytes(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename);
        Self::new(filename, content_type, data)
    }

    /// Decode an attachment whose content arrived base64 encoded.
    pub fn from_base64(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        encoded: &str,
    ) -> Result<Self> {
        let data = STANDARD
            .decode(encoded.trim())
            .map_err(|e| MailError::Attachment(format!("Invalid base64 content: {e}")))?;
        Ok(Self::new(filename, content_type, data))
    }

    pub fn pdf(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(filename, "application/pdf", data)
    }

    /// Content as standard base64, the encoding HTTP mail APIs expect.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

fn guess_content_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}
