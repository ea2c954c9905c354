//! Image attachments

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Response of the upload endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUploadResponse {
    pub url: String,
    #[serde(rename = "mensaje", default)]
    pub message: String,
}

/// Image selected for upload
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Guess the content type from the file extension
    pub fn from_path_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Only images up to `max_bytes` are accepted
    pub fn validate(&self, max_bytes: usize) -> Result<()> {
        if !self.content_type.starts_with("image/") {
            return Err(AppError::Validation(
                "Only image files are allowed".to_string(),
            ));
        }
        if self.size() > max_bytes {
            return Err(AppError::Validation(format!(
                "Image cannot exceed {}",
                format_limit(max_bytes)
            )));
        }
        Ok(())
    }
}

/// Largest unit that divides the limit exactly
fn format_limit(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;
    match bytes {
        0 => "0 bytes".to_string(),
        b if b % MB == 0 => format!("{}MB", b / MB),
        b if b % KB == 0 => format!("{}KB", b / KB),
        b => format!("{} bytes", b),
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
