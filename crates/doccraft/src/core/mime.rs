//! File type detection from paths.

use crate::{DoccraftError, Result};
use std::path::Path;

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";

/// Raster formats accepted by the OCR and vision-language parsers.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif", "webp"];

/// Plain-text formats read verbatim by the text parser.
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown", "csv", "tsv", "log"];

/// Lowercase extension of `path` without the dot, or an empty string.
pub fn detect_file_type(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// True when `file_type` names a raster image format.
pub fn is_image(file_type: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&file_type)
}

/// Guess the MIME type of `path` from its extension.
///
/// # Errors
///
/// Returns `UnsupportedFormat` when the extension is unknown.
pub fn detect_mime_type(path: &Path) -> Result<String> {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .ok_or_else(|| DoccraftError::UnsupportedFormat(format!("Cannot determine MIME type of {}", path.display())))
}
