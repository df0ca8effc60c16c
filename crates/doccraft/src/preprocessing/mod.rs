//! Document preprocessing before parsing.
//!
//! Images are cleaned up for OCR (deskew, denoise, contrast, binarization);
//! PDFs pass through unchanged after a structural check.

pub mod image;
pub mod pdf;

use crate::types::ImagePreprocessingConfig;
use crate::{DoccraftError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use self::image::ImagePreprocessor;
pub use self::pdf::PdfPreprocessor;

/// Available preprocessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreprocessorKind {
    Image,
    Pdf,
}

impl PreprocessorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreprocessorKind::Image => "image",
            PreprocessorKind::Pdf => "pdf",
        }
    }

    /// Preprocessor matching a file extension, if any.
    pub fn for_file_type(file_type: &str) -> Option<Self> {
        if crate::core::mime::is_image(file_type) {
            Some(PreprocessorKind::Image)
        } else if file_type == "pdf" {
            Some(PreprocessorKind::Pdf)
        } else {
            None
        }
    }
}

impl fmt::Display for PreprocessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreprocessorKind {
    type Err = DoccraftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(PreprocessorKind::Image),
            "pdf" => Ok(PreprocessorKind::Pdf),
            other => Err(DoccraftError::validation(format!(
                "Unknown preprocessor '{}'. Available preprocessors: image, pdf",
                other
            ))),
        }
    }
}

/// What a preprocessing step did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingMetadata {
    /// Applied operations in order. `["noop"]` for passthrough.
    pub operations: Vec<String>,
    /// True when a new file was written.
    pub enhancement_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_height: Option<u32>,
    /// Detected skew in degrees, when deskew ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skew_angle: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct PreprocessingOutput {
    /// File to hand to the parser.
    pub path: PathBuf,
    pub metadata: PreprocessingMetadata,
}

/// Run the preprocessor `kind` on `path`.
pub async fn preprocess(
    kind: PreprocessorKind,
    path: &Path,
    config: &ImagePreprocessingConfig,
) -> Result<PreprocessingOutput> {
    match kind {
        PreprocessorKind::Image => ImagePreprocessor::new(config.clone()).process(path).await,
        PreprocessorKind::Pdf => PdfPreprocessor::new().process(path).await,
    }
}
