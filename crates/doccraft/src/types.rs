use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Output of [`DocumentParser::extract_text`](crate::parsers::DocumentParser::extract_text).
///
/// `error` is reserved for partial failures that did not prevent extraction,
/// e.g. individual PDF pages whose content streams could not be decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: String,
    pub metadata: ExtractionMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock extraction time in seconds.
    pub extraction_time: f64,
}

impl ExtractionResult {
    pub fn new(text: String, metadata: ExtractionMetadata, extraction_time: f64) -> Self {
        Self {
            text,
            metadata,
            error: None,
            extraction_time,
        }
    }

    /// True when no usable text was produced.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// Key of the parser that produced the result.
    pub parser: String,
    /// Lowercase file extension of the source document.
    pub file_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Output of [`DocumentParser::ask_question`](crate::parsers::DocumentParser::ask_question).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub answer: String,
    /// Model confidence in `[0, 1]`, when the engine reports one.
    pub confidence: Option<f64>,
}

/// Image preprocessing configuration.
///
/// Grayscale conversion always runs; every other step is opt-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagePreprocessingConfig {
    /// Correct skew (tilted scans).
    pub deskew: bool,

    /// Largest skew angle searched in either direction, in degrees.
    pub max_skew_degrees: f32,

    /// Median-filter salt-and-pepper noise.
    pub denoise: bool,

    /// Histogram equalization.
    pub contrast_enhance: bool,

    /// Otsu binarization.
    pub binarize: bool,

    /// Invert colors (white text on black → black on white).
    pub invert_colors: bool,

    /// Directory for processed images. Defaults to the input's directory.
    pub output_dir: Option<PathBuf>,
}

impl Default for ImagePreprocessingConfig {
    fn default() -> Self {
        Self {
            deskew: true,
            max_skew_degrees: 5.0,
            denoise: false,
            contrast_enhance: true,
            binarize: false,
            invert_colors: false,
            output_dir: None,
        }
    }
}

/// Text postprocessing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextPostprocessingConfig {
    /// Replace typographic quotes, dashes and ligatures with ASCII equivalents.
    pub normalize_unicode: bool,

    /// Join words hyphenated across line breaks.
    pub dehyphenate: bool,

    /// Fix common OCR character confusions.
    pub fix_ocr_errors: bool,

    /// Collapse runs of whitespace and blank lines.
    pub normalize_whitespace: bool,
}

impl Default for TextPostprocessingConfig {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            dehyphenate: true,
            fix_ocr_errors: true,
            normalize_whitespace: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_result_skips_empty_fields() {
        let result = ExtractionResult::new(
            "hello".to_string(),
            ExtractionMetadata {
                parser: "text".to_string(),
                file_type: "txt".to_string(),
                ..Default::default()
            },
            0.25,
        );

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("error").is_none());
        assert!(json["metadata"].get("page_count").is_none());
        assert!(json["metadata"].get("extra").is_none());
        assert_eq!(json["extraction_time"], 0.25);
    }

    #[test]
    fn test_preprocessing_config_partial_deserialize() {
        let config: ImagePreprocessingConfig = serde_json::from_str(r#"{"binarize": true}"#).unwrap();
        assert!(config.binarize);
        assert!(config.deskew);
        assert_eq!(config.max_skew_degrees, 5.0);
    }
}
