//! Parser adapters.
//!
//! Every engine doccraft can drive (PDF text layer, Tesseract, vision-language
//! models, plain text) is exposed through the [`DocumentParser`] trait. The set of
//! engines is closed: [`ParserKind`] enumerates them and
//! [`ParserRegistry`](registry::ParserRegistry) maps each kind to a configured
//! instance at startup.

pub mod pdf;
pub mod registry;
pub mod tesseract;
pub mod text;
pub mod vision;

use crate::types::{ExtractionResult, QuestionAnswer};
use crate::{DoccraftError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub use pdf::PdfParser;
pub use registry::ParserRegistry;
pub use tesseract::TesseractParser;
pub use text::PlainTextParser;
pub use vision::{VisionLanguageParser, VisionModel};

/// Closed set of parser engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    /// UTF-8 text files read verbatim
    Text,
    /// PDF text layer
    Pdf,
    /// Tesseract OCR command-line engine
    Tesseract,
    /// Qwen-VL behind an OpenAI-compatible endpoint
    QwenVl,
    /// DeepSeek-VL behind an OpenAI-compatible endpoint
    DeepSeekVl,
}

impl ParserKind {
    pub const ALL: [ParserKind; 5] = [
        ParserKind::Text,
        ParserKind::Pdf,
        ParserKind::Tesseract,
        ParserKind::QwenVl,
        ParserKind::DeepSeekVl,
    ];

    /// Registry key, as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParserKind::Text => "text",
            ParserKind::Pdf => "pdf",
            ParserKind::Tesseract => "tesseract",
            ParserKind::QwenVl => "qwenvl",
            ParserKind::DeepSeekVl => "deepseekvl",
        }
    }

    pub fn keys() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.as_str()).collect()
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParserKind {
    type Err = DoccraftError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == key)
            .ok_or_else(|| {
                DoccraftError::validation(format!(
                    "Unknown parser '{}'. Available parsers: {}",
                    s,
                    Self::keys().join(", ")
                ))
            })
    }
}

/// Uniform capability interface over document engines.
///
/// `extract_text` is mandatory. Engines that can answer questions about a
/// document directly (vision-language models) also override
/// [`supports_question_answering`](Self::supports_question_answering) and
/// [`ask_question`](Self::ask_question).
///
/// # Thread Safety
///
/// Parsers must be `Send + Sync`; benchmark runs may share one instance across
/// concurrently processed questions.
///
/// # Example
///
/// ```rust
/// use doccraft::parsers::DocumentParser;
/// use doccraft::types::{ExtractionMetadata, ExtractionResult};
/// use doccraft::Result;
/// use async_trait::async_trait;
/// use std::path::Path;
///
/// struct EchoParser;
///
/// #[async_trait]
/// impl DocumentParser for EchoParser {
///     fn name(&self) -> &str { "echo" }
///
///     fn supported_formats(&self) -> &[&str] { &["txt"] }
///
///     async fn extract_text(&self, path: &Path) -> Result<ExtractionResult> {
///         let metadata = ExtractionMetadata { parser: "echo".to_string(), ..Default::default() };
///         Ok(ExtractionResult::new(path.display().to_string(), metadata, 0.0))
///     }
/// }
/// ```
#[async_trait]
pub trait DocumentParser: Send + Sync {
    /// Registry key of this parser.
    fn name(&self) -> &str;

    /// Engine or model version, when known.
    fn version(&self) -> String {
        "unknown".to_string()
    }

    /// Lowercase file extensions this parser accepts.
    fn supported_formats(&self) -> &[&str];

    fn supports_format(&self, file_type: &str) -> bool {
        let file_type = file_type.trim_start_matches('.').to_ascii_lowercase();
        self.supported_formats().iter().any(|f| *f == file_type)
    }

    /// Whether the backing engine can be used right now (binary on PATH, etc.).
    fn is_available(&self) -> bool {
        true
    }

    /// Extract the document's text.
    ///
    /// # Errors
    ///
    /// - `DoccraftError::UnsupportedFormat` - the file type is not handled
    /// - `DoccraftError::MissingDependency` - the engine is not installed
    /// - `DoccraftError::Io` - the file cannot be read
    async fn extract_text(&self, path: &Path) -> Result<ExtractionResult>;

    fn supports_question_answering(&self) -> bool {
        false
    }

    /// Answer a natural-language question about the document.
    async fn ask_question(&self, _path: &Path, _question: &str) -> Result<QuestionAnswer> {
        Err(DoccraftError::unsupported_operation(self.name(), "question answering"))
    }
}

/// Reject `path` early when the parser does not handle its extension.
pub(crate) fn ensure_supported(parser: &dyn DocumentParser, path: &Path) -> Result<String> {
    let file_type = crate::core::mime::detect_file_type(path);
    if !parser.supports_format(&file_type) {
        return Err(DoccraftError::UnsupportedFormat(format!(
            "{} cannot handle '{}' files ({})",
            parser.name(),
            file_type,
            path.display()
        )));
    }
    Ok(file_type)
}
