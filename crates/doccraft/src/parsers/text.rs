//! Plain-text passthrough parser.

use crate::core::mime::TEXT_EXTENSIONS;
use crate::parsers::{DocumentParser, ensure_supported};
use crate::types::{ExtractionMetadata, ExtractionResult};
use crate::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Instant;

/// Reads text files as UTF-8, replacing invalid sequences.
#[derive(Debug, Default, Clone)]
pub struct PlainTextParser;

impl PlainTextParser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentParser for PlainTextParser {
    fn name(&self) -> &str {
        "text"
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn supported_formats(&self) -> &[&str] {
        TEXT_EXTENSIONS
    }

    async fn extract_text(&self, path: &Path) -> Result<ExtractionResult> {
        let file_type = ensure_supported(self, path)?;
        let start = Instant::now();

        let bytes = tokio::fs::read(path).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        let metadata = ExtractionMetadata {
            parser: self.name().to_string(),
            file_type,
            ..Default::default()
        };

        Ok(ExtractionResult::new(text, metadata, start.elapsed().as_secs_f64()))
    }
}
