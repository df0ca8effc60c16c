//! Startup-built lookup table from [`ParserKind`] to parser instances.

use crate::core::config::DoccraftConfig;
use crate::parsers::{
    DocumentParser, ParserKind, PdfParser, PlainTextParser, TesseractParser, VisionLanguageParser, VisionModel,
};
use crate::{DoccraftError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of configured parsers.
///
/// Iteration order follows [`ParserKind`]'s declaration order, so listings and
/// multi-parser benchmark runs are deterministic.
pub struct ParserRegistry {
    parsers: BTreeMap<ParserKind, Arc<dyn DocumentParser>>,
}

impl ParserRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            parsers: BTreeMap::new(),
        }
    }

    /// Build every parser kind from `config`.
    pub fn from_config(config: &DoccraftConfig) -> Result<Self> {
        let mut registry = Self::new();

        for kind in ParserKind::ALL {
            let parser: Arc<dyn DocumentParser> = match kind {
                ParserKind::Text => Arc::new(PlainTextParser::new()),
                ParserKind::Pdf => Arc::new(PdfParser::new()),
                ParserKind::Tesseract => Arc::new(TesseractParser::new(config.tesseract.clone())),
                ParserKind::QwenVl => Arc::new(VisionLanguageParser::new(VisionModel::QwenVl, config.vision.clone())?),
                ParserKind::DeepSeekVl => {
                    Arc::new(VisionLanguageParser::new(VisionModel::DeepSeekVl, config.vision.clone())?)
                }
            };
            registry.register(kind, parser)?;
        }

        tracing::debug!("Parser registry initialized with {} parsers", registry.len());
        Ok(registry)
    }

    /// Register a parser for `kind`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `kind` is already registered.
    pub fn register(&mut self, kind: ParserKind, parser: Arc<dyn DocumentParser>) -> Result<()> {
        if self.parsers.contains_key(&kind) {
            return Err(DoccraftError::validation(format!(
                "Parser '{}' is already registered",
                kind
            )));
        }
        self.parsers.insert(kind, parser);
        Ok(())
    }

    pub fn get(&self, kind: ParserKind) -> Option<Arc<dyn DocumentParser>> {
        self.parsers.get(&kind).cloned()
    }

    /// Look up a parser by its string key.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the known keys when `name` is not a
    /// parser kind or the kind was not registered.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn DocumentParser>> {
        let kind: ParserKind = name.parse()?;
        self.get(kind)
            .ok_or_else(|| DoccraftError::validation(format!("Parser '{}' is not registered", kind)))
    }

    /// Registered kinds in declaration order.
    pub fn kinds(&self) -> Vec<ParserKind> {
        self.parsers.keys().copied().collect()
    }

    /// Pick the first registered parser that handles `file_type`, preferring
    /// cheap local engines over model-backed ones.
    pub fn default_for(&self, file_type: &str) -> Option<Arc<dyn DocumentParser>> {
        self.parsers
            .values()
            .find(|parser| parser.supports_format(file_type))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_registers_all_kinds() {
        let registry = ParserRegistry::from_config(&DoccraftConfig::default()).unwrap();
        assert_eq!(registry.len(), ParserKind::ALL.len());
        assert_eq!(registry.kinds(), ParserKind::ALL.to_vec());
    }

    #[test]
    fn test_resolve_by_key() {
        let registry = ParserRegistry::from_config(&DoccraftConfig::default()).unwrap();
        assert_eq!(registry.resolve("tesseract").unwrap().name(), "tesseract");
        assert_eq!(registry.resolve("qwen-vl").unwrap().name(), "qwenvl");
        assert!(registry.resolve("pymupdf").is_err());
    }

    #[test]
    fn test_resolve_unregistered_kind() {
        let mut registry = ParserRegistry::new();
        registry.register(ParserKind::Text, Arc::new(PlainTextParser::new())).unwrap();

        let err = registry.resolve("pdf").err().unwrap();
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ParserRegistry::new();
        registry.register(ParserKind::Pdf, Arc::new(PdfParser::new())).unwrap();
        assert!(registry.register(ParserKind::Pdf, Arc::new(PdfParser::new())).is_err());
    }

    #[test]
    fn test_default_for_file_type() {
        let registry = ParserRegistry::from_config(&DoccraftConfig::default()).unwrap();
        assert_eq!(registry.default_for("pdf").unwrap().name(), "pdf");
        assert_eq!(registry.default_for("png").unwrap().name(), "tesseract");
        assert_eq!(registry.default_for("md").unwrap().name(), "text");
        assert!(registry.default_for("docx").is_none());
    }
}
