//! Registry lookup feeding pre- and post-processing, with a mock OCR engine

use async_trait::async_trait;
use doccraft::postprocessing::{TableFormat, TablePostprocessor, TextPostprocessor};
use doccraft::preprocessing::{PreprocessorKind, preprocess};
use doccraft::types::{ImagePreprocessingConfig, TextPostprocessingConfig};
use doccraft::{DoccraftError, DocumentParser, ExtractionMetadata, ExtractionResult, ParserKind, ParserRegistry};
use image::{GrayImage, Luma};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const OCR_OUTPUT: &str = "The c0ntract was signed \u{201C}today\u{201D} by the docu-\nment owner .\n\n\n\nPage 2";

struct MockOcr;

#[async_trait]
impl DocumentParser for MockOcr {
    fn name(&self) -> &str {
        "mock-ocr"
    }

    fn supported_formats(&self) -> &[&str] {
        &["png"]
    }

    async fn extract_text(&self, path: &Path) -> doccraft::Result<ExtractionResult> {
        if !path.exists() {
            return Err(DoccraftError::ocr(format!("missing image {}", path.display())));
        }
        let metadata = ExtractionMetadata {
            parser: self.name().to_string(),
            file_type: "png".to_string(),
            ..Default::default()
        };
        Ok(ExtractionResult::new(OCR_OUTPUT.to_string(), metadata, 0.01))
    }
}

fn registry() -> ParserRegistry {
    let mut registry = ParserRegistry::new();
    registry.register(ParserKind::Tesseract, Arc::new(MockOcr)).unwrap();
    registry
}

fn write_scan(dir: &Path) -> std::path::PathBuf {
    let mut image = GrayImage::from_pixel(64, 32, Luma([250]));
    for x in 8..56 {
        image.put_pixel(x, 16, Luma([10]));
    }
    let path = dir.join("scan.png");
    image.save(&path).unwrap();
    path
}

#[tokio::test]
async fn test_preprocess_parse_postprocess() {
    let dir = TempDir::new().unwrap();
    let scan = write_scan(dir.path());

    let kind = PreprocessorKind::for_file_type("png").unwrap();
    let preprocessed = preprocess(kind, &scan, &ImagePreprocessingConfig::default())
        .await
        .unwrap();
    assert!(preprocessed.path.ends_with("scan_preprocessed.png"));
    assert!(preprocessed.metadata.enhancement_applied);
    assert_eq!(preprocessed.metadata.original_width, Some(64));

    let parser = registry().resolve("tesseract").unwrap();
    let extraction = parser.extract_text(&preprocessed.path).await.unwrap();

    let (text, metadata) = TextPostprocessor::new(TextPostprocessingConfig::default()).process(&extraction.text);
    assert!(text.contains("contract"));
    assert!(text.contains("\"today\""));
    assert!(text.contains("document owner."));
    assert!(!text.contains("\n\n\n"));
    assert_eq!(metadata.text_statistics.paragraph_count, 2);
}

#[tokio::test]
async fn test_unsupported_question_answering() {
    let parser = registry().get(ParserKind::Tesseract).unwrap();
    assert!(!parser.supports_question_answering());
    let err = parser.ask_question(Path::new("scan.png"), "Who?").await.unwrap_err();
    assert!(matches!(err, DoccraftError::UnsupportedOperation { .. }));
}

#[test]
fn test_resolve_unknown_and_unregistered() {
    let registry = registry();
    let err = registry.resolve("docling").err().unwrap();
    assert!(err.to_string().contains("tesseract"));
    assert!(registry.resolve("pdf").is_err());
    assert!(registry.default_for("png").is_some());
    assert!(registry.default_for("pdf").is_none());
}

#[test]
fn test_table_export_from_pipe_delimited_text() {
    let (html, metadata) = TablePostprocessor::new()
        .process("item | price\n<b>bolt</b> | 0.10\nnut | 0.05", TableFormat::Html)
        .unwrap();
    assert_eq!(metadata.rows, 2);
    assert_eq!(metadata.columns, 2);
    assert_eq!(metadata.delimiter, "|");
    assert!(html.contains("&lt;b&gt;bolt&lt;/b&gt;"));
}
