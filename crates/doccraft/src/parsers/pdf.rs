//! PDF text-layer parser backed by `lopdf`.
//!
//! Scanned PDFs without a text layer come back empty; route those through an
//! OCR or vision-language parser instead.

use crate::parsers::{DocumentParser, ensure_supported};
use crate::types::{ExtractionMetadata, ExtractionResult};
use crate::{DoccraftError, Result};
use async_trait::async_trait;
use lopdf::Document;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Default, Clone)]
pub struct PdfParser;

/// Page-by-page text of one document.
#[derive(Debug)]
struct PdfText {
    text: String,
    page_count: usize,
    pdf_version: String,
    failed_pages: Vec<u32>,
}

impl PdfParser {
    pub fn new() -> Self {
        Self
    }
}

fn extract_pages(path: &Path) -> Result<PdfText> {
    let document = Document::load(path)?;

    if document.is_encrypted() {
        return Err(DoccraftError::parsing(format!(
            "PDF is password-protected: {}",
            path.display()
        )));
    }

    let pages = document.get_pages();
    let mut texts = Vec::with_capacity(pages.len());
    let mut failed_pages = Vec::new();

    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => texts.push(page_text.trim_end().to_string()),
            Err(e) => {
                tracing::debug!("Failed to extract text from page {} of {}: {}", page_number, path.display(), e);
                failed_pages.push(*page_number);
            }
        }
    }

    if !pages.is_empty() && failed_pages.len() == pages.len() {
        return Err(DoccraftError::parsing(format!(
            "No page of {} has an extractable text layer",
            path.display()
        )));
    }

    Ok(PdfText {
        text: texts.join("\n\n"),
        page_count: pages.len(),
        pdf_version: document.version.clone(),
        failed_pages,
    })
}

#[async_trait]
impl DocumentParser for PdfParser {
    fn name(&self) -> &str {
        "pdf"
    }

    fn version(&self) -> String {
        "lopdf-0.38".to_string()
    }

    fn supported_formats(&self) -> &[&str] {
        &["pdf"]
    }

    async fn extract_text(&self, path: &Path) -> Result<ExtractionResult> {
        let file_type = ensure_supported(self, path)?;
        let start = Instant::now();

        let owned: PathBuf = path.to_path_buf();
        let pdf = tokio::task::spawn_blocking(move || extract_pages(&owned))
            .await
            .map_err(|e| DoccraftError::Other(format!("PDF extraction task panicked: {}", e)))??;

        let mut metadata = ExtractionMetadata {
            parser: self.name().to_string(),
            file_type,
            page_count: Some(pdf.page_count),
            ..Default::default()
        };
        metadata
            .extra
            .insert("pdf_version".to_string(), serde_json::Value::String(pdf.pdf_version));

        let mut result = ExtractionResult::new(pdf.text, metadata, start.elapsed().as_secs_f64());
        if !pdf.failed_pages.is_empty() {
            let pages: Vec<String> = pdf.failed_pages.iter().map(|p| p.to_string()).collect();
            result.error = Some(format!("Failed to extract text from pages: {}", pages.join(", ")));
        }

        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};
    use tempfile::TempDir;

    /// Write a minimal PDF with one Courier text line per page.
    pub(crate) fn write_sample_pdf(path: &Path, pages: &[&str]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let page_count = kids.len() as i64;
        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[tokio::test]
    async fn test_extract_text_from_generated_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("invoice.pdf");
        write_sample_pdf(&path, &["Invoice Total 1250", "Paid in 2019"]);

        let result = PdfParser::new().extract_text(&path).await.unwrap();
        assert_eq!(result.metadata.page_count, Some(2));
        assert_eq!(result.metadata.file_type, "pdf");
        assert!(result.text.contains("Invoice Total 1250"));
        assert!(result.text.contains("Paid in 2019"));
        assert!(result.error.is_none());
        assert_eq!(result.metadata.extra["pdf_version"], "1.5");
    }

    #[tokio::test]
    async fn test_truncated_pdf_is_parsing_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\n1 0 obj\n<<").unwrap();

        let err = PdfParser::new().extract_text(&path).await.unwrap_err();
        assert!(
            matches!(err, DoccraftError::Parsing { .. }),
            "Truncated PDF should produce Parsing error, got: {:?}",
            err
        );
    }

    #[tokio::test]
    async fn test_rejects_non_pdf() {
        let err = PdfParser::new().extract_text(Path::new("scan.png")).await.unwrap_err();
        assert!(matches!(err, DoccraftError::UnsupportedFormat(_)));
    }
}
