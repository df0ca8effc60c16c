//! PDF passthrough preprocessing.

use crate::preprocessing::{PreprocessingMetadata, PreprocessingOutput};
use crate::{DoccraftError, Result};
use std::path::Path;

/// Checks that the file loads as a PDF and returns it unchanged.
#[derive(Debug, Default, Clone)]
pub struct PdfPreprocessor;

impl PdfPreprocessor {
    pub fn new() -> Self {
        Self
    }

    pub async fn process(&self, path: &Path) -> Result<PreprocessingOutput> {
        let owned = path.to_path_buf();
        let page_count = tokio::task::spawn_blocking(move || -> Result<usize> {
            let document = lopdf::Document::load(&owned)?;
            Ok(document.get_pages().len())
        })
        .await
        .map_err(|e| DoccraftError::Other(format!("PDF preprocessing task panicked: {}", e)))??;

        Ok(PreprocessingOutput {
            path: path.to_path_buf(),
            metadata: PreprocessingMetadata {
                operations: vec!["noop".to_string()],
                enhancement_applied: false,
                page_count: Some(page_count),
                ..Default::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::pdf::tests::write_sample_pdf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_passthrough_returns_same_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.pdf");
        write_sample_pdf(&path, &["Quarterly report", "Appendix"]);

        let output = PdfPreprocessor::new().process(&path).await.unwrap();
        assert_eq!(output.path, path);
        assert_eq!(output.metadata.operations, vec!["noop"]);
        assert!(!output.metadata.enhancement_applied);
        assert_eq!(output.metadata.page_count, Some(2));
    }

    #[tokio::test]
    async fn test_rejects_non_pdf_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"plain text pretending to be a pdf").unwrap();

        assert!(PdfPreprocessor::new().process(&path).await.is_err());
    }
}
