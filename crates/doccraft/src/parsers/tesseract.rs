//! Tesseract OCR via the `tesseract` command-line tool.

use crate::core::config::TesseractConfig;
use crate::core::mime::IMAGE_EXTENSIONS;
use crate::parsers::{DocumentParser, ensure_supported};
use crate::types::{ExtractionMetadata, ExtractionResult};
use crate::{DoccraftError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Runs `tesseract <image> stdout -l <lang> --psm <n>` per document.
#[derive(Debug, Clone)]
pub struct TesseractParser {
    config: TesseractConfig,
}

impl TesseractParser {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    fn build_args(&self, image_path: &Path) -> Vec<String> {
        vec![
            image_path.to_string_lossy().into_owned(),
            "stdout".to_string(),
            "-l".to_string(),
            self.config.language.clone(),
            "--psm".to_string(),
            self.config.psm.to_string(),
        ]
    }

    async fn run(&self, image_path: &Path) -> Result<String> {
        let mut command = Command::new(&self.config.binary);
        command
            .args(self.build_args(image_path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DoccraftError::MissingDependency(format!(
                    "{} not found (install tesseract-ocr)",
                    self.config.binary
                ))
            } else {
                DoccraftError::Io(e)
            }
        })?;

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                DoccraftError::Timeout(format!(
                    "tesseract exceeded {:?} on {}",
                    timeout,
                    image_path.display()
                ))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DoccraftError::ocr(format!(
                "tesseract failed with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for TesseractParser {
    fn default() -> Self {
        Self::new(TesseractConfig::default())
    }
}

#[async_trait]
impl DocumentParser for TesseractParser {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn supported_formats(&self) -> &[&str] {
        IMAGE_EXTENSIONS
    }

    fn is_available(&self) -> bool {
        which::which(&self.config.binary).is_ok()
    }

    async fn extract_text(&self, path: &Path) -> Result<ExtractionResult> {
        let file_type = ensure_supported(self, path)?;
        if !path.is_file() {
            return Err(DoccraftError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Image not found: {}", path.display()),
            )));
        }

        let start = Instant::now();
        let text = self.run(path).await?;
        tracing::debug!("tesseract produced {} chars for {}", text.len(), path.display());

        let mut metadata = ExtractionMetadata {
            parser: self.name().to_string(),
            file_type,
            page_count: Some(1),
            ..Default::default()
        };
        metadata.extra.insert(
            "language".to_string(),
            serde_json::Value::String(self.config.language.clone()),
        );
        metadata
            .extra
            .insert("psm".to_string(), serde_json::Value::from(self.config.psm));

        Ok(ExtractionResult::new(text, metadata, start.elapsed().as_secs_f64()))
    }
}
