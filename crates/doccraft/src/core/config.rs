//! Configuration loading and management.
//!
//! Configuration can be loaded from TOML, YAML or JSON files, discovered in the
//! directory hierarchy, or built programmatically. Every section has defaults,
//! so a config file only needs to name the values it changes.

use crate::types::{ImagePreprocessingConfig, TextPostprocessingConfig};
use crate::{DoccraftError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAMES: [&str; 4] = ["doccraft.toml", "doccraft.yaml", "doccraft.yml", "doccraft.json"];

/// Top-level doccraft configuration.
///
/// # Example
///
/// ```rust
/// use doccraft::core::config::DoccraftConfig;
///
/// let config = DoccraftConfig::default();
/// assert_eq!(config.tesseract.language, "eng");
///
/// // let config = DoccraftConfig::from_file("doccraft.toml")?;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DoccraftConfig {
    pub tesseract: TesseractConfig,
    pub vision: VisionConfig,
    pub image_preprocessing: ImagePreprocessingConfig,
    pub text_postprocessing: TextPostprocessingConfig,
}

/// Tesseract CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    /// Executable name or path.
    pub binary: String,

    /// Language code (e.g., "eng", "deu", "eng+fra").
    pub language: String,

    /// Page Segmentation Mode (0-13).
    ///
    /// Common values:
    /// - 3: Fully automatic page segmentation (default)
    /// - 6: Assume a single uniform block of text
    /// - 11: Sparse text with no particular order
    pub psm: u8,

    pub timeout_secs: u64,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            language: "eng".to_string(),
            psm: 3,
            timeout_secs: 120,
        }
    }
}

/// OpenAI-compatible vision-language endpoint settings.
///
/// Works with any server exposing `/chat/completions` with image inputs
/// (vLLM, Ollama, LM Studio, hosted APIs).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Base URL up to and including the version segment, e.g. `http://localhost:8000/v1`.
    pub base_url: String,

    /// Environment variable holding the API key. Unset or empty means no auth header.
    pub api_key_env: String,

    pub qwen_model: String,
    pub deepseek_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,

    /// Retries after HTTP 429 before giving up.
    pub max_retries: u32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            api_key_env: "DOCCRAFT_VISION_API_KEY".to_string(),
            qwen_model: "Qwen/Qwen2.5-VL-7B-Instruct".to_string(),
            deepseek_model: "deepseek-ai/deepseek-vl2-small".to_string(),
            max_tokens: 512,
            temperature: 0.0,
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

impl DoccraftConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;

        toml::from_str(&content)
            .map_err(|e| DoccraftError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;

        serde_yaml_ng::from_str(&content)
            .map_err(|e| DoccraftError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;

        serde_json::from_str(&content)
            .map_err(|e| DoccraftError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration, picking the format from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        let config = match extension.as_str() {
            "toml" => Self::from_toml_file(path)?,
            "yaml" | "yml" => Self::from_yaml_file(path)?,
            "json" => Self::from_json_file(path)?,
            other => {
                return Err(DoccraftError::validation(format!(
                    "Unsupported config format '{}' for {} (expected toml, yaml or json)",
                    other,
                    path.display()
                )));
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Discover a configuration file in the current directory or its parents.
    ///
    /// # Returns
    ///
    /// - `Some((path, config))` for the nearest `doccraft.{toml,yaml,yml,json}`
    /// - `None` if no config file was found
    pub fn discover() -> Result<Option<(PathBuf, Self)>> {
        let current = std::env::current_dir().map_err(DoccraftError::Io)?;
        Self::discover_from(&current)
    }

    /// Same as [`discover`](Self::discover), starting at `start`.
    pub fn discover_from(start: &Path) -> Result<Option<(PathBuf, Self)>> {
        let mut current = Some(start);

        while let Some(dir) = current {
            for name in CONFIG_FILE_NAMES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    let config = Self::from_file(&candidate)?;
                    return Ok(Some((candidate, config)));
                }
            }
            current = dir.parent();
        }

        Ok(None)
    }

    /// Validate value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.tesseract.psm > 13 {
            return Err(DoccraftError::validation(format!(
                "tesseract.psm must be 0-13, got {}",
                self.tesseract.psm
            )));
        }

        if self.tesseract.language.trim().is_empty() {
            return Err(DoccraftError::validation("tesseract.language cannot be empty"));
        }

        if self.tesseract.timeout_secs == 0 || self.vision.timeout_secs == 0 {
            return Err(DoccraftError::validation("timeouts must be > 0"));
        }

        if !(0.0..=2.0).contains(&self.vision.temperature) {
            return Err(DoccraftError::validation(format!(
                "vision.temperature must be 0.0-2.0, got {}",
                self.vision.temperature
            )));
        }

        if !self.vision.base_url.starts_with("http://") && !self.vision.base_url.starts_with("https://") {
            return Err(DoccraftError::validation(format!(
                "vision.base_url must be an http(s) URL, got '{}'",
                self.vision.base_url
            )));
        }

        if !(0.0..=45.0).contains(&self.image_preprocessing.max_skew_degrees) {
            return Err(DoccraftError::validation("image_preprocessing.max_skew_degrees must be 0-45"));
        }

        Ok(())
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| DoccraftError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}
