//! Benchmark fixtures
//!
//! A fixture is a JSON file sitting next to (or above) the document it
//! describes. Paths inside it are relative to the fixture file:
//!
//! ```json
//! {
//!   "document": "documents/invoice.pdf",
//!   "file_type": "pdf",
//!   "parsers": ["pdf", "tesseract"],
//!   "metadata": { "pages": 2 },
//!   "ground_truth": {
//!     "text_file": "ground_truth/invoice.txt",
//!     "source": "manual"
//!   }
//! }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub document: PathBuf,

    /// Lowercase extension, e.g. "pdf" or "png"
    pub file_type: String,

    /// Restricts which parsers run on this document; empty means all that
    /// support `file_type`
    #[serde(default)]
    pub parsers: Vec<String>,

    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub ground_truth: Option<GroundTruth>,
}

/// How a reference transcription was produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundTruthSource {
    PdfTextLayer,
    Transcription,
    #[default]
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruth {
    pub text_file: PathBuf,
    #[serde(default)]
    pub source: GroundTruthSource,
}

impl Fixture {
    /// Parse and check a fixture file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let invalid = |reason: String| Error::InvalidFixture {
            path: path.to_path_buf(),
            reason,
        };

        let contents = std::fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&contents).map_err(|e| invalid(e.to_string()))?;
        fixture.problems().map_or(Ok(fixture), |reason| Err(invalid(reason)))
    }

    /// First structural problem, if any
    fn problems(&self) -> Option<String> {
        if self.file_type.trim().is_empty() {
            return Some("file_type is empty".to_string());
        }
        if self.document.is_absolute() {
            return Some(format!("document {} is not relative", self.document.display()));
        }
        match &self.ground_truth {
            Some(gt) if gt.text_file.is_absolute() => Some(format!(
                "ground_truth.text_file {} is not relative",
                gt.text_file.display()
            )),
            _ => None,
        }
    }

    /// The document, resolved against the directory holding `fixture_path`
    pub fn document_path(&self, fixture_path: &Path) -> PathBuf {
        base_dir(fixture_path).join(&self.document)
    }

    /// The reference text file, resolved like [`document_path`](Self::document_path)
    pub fn ground_truth_path(&self, fixture_path: &Path) -> Option<PathBuf> {
        self.ground_truth
            .as_ref()
            .map(|gt| base_dir(fixture_path).join(&gt.text_file))
    }

    /// Whether `parser` should run on this fixture
    pub fn targets(&self, parser: &str) -> bool {
        self.parsers.is_empty() || self.parsers.iter().any(|p| p.eq_ignore_ascii_case(parser))
    }
}

fn base_dir(fixture_path: &Path) -> &Path {
    fixture_path.parent().unwrap_or_else(|| Path::new("."))
}

/// Loaded fixtures, keyed by the file they came from
#[derive(Debug, Default)]
pub struct FixtureManager {
    fixtures: Vec<(PathBuf, Fixture)>,
}

impl FixtureManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_fixture(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::FixtureNotFound(path.to_path_buf()));
        }
        let fixture = Fixture::from_file(path)?;
        self.fixtures.push((path.to_path_buf(), fixture));
        Ok(())
    }

    /// Load one fixture file, or every `*.json` below a directory
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.is_dir() {
            self.load_fixtures_from_dir(path)
        } else {
            self.load_fixture(path)
        }
    }

    /// Recursive, in path order. Broken fixtures are logged and skipped;
    /// [`validate_dir`] reports them instead.
    pub fn load_fixtures_from_dir(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let before = self.fixtures.len();
        for path in fixture_files(dir.as_ref())? {
            if let Err(e) = self.load_fixture(&path) {
                warn!("Skipping fixture {}: {}", path.display(), e);
            }
        }
        debug!("Loaded {} fixtures from {}", self.fixtures.len() - before, dir.as_ref().display());
        Ok(())
    }

    /// Keep only fixtures whose file stem is in `names`; an empty set keeps all
    pub fn retain_named(&mut self, names: &BTreeSet<String>) {
        if names.is_empty() {
            return;
        }
        self.fixtures.retain(|(path, _)| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| names.contains(stem))
        });
    }

    pub fn fixtures(&self) -> &[(PathBuf, Fixture)] {
        &self.fixtures
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }
}

fn fixture_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::FixtureNotFound(dir.to_path_buf()));
    }

    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    let mut files = Vec::new();
    for path in entries {
        if path.is_dir() {
            files.extend(fixture_files(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    Ok(files)
}

/// Check every fixture below `dir` and the files it points at
///
/// Returns the fixture count, or the first problem found.
pub fn validate_dir(dir: impl AsRef<Path>) -> Result<usize> {
    let files = fixture_files(dir.as_ref())?;
    for path in &files {
        let fixture = Fixture::from_file(path)?;
        let document = fixture.document_path(path);
        if !document.is_file() {
            return Err(Error::DocumentNotFound(document));
        }
        if let Some(reference) = fixture.ground_truth_path(path)
            && !reference.is_file()
        {
            return Err(Error::InvalidFixture {
                path: path.clone(),
                reason: format!("ground truth file not found: {}", reference.display()),
            });
        }
    }
    Ok(files.len())
}
