//! Benchmark configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which benchmark a pipeline run should perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkKind {
    /// Timing and resource usage per extraction
    Performance,
    /// Extracted text against a reference transcription
    Accuracy,
    /// Question answering over a DocVQA dataset
    DocVqa,
}

impl BenchmarkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BenchmarkKind::Performance => "performance",
            BenchmarkKind::Accuracy => "accuracy",
            BenchmarkKind::DocVqa => "docvqa",
        }
    }
}

impl fmt::Display for BenchmarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BenchmarkKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "performance" | "perf" => Ok(BenchmarkKind::Performance),
            "accuracy" => Ok(BenchmarkKind::Accuracy),
            "docvqa" => Ok(BenchmarkKind::DocVqa),
            other => Err(crate::Error::Config(format!(
                "Unknown benchmark '{}'. Expected performance, accuracy or docvqa",
                other
            ))),
        }
    }
}

/// Settings shared by fixture-driven performance and accuracy runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Deadline for one extraction, warmups included
    pub timeout: Duration,

    pub output_dir: PathBuf,

    /// How often the resource monitor samples the process, in milliseconds
    pub sample_interval_ms: u64,

    /// Runs before measurement starts; never reported
    pub warmup_iterations: usize,

    /// Measured runs per (document, parser) pair
    pub benchmark_iterations: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1800),
            output_dir: PathBuf::from("results"),
            sample_interval_ms: 10,
            warmup_iterations: 1,
            benchmark_iterations: 3,
        }
    }
}

fn require_nonzero(field: &str, is_zero: bool) -> crate::Result<()> {
    if is_zero {
        Err(crate::Error::Config(format!("{} must be greater than zero", field)))
    } else {
        Ok(())
    }
}

impl BenchmarkConfig {
    /// Fails with [`Error::Config`](crate::Error::Config) naming the first bad field
    pub fn validate(&self) -> crate::Result<()> {
        require_nonzero("timeout", self.timeout.is_zero())?;
        require_nonzero("sample_interval_ms", self.sample_interval_ms == 0)?;
        require_nonzero("benchmark_iterations", self.benchmark_iterations == 0)
    }
}

/// Configuration for a DocVQA prediction and evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocVqaConfig {
    /// Dataset JSON file (`{"data": [...]}`)
    pub dataset: PathBuf,

    /// Directory holding the document images/PDFs
    pub documents_dir: PathBuf,

    /// Where predictions, results and summaries are written
    pub output_dir: PathBuf,

    /// Only process the first N questions
    pub max_questions: Option<usize>,

    /// Directory prefix stripped from image references before lookup
    pub document_prefix: String,

    /// Evidence vector length when a question carries no ground-truth evidence
    pub default_evidence_length: usize,

    /// Log progress every N questions
    pub progress_interval: usize,

    /// Questions in flight at once; results keep dataset order
    pub concurrency: usize,

    /// Also extract text for evidence scoring when the parser answers questions directly
    pub evidence_from_text: bool,

    /// Upper bound for a single question (lookup, parsing and answering)
    pub question_timeout: Duration,

    /// Per-pair similarity below this counts as zero in ANLS
    pub anls_threshold: f64,
}

impl Default for DocVqaConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("data/docvqa/val_v1.0.json"),
            documents_dir: PathBuf::from("data/docvqa"),
            output_dir: PathBuf::from("results/docvqa"),
            max_questions: None,
            document_prefix: "documents/".to_string(),
            default_evidence_length: 10,
            progress_interval: 10,
            concurrency: 1,
            evidence_from_text: true,
            question_timeout: Duration::from_secs(300),
            anls_threshold: 0.5,
        }
    }
}

impl DocVqaConfig {
    /// Fails with [`Error::Config`](crate::Error::Config) naming the first bad field
    pub fn validate(&self) -> crate::Result<()> {
        require_nonzero("max_questions", self.max_questions == Some(0))?;
        require_nonzero("default_evidence_length", self.default_evidence_length == 0)?;
        require_nonzero("progress_interval", self.progress_interval == 0)?;
        require_nonzero("concurrency", self.concurrency == 0)?;
        require_nonzero("question_timeout", self.question_timeout.is_zero())?;

        if !(0.0..=1.0).contains(&self.anls_threshold) {
            return Err(crate::Error::Config(format!(
                "anls_threshold must lie in [0, 1], got {}",
                self.anls_threshold
            )));
        }
        Ok(())
    }
}
