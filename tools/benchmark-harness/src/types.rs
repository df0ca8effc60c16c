//! Result types for performance and accuracy runs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Resource usage measured while an extraction ran
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Peak resident memory of the harness process
    pub peak_memory_bytes: u64,

    /// Median resident memory across samples
    pub p50_memory_bytes: u64,

    /// 95th percentile resident memory across samples
    pub p95_memory_bytes: u64,

    /// Mean CPU usage across samples (100.0 = one core)
    pub avg_cpu_percent: f64,

    /// Input bytes processed per second
    pub throughput_bytes_per_sec: f64,
}

/// One measured (non-warmup) iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    /// 1-based iteration number
    pub iteration: usize,
    pub duration: Duration,
    pub metrics: PerformanceMetrics,
}

/// Duration statistics across iterations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationStatistics {
    pub mean: Duration,
    pub median: Duration,
    pub std_dev_ms: f64,
    pub min: Duration,
    pub max: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub sample_count: usize,
}

/// Performance result for one parser on one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub parser: String,
    pub file_path: PathBuf,
    pub file_size: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Mean duration across measured iterations
    pub duration: Duration,

    /// Metrics averaged across iterations (peak memory is the maximum)
    pub metrics: PerformanceMetrics,

    #[serde(default)]
    pub iterations: Vec<IterationResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<DurationStatistics>,
}

/// Text accuracy of an extraction against a reference transcription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    /// `1 - levenshtein / max_len` over characters
    pub character_accuracy: f64,

    /// `1 - levenshtein / max_len` over whitespace-separated words
    pub word_accuracy: f64,

    /// Bigram (Sørensen-Dice) similarity of the two texts
    pub similarity: f64,

    /// Bag-of-words precision
    pub precision: f64,

    /// Bag-of-words recall
    pub recall: f64,

    pub f1: f64,
}

/// Accuracy result for one parser on one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyResult {
    pub parser: String,
    pub file_path: PathBuf,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<AccuracyMetrics>,
    pub extracted_chars: usize,
    pub reference_chars: usize,
    pub extraction_time: Duration,
}
