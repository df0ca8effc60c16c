//! Benchmark harness for document parsers
//!
//! This crate measures doccraft parsers for performance (latency, memory,
//! throughput) and text accuracy against fixture ground truth, and runs the
//! DocVQA question answering benchmark end to end.

pub mod accuracy;
pub mod config;
pub mod docvqa;
pub mod error;
pub mod fixture;
pub mod html;
pub mod monitoring;
pub mod output;
pub mod performance;
pub mod runner;
pub mod types;

pub use accuracy::AccuracyBenchmarker;
pub use config::{BenchmarkConfig, BenchmarkKind, DocVqaConfig};
pub use docvqa::DocVqaBenchmark;
pub use error::{Error, Result};
pub use fixture::{Fixture, FixtureManager};
pub use html::write_html;
pub use monitoring::{ResourceMonitor, ResourceSample, ResourceStats};
pub use output::{write_csv, write_json};
pub use performance::PerformanceBenchmarker;
pub use runner::BenchmarkRunner;
pub use types::{AccuracyMetrics, AccuracyResult, BenchmarkResult, PerformanceMetrics};
