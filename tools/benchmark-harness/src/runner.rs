//! Benchmark runner for fixture-driven performance and accuracy runs
//!
//! This module pairs every loaded fixture with every parser that supports its
//! file type and hands each pair to the relevant benchmarker.

use crate::accuracy::AccuracyBenchmarker;
use crate::config::BenchmarkConfig;
use crate::fixture::FixtureManager;
use crate::performance::PerformanceBenchmarker;
use crate::types::{AccuracyResult, BenchmarkResult};
use crate::{Error, Result};
use doccraft::DocumentParser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Orchestrates benchmark execution across fixtures and parsers
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
    parsers: Vec<Arc<dyn DocumentParser>>,
    fixtures: FixtureManager,
}

impl BenchmarkRunner {
    pub fn new(config: BenchmarkConfig, parsers: Vec<Arc<dyn DocumentParser>>) -> Self {
        Self {
            config,
            parsers,
            fixtures: FixtureManager::new(),
        }
    }

    /// Load fixtures from a directory or file
    pub fn load_fixtures(&mut self, path: &Path) -> Result<()> {
        self.fixtures.load(path)
    }

    pub fn fixtures_mut(&mut self) -> &mut FixtureManager {
        &mut self.fixtures
    }

    pub fn fixture_count(&self) -> usize {
        self.fixtures.len()
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// (document, reference, parser) triples in fixture order
    fn tasks(&self) -> Result<Vec<(PathBuf, Option<PathBuf>, Arc<dyn DocumentParser>)>> {
        if self.parsers.is_empty() {
            return Err(Error::Benchmark("No parsers available for benchmarking".to_string()));
        }

        let mut tasks = Vec::new();
        for (fixture_path, fixture) in self.fixtures.fixtures() {
            for parser in &self.parsers {
                if !parser.supports_format(&fixture.file_type) || !fixture.targets(parser.name()) {
                    continue;
                }
                if !parser.is_available() {
                    warn!("Skipping {}: parser is not available", parser.name());
                    continue;
                }
                tasks.push((
                    fixture.document_path(fixture_path),
                    fixture.ground_truth_path(fixture_path),
                    Arc::clone(parser),
                ));
            }
        }
        Ok(tasks)
    }

    /// Time every (fixture, parser) pair
    pub async fn run_performance(&self) -> Result<Vec<BenchmarkResult>> {
        let tasks = self.tasks()?;
        let benchmarker = PerformanceBenchmarker::new(self.config.clone());
        let mut results = Vec::with_capacity(tasks.len());

        for (index, (document, _, parser)) in tasks.iter().enumerate() {
            match benchmarker.benchmark_file(parser.as_ref(), document).await {
                Ok(result) => results.push(result),
                Err(e) => warn!("Benchmark task failed for {}: {}", parser.name(), e),
            }
            info!("Performance: {}/{} tasks complete", index + 1, tasks.len());
        }

        Ok(results)
    }

    /// Score every (fixture with ground truth, parser) pair
    pub async fn run_accuracy(&self) -> Result<Vec<AccuracyResult>> {
        let tasks = self.tasks()?;
        let benchmarker = AccuracyBenchmarker::new(self.config.timeout);
        let mut results = Vec::new();

        for (document, reference, parser) in &tasks {
            let Some(reference) = reference else {
                continue;
            };
            match benchmarker.evaluate_file(parser.as_ref(), document, reference).await {
                Ok(result) => results.push(result),
                Err(e) => warn!("Accuracy task failed for {}: {}", parser.name(), e),
            }
        }

        info!("Accuracy: {} results", results.len());
        Ok(results)
    }
}
