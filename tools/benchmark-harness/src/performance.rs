//! Extraction timing with resource monitoring
//!
//! Each measurement runs `warmup_iterations` discarded extractions followed by
//! `benchmark_iterations` timed ones, sampling memory and CPU while each runs.

use crate::config::BenchmarkConfig;
use crate::monitoring::ResourceMonitor;
use crate::types::{BenchmarkResult, DurationStatistics, IterationResult, PerformanceMetrics};
use crate::{Error, Result};
use doccraft::DocumentParser;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Nearest-rank percentile (rounding down) of an ascending slice
fn percentile_of_sorted(sorted: &[Duration], percentile: f64) -> Duration {
    let Some(last) = sorted.len().checked_sub(1) else {
        return Duration::ZERO;
    };
    let rank = (last as f64 * percentile.clamp(0.0, 1.0)).floor() as usize;
    sorted[rank.min(last)]
}

/// Mean, spread and tail latencies of the measured iterations
pub fn calculate_statistics(iterations: &[IterationResult]) -> DurationStatistics {
    let mut sorted: Vec<Duration> = iterations.iter().map(|i| i.duration).collect();
    sorted.sort_unstable();

    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return DurationStatistics::default();
    };

    let n = sorted.len() as f64;
    let millis: Vec<f64> = sorted.iter().map(|d| d.as_secs_f64() * 1e3).collect();
    let mean_ms = millis.iter().sum::<f64>() / n;
    let variance = millis.iter().map(|ms| (ms - mean_ms).powi(2)).sum::<f64>() / n;

    DurationStatistics {
        mean: Duration::from_secs_f64(mean_ms / 1e3),
        median: percentile_of_sorted(&sorted, 0.50),
        std_dev_ms: variance.sqrt(),
        min,
        max,
        p95: percentile_of_sorted(&sorted, 0.95),
        p99: percentile_of_sorted(&sorted, 0.99),
        sample_count: sorted.len(),
    }
}

/// Aggregate performance metrics from iterations (average, peak memory is the max)
pub fn aggregate_metrics(iterations: &[IterationResult]) -> PerformanceMetrics {
    if iterations.is_empty() {
        return PerformanceMetrics::default();
    }

    let count = iterations.len() as f64;
    let mean_u64 = |f: fn(&PerformanceMetrics) -> u64| {
        (iterations.iter().map(|i| f(&i.metrics)).sum::<u64>() as f64 / count) as u64
    };

    PerformanceMetrics {
        peak_memory_bytes: iterations
            .iter()
            .map(|i| i.metrics.peak_memory_bytes)
            .max()
            .unwrap_or(0),
        p50_memory_bytes: mean_u64(|m| m.p50_memory_bytes),
        p95_memory_bytes: mean_u64(|m| m.p95_memory_bytes),
        avg_cpu_percent: iterations.iter().map(|i| i.metrics.avg_cpu_percent).sum::<f64>() / count,
        throughput_bytes_per_sec: iterations
            .iter()
            .map(|i| i.metrics.throughput_bytes_per_sec)
            .sum::<f64>()
            / count,
    }
}

/// Times parsers on documents
pub struct PerformanceBenchmarker {
    config: BenchmarkConfig,
}

impl PerformanceBenchmarker {
    pub fn new(config: BenchmarkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// One timed extraction under the configured timeout
    async fn measure_once(&self, parser: &dyn DocumentParser, path: &Path, file_size: u64) -> Result<(Duration, PerformanceMetrics)> {
        let monitor = ResourceMonitor::new();
        monitor
            .start(Duration::from_millis(self.config.sample_interval_ms))
            .await;

        let start = Instant::now();
        let outcome = tokio::time::timeout(self.config.timeout, parser.extract_text(path)).await;
        let duration = start.elapsed();

        let samples = monitor.stop().await;
        let resource_stats = ResourceMonitor::calculate_stats(&samples);

        match outcome {
            Err(_) => return Err(Error::Timeout(format!("Extraction exceeded {:?}", self.config.timeout))),
            Ok(Err(e)) => {
                return Err(Error::ExtractionFailed {
                    parser: parser.name().to_string(),
                    file: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
            Ok(Ok(_)) => {}
        }

        let throughput = if duration.as_secs_f64() > 0.0 {
            file_size as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Ok((
            duration,
            PerformanceMetrics {
                peak_memory_bytes: resource_stats.peak_memory_bytes,
                p50_memory_bytes: resource_stats.p50_memory_bytes,
                p95_memory_bytes: resource_stats.p95_memory_bytes,
                avg_cpu_percent: resource_stats.avg_cpu_percent,
                throughput_bytes_per_sec: throughput,
            },
        ))
    }

    /// Benchmark one parser on one document
    ///
    /// Extraction failures produce an unsuccessful result rather than an error;
    /// only a missing document is an `Err`.
    pub async fn benchmark_file(&self, parser: &dyn DocumentParser, path: &Path) -> Result<BenchmarkResult> {
        let file_size = std::fs::metadata(path)
            .map_err(|_| Error::DocumentNotFound(path.to_path_buf()))?
            .len();

        let total_iterations = self.config.warmup_iterations + self.config.benchmark_iterations;
        let mut iterations = Vec::with_capacity(self.config.benchmark_iterations);

        for iteration in 0..total_iterations {
            match self.measure_once(parser, path, file_size).await {
                Ok((duration, metrics)) => {
                    if iteration >= self.config.warmup_iterations {
                        iterations.push(IterationResult {
                            iteration: iterations.len() + 1,
                            duration,
                            metrics,
                        });
                    }
                }
                Err(e) => {
                    warn!("{} failed on {}: {}", parser.name(), path.display(), e);
                    return Ok(BenchmarkResult {
                        parser: parser.name().to_string(),
                        file_path: path.to_path_buf(),
                        file_size,
                        success: false,
                        error_message: Some(e.to_string()),
                        duration: Duration::ZERO,
                        metrics: aggregate_metrics(&iterations),
                        iterations,
                        statistics: None,
                    });
                }
            }
        }

        let statistics = calculate_statistics(&iterations);
        debug!(
            "{} on {}: mean {:?} over {} iterations",
            parser.name(),
            path.display(),
            statistics.mean,
            statistics.sample_count
        );

        Ok(BenchmarkResult {
            parser: parser.name().to_string(),
            file_path: path.to_path_buf(),
            file_size,
            success: true,
            error_message: None,
            duration: statistics.mean,
            metrics: aggregate_metrics(&iterations),
            iterations,
            statistics: Some(statistics),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use doccraft::{DoccraftError, ExtractionMetadata, ExtractionResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn iteration(ms: u64) -> IterationResult {
        IterationResult {
            iteration: 1,
            duration: Duration::from_millis(ms),
            metrics: PerformanceMetrics {
                peak_memory_bytes: ms * 10,
                p50_memory_bytes: ms,
                p95_memory_bytes: ms * 2,
                avg_cpu_percent: ms as f64,
                throughput_bytes_per_sec: 100.0,
            },
        }
    }

    struct CountingParser {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl DocumentParser for CountingParser {
        fn name(&self) -> &str {
            "counting"
        }

        fn supported_formats(&self) -> &[&str] {
            &["txt"]
        }

        async fn extract_text(&self, _path: &Path) -> doccraft::Result<ExtractionResult> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(call) == self.fail_on {
                return Err(DoccraftError::parsing("broken page"));
            }
            Ok(ExtractionResult::new("hello".to_string(), ExtractionMetadata::default(), 0.0))
        }
    }

    #[test]
    fn test_percentile() {
        let values: Vec<Duration> = (1..=100).map(Duration::from_millis).collect();
        assert_eq!(percentile_of_sorted(&values, 0.5), Duration::from_millis(50));
        assert_eq!(percentile_of_sorted(&values, 0.99), Duration::from_millis(99));
        assert_eq!(percentile_of_sorted(&values, 1.0), Duration::from_millis(100));
        assert_eq!(percentile_of_sorted(&[], 0.5), Duration::ZERO);
    }

    #[test]
    fn test_calculate_statistics() {
        let stats = calculate_statistics(&[iteration(10), iteration(20), iteration(30)]);
        assert!((stats.mean.as_secs_f64() - 0.020).abs() < 1e-6);
        assert_eq!(stats.median, Duration::from_millis(20));
        assert_eq!(stats.min, Duration::from_millis(10));
        assert_eq!(stats.max, Duration::from_millis(30));
        assert!((stats.std_dev_ms - 8.164965).abs() < 1e-3);
        assert_eq!(stats.sample_count, 3);
    }

    #[test]
    fn test_calculate_statistics_empty() {
        let stats = calculate_statistics(&[]);
        assert_eq!(stats.sample_count, 0);
        assert_eq!(stats.mean, Duration::ZERO);
    }

    #[test]
    fn test_aggregate_metrics() {
        let metrics = aggregate_metrics(&[iteration(10), iteration(30)]);
        assert_eq!(metrics.peak_memory_bytes, 300);
        assert_eq!(metrics.p50_memory_bytes, 20);
        assert!((metrics.avg_cpu_percent - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_benchmark_file_discards_warmup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "hello").unwrap();

        let parser = CountingParser {
            calls: AtomicUsize::new(0),
            fail_on: None,
        };
        let config = BenchmarkConfig {
            warmup_iterations: 2,
            benchmark_iterations: 3,
            ..Default::default()
        };
        let result = PerformanceBenchmarker::new(config)
            .benchmark_file(&parser, &path)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(parser.calls.load(Ordering::SeqCst), 5);
        assert_eq!(result.iterations.len(), 3);
        assert_eq!(result.iterations[2].iteration, 3);
        assert_eq!(result.file_size, 5);
        assert_eq!(result.statistics.unwrap().sample_count, 3);
    }

    #[tokio::test]
    async fn test_benchmark_file_failure_is_recorded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "hello").unwrap();

        let parser = CountingParser {
            calls: AtomicUsize::new(0),
            fail_on: Some(1),
        };
        let config = BenchmarkConfig {
            warmup_iterations: 0,
            benchmark_iterations: 3,
            ..Default::default()
        };
        let result = PerformanceBenchmarker::new(config)
            .benchmark_file(&parser, &path)
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("broken page"));
        assert_eq!(result.iterations.len(), 1);
    }

    #[tokio::test]
    async fn test_benchmark_missing_file() {
        let parser = CountingParser {
            calls: AtomicUsize::new(0),
            fail_on: None,
        };
        let result = PerformanceBenchmarker::new(BenchmarkConfig::default())
            .benchmark_file(&parser, Path::new("/nonexistent/doc.txt"))
            .await;
        assert!(matches!(result, Err(Error::DocumentNotFound(_))));
    }
}
