//! Process resource sampling
//!
//! [`ResourceMonitor`] polls the harness's own process with sysinfo on a
//! background task while an extraction runs. Parsers that shell out (tesseract)
//! are only partially visible here, since child processes are not included.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tokio::task::JoinHandle;
use tracing::debug;

/// A single memory/CPU observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    /// Resident memory in bytes
    pub memory_bytes: u64,
    /// CPU usage since the previous refresh (100.0 = one core)
    pub cpu_percent: f64,
    /// Milliseconds since monitoring started
    pub timestamp_ms: u64,
}

/// Summary of a sample series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceStats {
    pub peak_memory_bytes: u64,
    pub p50_memory_bytes: u64,
    pub p95_memory_bytes: u64,
    pub avg_cpu_percent: f64,
    pub sample_count: usize,
}

/// Background sampler for the current process
pub struct ResourceMonitor {
    samples: Arc<Mutex<Vec<ResourceSample>>>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ResourceMonitor {
    pub fn new() -> Self {
        Self {
            samples: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Start sampling every `interval` until [`stop`](Self::stop) is called
    pub async fn start(&self, interval: Duration) {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => pid,
            Err(e) => {
                debug!("Resource monitoring unavailable: {}", e);
                return;
            }
        };

        self.samples.lock().clear();
        self.running.store(true, Ordering::SeqCst);

        let samples = Arc::clone(&self.samples);
        let running = Arc::clone(&self.running);
        let handle = tokio::spawn(async move {
            let mut system = System::new();
            let started = Instant::now();
            while running.load(Ordering::SeqCst) {
                if let Some(sample) = take_sample(&mut system, pid, started) {
                    samples.lock().push(sample);
                }
                tokio::time::sleep(interval).await;
            }
        });

        *self.handle.lock() = Some(handle);
    }

    /// Stop sampling and return everything collected
    pub async fn stop(&self) -> Vec<ResourceSample> {
        self.running.store(false, Ordering::SeqCst);
        let handle = self.handle.lock().take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            debug!("Resource monitor task ended abnormally: {}", e);
        }
        std::mem::take(&mut *self.samples.lock())
    }

    /// Peak, median and p95 memory plus mean CPU
    pub fn calculate_stats(samples: &[ResourceSample]) -> ResourceStats {
        if samples.is_empty() {
            return ResourceStats::default();
        }

        let mut memory: Vec<u64> = samples.iter().map(|s| s.memory_bytes).collect();
        memory.sort_unstable();

        let percentile = |p: f64| memory[((memory.len() as f64 - 1.0) * p) as usize];

        ResourceStats {
            peak_memory_bytes: memory[memory.len() - 1],
            p50_memory_bytes: percentile(0.50),
            p95_memory_bytes: percentile(0.95),
            avg_cpu_percent: samples.iter().map(|s| s.cpu_percent).sum::<f64>() / samples.len() as f64,
            sample_count: samples.len(),
        }
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn take_sample(system: &mut System, pid: Pid, started: Instant) -> Option<ResourceSample> {
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing().with_memory().with_cpu(),
    );
    let process = system.process(pid)?;
    Some(ResourceSample {
        memory_bytes: process.memory(),
        cpu_percent: f64::from(process.cpu_usage()),
        timestamp_ms: started.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(memory_bytes: u64, cpu_percent: f64) -> ResourceSample {
        ResourceSample {
            memory_bytes,
            cpu_percent,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn test_calculate_stats_empty() {
        assert_eq!(ResourceMonitor::calculate_stats(&[]), ResourceStats::default());
    }

    #[test]
    fn test_calculate_stats() {
        let samples: Vec<_> = (1..=10).map(|i| sample(i * 100, i as f64)).collect();
        let stats = ResourceMonitor::calculate_stats(&samples);
        assert_eq!(stats.peak_memory_bytes, 1000);
        assert_eq!(stats.p50_memory_bytes, 500);
        assert_eq!(stats.p95_memory_bytes, 900);
        assert!((stats.avg_cpu_percent - 5.5).abs() < 1e-9);
        assert_eq!(stats.sample_count, 10);
    }

    #[tokio::test]
    async fn test_monitor_collects_samples() {
        let monitor = ResourceMonitor::new();
        monitor.start(Duration::from_millis(5)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        let samples = monitor.stop().await;

        assert!(!samples.is_empty());
        assert!(samples.iter().all(|s| s.memory_bytes > 0));
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let monitor = ResourceMonitor::new();
        assert!(monitor.stop().await.is_empty());
    }
}
