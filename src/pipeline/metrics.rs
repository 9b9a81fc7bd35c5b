// src/pipeline/metrics.rs
//
// Batch counters shared by the clip workers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub clips_processed: Arc<AtomicU64>,
    pub clips_failed: Arc<AtomicU64>,
    pub clips_cached: Arc<AtomicU64>,
    pub total_frames: Arc<AtomicU64>,
    pub segments: Arc<AtomicU64>,
    pub restored_frames: Arc<AtomicU64>,
    pub blocked_runs: Arc<AtomicU64>,
    pub anomalies: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            clips_processed: Arc::new(AtomicU64::new(0)),
            clips_failed: Arc::new(AtomicU64::new(0)),
            clips_cached: Arc::new(AtomicU64::new(0)),
            total_frames: Arc::new(AtomicU64::new(0)),
            segments: Arc::new(AtomicU64::new(0)),
            restored_frames: Arc::new(AtomicU64::new(0)),
            blocked_runs: Arc::new(AtomicU64::new(0)),
            anomalies: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, amount: usize) {
        counter.fetch_add(amount as u64, Ordering::Relaxed);
    }

    pub fn frames_per_sec(&self) -> f64 {
        let frames = self.total_frames.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            clips_processed: self.clips_processed.load(Ordering::Relaxed),
            clips_failed: self.clips_failed.load(Ordering::Relaxed),
            clips_cached: self.clips_cached.load(Ordering::Relaxed),
            total_frames: self.total_frames.load(Ordering::Relaxed),
            segments: self.segments.load(Ordering::Relaxed),
            restored_frames: self.restored_frames.load(Ordering::Relaxed),
            blocked_runs: self.blocked_runs.load(Ordering::Relaxed),
            anomalies: self.anomalies.load(Ordering::Relaxed),
            frames_per_sec: self.frames_per_sec(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub clips_processed: u64,
    pub clips_failed: u64,
    pub clips_cached: u64,
    pub total_frames: u64,
    pub segments: u64,
    pub restored_frames: u64,
    pub blocked_runs: u64,
    pub anomalies: u64,
    pub frames_per_sec: f64,
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_shared_across_clones() {
        let metrics = PipelineMetrics::new();
        let worker = metrics.clone();

        worker.inc(&worker.clips_processed);
        worker.add(&worker.total_frames, 120);
        metrics.add(&metrics.total_frames, 30);

        let summary = metrics.summary();
        assert_eq!(summary.clips_processed, 1);
        assert_eq!(summary.total_frames, 150);
        assert_eq!(summary.clips_failed, 0);
    }
}
