// src/session/metrics.rs
//
// Counters and timings for the live loop. Cloning shares the same
// counters, so the Ctrl-C task and the loop see one set of numbers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct SessionMetrics {
    pub frames_processed: Arc<AtomicU64>,
    pub frames_dropped: Arc<AtomicU64>,
    pub incomplete_skeletons: Arc<AtomicU64>,
    pub undefined_geometry: Arc<AtomicU64>,
    pub unknown_poses: Arc<AtomicU64>,
    pub no_guidance: Arc<AtomicU64>,
    pub correct_frames: Arc<AtomicU64>,
    pub capture_timeouts: Arc<AtomicU64>,
    pub display_failures: Arc<AtomicU64>,
    pub budget_overruns: Arc<AtomicU64>,
    pub last_processing_us: Arc<AtomicU64>,
    pub total_processing_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            frames_processed: Arc::new(AtomicU64::new(0)),
            frames_dropped: Arc::new(AtomicU64::new(0)),
            incomplete_skeletons: Arc::new(AtomicU64::new(0)),
            undefined_geometry: Arc::new(AtomicU64::new(0)),
            unknown_poses: Arc::new(AtomicU64::new(0)),
            no_guidance: Arc::new(AtomicU64::new(0)),
            correct_frames: Arc::new(AtomicU64::new(0)),
            capture_timeouts: Arc::new(AtomicU64::new(0)),
            display_failures: Arc::new(AtomicU64::new(0)),
            budget_overruns: Arc::new(AtomicU64::new(0)),
            last_processing_us: Arc::new(AtomicU64::new(0)),
            total_processing_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn record_processing(&self, duration_us: u64) {
        self.last_processing_us.store(duration_us, Ordering::Relaxed);
        self.total_processing_us
            .fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.frames_processed.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let frames = self.frames_processed.load(Ordering::Relaxed);
        let total_us = self.total_processing_us.load(Ordering::Relaxed);
        MetricsSummary {
            frames_processed: frames,
            fps: self.fps(),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            incomplete_skeletons: self.incomplete_skeletons.load(Ordering::Relaxed),
            undefined_geometry: self.undefined_geometry.load(Ordering::Relaxed),
            unknown_poses: self.unknown_poses.load(Ordering::Relaxed),
            no_guidance: self.no_guidance.load(Ordering::Relaxed),
            correct_frames: self.correct_frames.load(Ordering::Relaxed),
            capture_timeouts: self.capture_timeouts.load(Ordering::Relaxed),
            display_failures: self.display_failures.load(Ordering::Relaxed),
            budget_overruns: self.budget_overruns.load(Ordering::Relaxed),
            last_processing_us: self.last_processing_us.load(Ordering::Relaxed),
            avg_processing_us: if frames > 0 { total_us / frames } else { 0 },
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub frames_processed: u64,
    pub fps: f64,
    pub frames_dropped: u64,
    pub incomplete_skeletons: u64,
    pub undefined_geometry: u64,
    pub unknown_poses: u64,
    pub no_guidance: u64,
    pub correct_frames: u64,
    pub capture_timeouts: u64,
    pub display_failures: u64,
    pub budget_overruns: u64,
    pub last_processing_us: u64,
    pub avg_processing_us: u64,
    pub elapsed_secs: f64,
}
