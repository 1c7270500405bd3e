// Flag load metrics
//
// Lightweight counters for how feature flag loads behave over a session

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters for the feature flag lifecycle
///
/// Uses atomic operations so any clone of the provider can record without
/// taking the state lock. Logged on shutdown, or on demand from the CLI.
#[derive(Debug)]
pub struct FlagMetrics {
    /// Load attempts started
    pub attempts: AtomicU64,

    /// Attempts whose remote flags were merged
    pub applied: AtomicU64,

    /// Attempts that ended with an error message
    pub failed: AtomicU64,

    /// In-flight attempts cancelled because a newer one started
    pub superseded: AtomicU64,

    /// Completions ignored because their attempt was no longer active
    pub discarded: AtomicU64,

    /// Change events delivered to at least one subscriber
    pub broadcasts: AtomicU64,

    /// Change events sent while nobody was subscribed
    pub broadcasts_unheard: AtomicU64,

    start_time: Instant,
}

/// Plain copy of the counters at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub attempts: u64,
    pub applied: u64,
    pub failed: u64,
    pub superseded: u64,
    pub discarded: u64,
    pub broadcasts: u64,
    pub broadcasts_unheard: u64,
}

impl FlagMetrics {
    pub fn new() -> Self {
        Self {
            attempts: AtomicU64::new(0),
            applied: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            superseded: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            broadcasts_unheard: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_superseded(&self) {
        self.superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_broadcast(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_broadcast_unheard(&self) {
        self.broadcasts_unheard.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            broadcasts_unheard: self.broadcasts_unheard.load(Ordering::Relaxed),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Share of finished attempts that failed, 0.0 when none finished
    pub fn failure_rate(&self) -> f64 {
        let applied = self.applied.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let finished = applied + failed;
        if finished > 0 {
            failed as f64 / finished as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        tracing::info!("=== Feature Flag Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Attempts: {} started, {} applied, {} failed (failure rate {:.1}%)",
            snapshot.attempts,
            snapshot.applied,
            snapshot.failed,
            self.failure_rate() * 100.0
        );
        tracing::info!(
            "Superseded: {}, stale results discarded: {}",
            snapshot.superseded,
            snapshot.discarded
        );
        tracing::info!(
            "Change events: {} delivered, {} without subscribers",
            snapshot.broadcasts,
            snapshot.broadcasts_unheard
        );
    }
}

impl Default for FlagMetrics {
    fn default() -> Self {
        Self::new()
    }
}
