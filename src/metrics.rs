use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct RunMetrics {
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    questions_answered: AtomicU64,
}

impl RunMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pipeline run that reached the terminal `complete` state.
    pub fn record_completed_run(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a pipeline run that ended in the `failed` state.
    pub fn record_failed_run(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one answered Q&A request.
    pub fn record_answered_question(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of runs that completed successfully since startup.
    pub runs_completed: u64,
    /// Number of runs that ended in failure since startup.
    pub runs_failed: u64,
    /// Number of Q&A requests served since startup.
    pub questions_answered: u64,
}
