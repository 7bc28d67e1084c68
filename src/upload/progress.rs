//! Upload progress accounting
//!
//! Progress is purely observational: the tracker never influences what gets
//! sent, it only turns byte counts into display percentages.

use std::sync::{Arc, Mutex};
use tracing::info;

/// Percentage of a file set transferred so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadProgress {
    pub uploaded: u64,
    pub total: u64,
    /// `uploaded / total * 100`, clamped to `[0, 100]` and rounded to 2 decimals.
    pub percent: f64,
}

impl UploadProgress {
    pub fn is_complete(&self) -> bool {
        self.percent >= 100.0
    }
}

/// Callback invoked for each progress report.
pub type ProgressSink = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Sink that logs progress through tracing.
pub fn log_progress() -> ProgressSink {
    Arc::new(|p: UploadProgress| {
        info!(
            uploaded = p.uploaded,
            total = p.total,
            "Uploading... {:.2}% complete",
            p.percent
        );
    })
}

/// Accumulates transferred bytes against a known total.
///
/// Reports are monotonic and the 100% report is emitted exactly once, when
/// every byte has been recorded. Until then the displayed value stays at or
/// below 99.99 even if rounding would reach 100. Bytes recorded after
/// completion are absorbed silently.
#[derive(Debug)]
pub struct ProgressTracker {
    total: u64,
    uploaded: u64,
    last_percent: f64,
    completed: bool,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            uploaded: 0,
            last_percent: 0.0,
            completed: false,
        }
    }

    pub fn uploaded(&self) -> u64 {
        self.uploaded
    }

    /// Record a stored chunk and return the report to emit, if any.
    pub fn record(&mut self, chunk_len: u64) -> Option<UploadProgress> {
        if self.completed {
            return None;
        }
        self.uploaded = self.uploaded.saturating_add(chunk_len);
        self.completed = self.uploaded >= self.total;

        let mut percent = percent(self.uploaded, self.total);
        if !self.completed {
            percent = percent.min(LAST_PARTIAL_PERCENT);
        }
        let percent = percent.max(self.last_percent);
        self.last_percent = percent;

        Some(UploadProgress {
            uploaded: self.uploaded.min(self.total),
            total: self.total,
            percent,
        })
    }
}

/// Highest value shown while bytes are still outstanding
const LAST_PARTIAL_PERCENT: f64 = 99.99;

fn percent(uploaded: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let raw = uploaded as f64 / total as f64 * 100.0;
    (raw.clamp(0.0, 100.0) * 100.0).round() / 100.0
}

/// Tracker shared between the request body stream and the caller.
#[derive(Clone)]
pub(crate) struct SharedProgress {
    tracker: Arc<Mutex<ProgressTracker>>,
    sink: ProgressSink,
}

impl SharedProgress {
    pub(crate) fn new(total: u64, sink: ProgressSink) -> Self {
        Self {
            tracker: Arc::new(Mutex::new(ProgressTracker::new(total))),
            sink,
        }
    }

    pub(crate) fn record(&self, chunk_len: u64) {
        let report = match self.tracker.lock() {
            Ok(mut tracker) => tracker.record(chunk_len),
            Err(poisoned) => poisoned.into_inner().record(chunk_len),
        };
        if let Some(report) = report {
            (self.sink)(report);
        }
    }

    /// Emit the completion report if the body finished without one, which
    /// happens when every file is empty.
    pub(crate) fn finish(&self) {
        self.record(0);
    }
}
