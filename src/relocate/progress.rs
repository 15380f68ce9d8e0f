//! Transfer progress reporting.
//! The copy path hands the caller immutable `TransferProgress` snapshots
//! through a callback. Reports are throttled to a bounded cadence so a tree
//! of many small files cannot flood the sink; the final 100% report always
//! fires exactly once.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Minimum wall time between intermediate progress reports.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// One immutable progress observation. Percent and ETA are derived from the
/// counters and elapsed wall time, never set independently.
#[derive(Debug, Clone)]
pub struct TransferProgress {
    pub total_bytes: u64,
    pub processed_bytes: u64,
    /// Relative path of the most recently completed file, if any.
    pub current_file: Option<PathBuf>,
    pub elapsed: Duration,
    pub speed_mbps: f64,
    pub eta_seconds: Option<u64>,
}

impl TransferProgress {
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            100.0
        } else {
            self.processed_bytes as f64 / self.total_bytes as f64 * 100.0
        }
    }
}

/// Callback receiving progress snapshots. Must be fast and non-blocking; the
/// worker invokes it inline, and marshalling onto a UI thread is the caller's
/// concern.
pub type ProgressSink<'a> = &'a (dyn Fn(TransferProgress) + Send + Sync);

/// Accumulates byte counts during the copy path and decides when to report.
pub(crate) struct ProgressTracker<'a> {
    total: u64,
    processed: u64,
    started: Instant,
    last_report: Option<Instant>,
    sink: Option<ProgressSink<'a>>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(total: u64, sink: Option<ProgressSink<'a>>) -> Self {
        Self {
            total,
            processed: 0,
            started: Instant::now(),
            last_report: None,
            sink,
        }
    }

    /// Record a completed file. Reports at most once per `PROGRESS_INTERVAL`;
    /// the 100% report is left to `finish()` so it fires exactly once.
    pub(crate) fn file_done(&mut self, bytes: u64, file: &Path) {
        self.processed = self.processed.saturating_add(bytes);
        if self.processed >= self.total {
            return;
        }
        let due = match self.last_report {
            None => true,
            Some(at) => at.elapsed() >= PROGRESS_INTERVAL,
        };
        if due {
            self.report(Some(file));
        }
    }

    /// Emit the final report. Always fires, regardless of cadence.
    pub(crate) fn finish(&mut self) {
        self.report(None);
    }

    fn report(&mut self, file: Option<&Path>) {
        let Some(sink) = self.sink else {
            return;
        };
        let elapsed = self.started.elapsed();
        let secs = elapsed.as_secs_f64();
        let bytes_per_sec = if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        };
        let remaining = self.total.saturating_sub(self.processed);
        let eta_seconds = if bytes_per_sec > 0.0 && remaining > 0 {
            Some((remaining as f64 / bytes_per_sec).round() as u64)
        } else {
            None
        };
        sink(TransferProgress {
            total_bytes: self.total,
            processed_bytes: self.processed,
            current_file: file.map(Path::to_path_buf),
            elapsed,
            speed_mbps: bytes_per_sec / (1024.0 * 1024.0),
            eta_seconds,
        });
        self.last_report = Some(Instant::now());
    }
}
