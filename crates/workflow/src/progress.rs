//! Progress reporting with an invoke-and-swallow contract.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use litscout_core::progress::ProgressSink;
use tracing::{debug, warn};

/// Wraps an optional [`ProgressSink`].
///
/// Sink failures are logged and never reach the caller. In-pass reports are
/// clamped to 99 so that the single terminal `100` comes from [`finish`].
///
/// [`finish`]: ProgressReporter::finish
pub struct ProgressReporter {
    sink: Option<Arc<dyn ProgressSink>>,
    finished: AtomicBool,
}

impl ProgressReporter {
    pub fn new(sink: Option<Arc<dyn ProgressSink>>) -> Self {
        Self {
            sink,
            finished: AtomicBool::new(false),
        }
    }

    pub fn silent() -> Self {
        Self::new(None)
    }

    pub async fn report(&self, progress: u8, step: &str) {
        if self.finished.load(Ordering::Acquire) {
            return;
        }
        self.send(progress.min(99), step).await;
    }

    /// Report the terminal `100`. Later calls are ignored.
    pub async fn finish(&self, step: &str) {
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        self.send(100, step).await;
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    async fn send(&self, progress: u8, step: &str) {
        let Some(sink) = &self.sink else {
            return;
        };
        debug!(progress, step, "Progress");
        if let Err(e) = sink.report(progress, step).await {
            warn!(progress, step, error = %e, "Progress sink failed");
        }
    }
}

/// Linear sub-progress between two step weights after `done` of `total`
/// items.
pub fn interpolate(from: u8, to: u8, done: usize, total: usize) -> u8 {
    if total == 0 || to <= from {
        return from;
    }
    let span = (to - from) as usize;
    let step = span * done.min(total) / total;
    from + step as u8
}
