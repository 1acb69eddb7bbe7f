//! Progress notifications for batch runs.

/// Receives `(completed, total)` after each document completes.
///
/// Called from the collecting thread only, never from workers.
pub trait ProgressSink {
    fn on_progress(&self, completed: usize, total: usize);
}

impl<F: Fn(usize, usize)> ProgressSink for F {
    fn on_progress(&self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Sink that ignores all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _completed: usize, _total: usize) {}
}
