//! Concurrent aggregation of extracted documents into one report.

mod cancel;
mod coordinator;
mod merge;
mod progress;

pub use cancel::CancellationToken;
pub use coordinator::{Coordinator, default_workers};
pub use merge::merge_outcomes;
pub use progress::{NoProgress, ProgressSink};
