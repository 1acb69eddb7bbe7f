//! Parallel extraction over a fixed pool of worker threads.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread;

use tracing::{debug, info, trace, warn};

use super::cancel::CancellationToken;
use super::merge::merge_outcomes;
use super::progress::ProgressSink;
use crate::document::DocumentExtractor;
use crate::error::{ReportError, Result};
use crate::models::document::ExtractionOutcome;
use crate::models::report::Aggregation;

/// Number of workers used when none is configured.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Runs an extractor over many documents and merges the outcomes.
///
/// Workers claim documents by index from a shared cursor and send each
/// outcome back tagged with that index. The calling thread is the only
/// owner of the result slots, so the merged report is identical for any
/// pool size and any completion order.
pub struct Coordinator<E> {
    extractor: E,
    workers: usize,
    cancel: Option<CancellationToken>,
}

impl<E: DocumentExtractor> Coordinator<E> {
    pub fn new(extractor: E) -> Self {
        Self {
            extractor,
            workers: 0,
            cancel: None,
        }
    }

    /// Set the pool size. `0` means [`default_workers`].
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Stop claiming new documents once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn pool_size(&self, documents: usize) -> usize {
        let configured = if self.workers == 0 {
            default_workers()
        } else {
            self.workers
        };
        configured.min(documents).max(1)
    }

    /// Extract every document and merge the outcomes in submission order.
    ///
    /// `progress` is called on the calling thread after each completion.
    /// Per-document failures end up in the aggregation; only pool failures
    /// and cancellation are returned as errors.
    pub fn run(&self, documents: &[PathBuf], progress: &dyn ProgressSink) -> Result<Aggregation> {
        let total = documents.len();
        if total == 0 {
            info!("No documents submitted");
            return Ok(Aggregation::Empty {
                submitted: 0,
                failures: Vec::new(),
            });
        }

        let workers = self.pool_size(total);
        info!(documents = total, workers, "Starting extraction");

        let cursor = AtomicUsize::new(0);
        let mut slots: Vec<Option<ExtractionOutcome>> = (0..total).map(|_| None).collect();
        let (results, received) = mpsc::channel();

        let completed = thread::scope(|scope| -> Result<usize> {
            let mut handles = Vec::with_capacity(workers);
            let mut spawn_error = None;

            for id in 0..workers {
                let results = results.clone();
                let cursor = &cursor;
                let extractor = &self.extractor;
                let cancel = self.cancel.as_ref();
                let spawned = thread::Builder::new()
                    .name(format!("nfe-worker-{}", id))
                    .spawn_scoped(scope, move || {
                        work(id, extractor, documents, cursor, cancel, results)
                    });
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        // Park the cursor at the end so running workers stop.
                        cursor.store(total, Ordering::SeqCst);
                        spawn_error = Some(e);
                        break;
                    }
                }
            }
            drop(results);

            let mut completed = 0;
            for (index, outcome) in received {
                slots[index] = Some(outcome);
                completed += 1;
                progress.on_progress(completed, total);
            }

            let panicked = handles
                .into_iter()
                .map(|handle| handle.join())
                .filter(|joined| joined.is_err())
                .count();

            if let Some(e) = spawn_error {
                return Err(ReportError::WorkerPool(format!(
                    "failed to spawn worker: {}",
                    e
                )));
            }
            if panicked > 0 {
                return Err(ReportError::WorkerPool(format!(
                    "{} worker(s) panicked",
                    panicked
                )));
            }
            Ok(completed)
        })?;

        if completed < total {
            if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                warn!(completed, total, "Extraction cancelled");
                return Err(ReportError::Cancelled { completed, total });
            }
            return Err(ReportError::WorkerPool(format!(
                "workers stopped after {} of {} documents",
                completed, total
            )));
        }

        let outcomes = slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ReportError::WorkerPool("missing document outcome".to_string()))?;

        let aggregation = merge_outcomes(outcomes)?;
        info!(
            documents = total,
            failed = aggregation.failures().len(),
            empty = aggregation.is_empty(),
            "Extraction complete"
        );
        Ok(aggregation)
    }
}

fn work<E: DocumentExtractor>(
    worker: usize,
    extractor: &E,
    documents: &[PathBuf],
    cursor: &AtomicUsize,
    cancel: Option<&CancellationToken>,
    results: Sender<(usize, ExtractionOutcome)>,
) {
    loop {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            debug!(worker, "Cancellation observed, stopping");
            break;
        }

        let index = cursor.fetch_add(1, Ordering::SeqCst);
        let Some(path) = documents.get(index) else {
            break;
        };

        trace!(worker, index, path = %path.display(), "Extracting document");
        let outcome = extractor.extract(path);
        if results.send((index, outcome)).is_err() {
            break;
        }
    }
}
