use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, mpsc};
use tracing::{Instrument, debug, debug_span, info_span, warn};

use super::SnapshotJob;
use crate::compare::ComparisonResult;
use crate::engine::Engine;
use crate::error::DiffError;

/// Per-snapshot outcome, streamed in completion order.
pub type BatchOutcome = Result<ComparisonResult, DiffError>;

/// Compare a pre-built list of jobs with at most `parallel` in flight.
///
/// Individual failures are reported per-snapshot rather than aborting the run.
/// Returns a `Receiver` immediately; results stream in as comparisons complete.
pub fn compare_all(
    engine: Engine,
    jobs: Vec<SnapshotJob>,
    parallel: usize,
) -> mpsc::Receiver<(SnapshotJob, BatchOutcome)> {
    let job_count = jobs.len();
    let worker_count = job_count.min(parallel.max(1));
    debug!(jobs = job_count, workers = worker_count, parallel, "starting comparison run");

    let (tx, rx) = mpsc::channel(parallel.max(1) * 2);
    if jobs.is_empty() {
        return rx;
    }

    // Popped from the back; reverse so jobs start in submission order.
    let queue = Arc::new(Mutex::new(jobs.into_iter().rev().collect::<Vec<_>>()));

    let mut set = tokio::task::JoinSet::new();
    for idx in 0..worker_count {
        let queue = queue.clone();
        let tx = tx.clone();
        let engine = engine.clone();
        let span = info_span!("worker", id = idx);
        set.spawn(
            async move {
                debug!("started");
                loop {
                    let (job, remaining) = {
                        let mut q = queue.lock().await;
                        match q.pop() {
                            Some(j) => {
                                let remaining = q.len();
                                (j, remaining)
                            }
                            None => {
                                debug!("queue empty, exiting");
                                break;
                            }
                        }
                    };
                    debug!(job = %job.id, remaining, "picked job");

                    let t0 = Instant::now();
                    let span = debug_span!("compare", job = %job.id);
                    let outcome = engine.compare(job.request.clone()).instrument(span).await;
                    match &outcome {
                        Ok(result) => debug!(
                            diff_percentage = result.diff_percentage,
                            elapsed_ms = t0.elapsed().as_millis() as u64,
                            "compared ok"
                        ),
                        Err(e) => warn!(job = %job.id, error = %e, "comparison failed"),
                    }

                    if tx.send((job, outcome)).await.is_err() {
                        warn!("channel send failed (receiver dropped), stopping");
                        break;
                    }
                }
                debug!("exiting");
            }
            .instrument(span),
        );
    }

    // Channel closes once every worker has dropped its sender.
    drop(tx);

    tokio::spawn(async move {
        while let Some(result) = set.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "worker task panicked");
            }
        }
        debug!("all workers done");
    });

    rx
}
