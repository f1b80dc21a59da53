//! Batch execution policies

use std::fmt::Display;
use std::future::Future;

use futures::future::join_all;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::outcome::{BatchResult, Outcome};

/// Progress snapshot emitted after each item of a sequential batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// Items finished so far (success or failure)
    pub completed: usize,
    pub total: usize,
    /// `round(completed / total * 100)`
    pub percent: u8,
}

impl BatchProgress {
    /// Snapshot after the item at `index` (0-based) finished
    pub fn after(index: usize, total: usize) -> Self {
        let completed = index + 1;
        let percent = if total == 0 {
            100
        } else {
            // round half up, matching the UI's rounding
            ((completed * 200 + total) / (2 * total)).min(100) as u8
        };
        Self { completed, total, percent }
    }
}

/// Run every item concurrently and wait for all of them to settle.
///
/// A failing item never cancels or blocks the others. The returned
/// per-item entries follow input order regardless of completion order.
pub async fn settle_all<I, T, E, F, Fut>(items: Vec<I>, op: F) -> BatchResult<I, T, E>
where
    F: Fn(&I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let total = items.len();
    debug!(total, "Settling batch concurrently");

    let settled = join_all(items.iter().map(&op)).await;

    let per_item: Vec<(I, Outcome<T, E>)> =
        items.into_iter().zip(settled.into_iter().map(Outcome::from)).collect();

    for (index, (_, outcome)) in per_item.iter().enumerate() {
        if let Outcome::Failure(err) = outcome {
            debug!(index, error = %err, "Batch item failed");
        }
    }

    let result = BatchResult::from_outcomes(per_item);
    log_summary(&result);
    result
}

/// Run items one at a time in input order.
///
/// After each item (success or failure) a [`BatchProgress`] is sent on
/// `progress`. A dropped receiver stops progress delivery but not the batch.
pub async fn run_sequential<I, T, E, F, Fut>(
    items: Vec<I>,
    mut op: F,
    progress: Option<UnboundedSender<BatchProgress>>,
) -> BatchResult<I, T, E>
where
    F: FnMut(usize, &I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let total = items.len();
    debug!(total, "Running batch sequentially");

    let mut outcomes = Vec::with_capacity(total);
    for (index, item) in items.iter().enumerate() {
        let outcome = Outcome::from(op(index, item).await);
        if let Outcome::Failure(err) = &outcome {
            warn!(index, error = %err, "Batch item failed, continuing with next item");
        }
        outcomes.push(outcome);

        if let Some(tx) = &progress {
            if tx.send(BatchProgress::after(index, total)).is_err() {
                debug!(index, "Progress receiver dropped");
            }
        }
    }

    let result = BatchResult::from_outcomes(items.into_iter().zip(outcomes).collect());
    log_summary(&result);
    result
}

fn log_summary<I, T, E>(result: &BatchResult<I, T, E>) {
    if result.failed() > 0 {
        warn!(
            successful = result.successful(),
            failed = result.failed(),
            total = result.total(),
            "Batch completed with errors"
        );
    } else {
        info!(successful = result.successful(), "Batch completed");
    }
}
