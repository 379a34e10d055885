//! Windowed batch scheduling over the record queue.
//!
//! Records run in fixed-size concurrent windows to keep generation-service
//! request rates civil. A failed record is quarantined into the run's failure
//! list and never blocks the rest of the batch; whatever happened, the
//! updated dataset is written back at the end of the run.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use listscribe_shared::{FailureRecord, OrganizationRecord, QueueItem, Result};

use crate::dataset::save_dataset;
use crate::processor::{self, Outcome, ProcessedRecord, ProcessorContext};

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callbacks for long-running batch runs.
///
/// The CLI implements this with a spinner; library callers and tests use
/// [`SilentProgress`].
pub trait ProgressReporter: Send + Sync {
    fn record_started(&self, _title: &str, _position: usize, _total: usize) {}
    fn record_finished(&self, _title: &str, _outcome: Outcome) {}
    fn record_failed(&self, _title: &str, _error: &str) {}
}

/// No-op reporter.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Aggregate results of one batch run.
#[derive(Debug)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub cached: usize,
    pub failures: Vec<FailureRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

// ---------------------------------------------------------------------------
// Batch run
// ---------------------------------------------------------------------------

/// Process every record in `records`, at most `window_size` concurrently,
/// then write the enriched dataset back to `dataset_path`.
///
/// Record failures (including worker panics) are captured per record; the
/// dataset write happens regardless so completed work is never lost. Only a
/// failed dataset write fails the run itself.
pub async fn run(
    ctx: Arc<ProcessorContext>,
    records: Vec<OrganizationRecord>,
    dataset_path: &Path,
    progress: Arc<dyn ProgressReporter>,
) -> Result<RunSummary> {
    let started_at = Utc::now();
    let total = records.len();
    let mut items: Vec<QueueItem> = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| QueueItem::new(record, index))
        .collect();

    let mut failures: Vec<FailureRecord> = Vec::new();
    let mut succeeded = 0usize;
    let mut cached = 0usize;

    // A zero window would never advance; always process at least one item.
    let window_size = ctx.config.window_size.max(1);

    let mut next = 0;
    while next < items.len() {
        let window_end = (next + window_size).min(items.len());

        let mut handles: Vec<(usize, JoinHandle<Result<ProcessedRecord>>)> = Vec::new();
        for position in next..window_end {
            let item = &items[position];
            progress.record_started(&item.record.listing_title, position, total);

            let ctx = Arc::clone(&ctx);
            let record = item.record.clone();
            handles.push((
                position,
                tokio::spawn(async move { processor::process_record(&ctx, &record).await }),
            ));
        }

        for (position, handle) in handles {
            let item = &mut items[position];
            let title = item.record.listing_title.clone();

            match handle.await {
                Ok(Ok(processed)) => {
                    if processed.outcome == Outcome::Cached {
                        cached += 1;
                    }
                    succeeded += 1;
                    progress.record_finished(&title, processed.outcome);
                    ctx.task.set_generated_text(&mut item.record, processed.text);
                }
                Ok(Err(e)) => {
                    warn!(title = %title, error = %e, "record failed");
                    progress.record_failed(&title, &e.to_string());
                    failures.push(FailureRecord {
                        listing_title: title,
                        website: item.record.website.clone(),
                        error: e.to_string(),
                    });
                }
                Err(join_error) => {
                    warn!(title = %title, error = %join_error, "record task aborted");
                    progress.record_failed(&title, &join_error.to_string());
                    failures.push(FailureRecord {
                        listing_title: title,
                        website: item.record.website.clone(),
                        error: format!("worker task aborted: {join_error}"),
                    });
                }
            }
            item.processed = true;
        }

        next = window_end;
    }

    let records: Vec<OrganizationRecord> = items.into_iter().map(|item| item.record).collect();
    save_dataset(dataset_path, &records)?;

    let summary = RunSummary {
        total,
        succeeded,
        cached,
        failures,
        started_at,
        finished_at: Utc::now(),
    };

    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        cached = summary.cached,
        failed = summary.failed(),
        "batch run complete"
    );
    for failure in &summary.failures {
        warn!(
            title = %failure.listing_title,
            website = failure.website.as_deref().unwrap_or("-"),
            error = %failure.error,
            "failed record"
        );
    }

    Ok(summary)
}
