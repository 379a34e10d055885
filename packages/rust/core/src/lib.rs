//! Orchestration core for the listscribe enrichment pipeline.
//!
//! Everything between "a dataset file" and "an enriched dataset file" lives
//! here: dataset and backing-file persistence, AI link prioritization, prompt
//! budget negotiation, per-record processing, and the windowed batch
//! scheduler. Network plumbing lives in `listscribe-crawler` and
//! `listscribe-genai`; this crate only composes them.

pub mod dataset;
pub mod prioritizer;
pub mod processor;
pub mod prompt;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use processor::{Outcome, ProcessedRecord, ProcessorContext, process_record};
pub use scheduler::{ProgressReporter, RunSummary, SilentProgress, run};
