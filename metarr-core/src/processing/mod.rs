// ============================================================================
// metarr-core/src/processing/mod.rs
// ============================================================================
//
// PROCESSING: Batch orchestration and the per-file pipeline
//
// This module turns the configured input paths into batches, pairs videos
// with sidecars, runs each pair through the metadata and video phases on a
// pool of worker threads, and aggregates failures.
//
// KEY COMPONENTS:
// - batch: BatchProcessor and the run summary
// - pairing: input classification and name matching
// - worker: the per-file pipeline
// - executor: probe, ffmpeg and the final swap for one video
// - probe: metadata-present short-circuit
// - resource_gate: memory/CPU gate in front of every file

pub mod batch;
pub mod executor;
pub mod pairing;
pub mod probe;
pub mod resource_gate;
pub mod worker;

pub use batch::{BatchProcessor, RunSummary};
pub use executor::{ExecuteOutcome, VideoExecutor};
pub use pairing::{Batch, BatchInput, WorkItem, classify_inputs, match_batch, plan_batches};
pub use resource_gate::{ResourceGate, SysinfoProbe, SystemProbe};
pub use worker::{Collaborators, FileProcessor, FileReport};
