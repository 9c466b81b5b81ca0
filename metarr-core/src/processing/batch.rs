// ============================================================================
// metarr-core/src/processing/batch.rs
// ============================================================================
//
// BATCH ORCHESTRATOR: Pairing, worker pool and failure aggregation
//
// A run is a sequence of batches. Each batch is expanded into work items,
// which are fed through a bounded channel to a fixed pool of scoped worker
// threads. Every worker passes the resource gate before touching a file and
// sends its result to a single collector. Per-file failures are recorded
// and never stop sibling files; a pairing failure only drops its batch.
//
// WORKFLOW:
// 1. Classify inputs (config errors abort the run)
// 2. Plan batches with ids from one atomic counter
// 3. For each batch: match, fan out, collect, report
// 4. Clean up: release pooled buffers and idle path locks
//
// KEY COMPONENTS:
// - BatchProcessor: owns the batch counter, failure list and policy
// - RunSummary: processed files and failures of the whole run

// ---- Internal crate imports ----
use crate::cancel::CancellationToken;
use crate::config::CoreConfig;
use crate::discovery::FileFilter;
use crate::edit::OverwritePolicy;
use crate::error::{CoreError, CoreResult, ProcessingError};
use crate::external::FfmpegSpawner;
use crate::processing::pairing::{Batch, BatchInput, WorkItem, classify_inputs, match_batch, plan_batches};
use crate::processing::resource_gate::ResourceGate;
use crate::processing::worker::{Collaborators, FileProcessor, FileReport};
use crate::sidecar::{prune_unused_locks, release_pooled_buffers};

// ---- External crate imports ----
use crossbeam_channel::{bounded, unbounded};
use log::{debug, error, info, warn};
use parking_lot::Mutex;

// ---- Standard library imports ----
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::thread;

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub batches: usize,
    pub processed: Vec<FileReport>,
    pub failures: Vec<ProcessingError>,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

pub struct BatchProcessor<'a, S: FfmpegSpawner> {
    config: &'a CoreConfig,
    tools: Collaborators<'a, S>,
    cancel: CancellationToken,
    batch_ids: AtomicU64,
    failures: Mutex<Vec<ProcessingError>>,
    policy: OverwritePolicy,
}

impl<'a, S: FfmpegSpawner> BatchProcessor<'a, S> {
    pub fn new(config: &'a CoreConfig, tools: Collaborators<'a, S>, cancel: CancellationToken) -> Self {
        Self {
            config,
            tools,
            cancel,
            batch_ids: AtomicU64::new(0),
            failures: Mutex::new(Vec::new()),
            policy: OverwritePolicy::new(config.meta_overwrite, config.meta_preserve),
        }
    }

    /// The overwrite policy shared by every worker of this run.
    pub fn policy(&self) -> &OverwritePolicy {
        &self.policy
    }

    /// Runs every batch. Only configuration errors are returned as `Err`;
    /// everything else ends up in the summary.
    pub fn run(&self) -> CoreResult<RunSummary> {
        let inputs = classify_inputs(self.config)?;
        let batches = plan_batches(&inputs, self.config.skip_videos, &self.batch_ids);
        if batches.is_empty() {
            warn!("Nothing to process");
        }

        let filter = FileFilter {
            exts: self.config.input_exts.clone(),
            prefixes: self.config.prefixes.clone(),
            contains: self.config.contains.clone(),
            omit: self.config.omit.clone(),
        };

        let mut summary = RunSummary {
            batches: batches.len(),
            ..RunSummary::default()
        };
        for batch in &batches {
            if self.cancel.is_cancelled() {
                break;
            }
            match match_batch(batch, &filter) {
                Ok(items) if items.is_empty() => {
                    info!("Batch {}: no files to process", batch.id);
                }
                Ok(items) => {
                    let reports = self.run_batch(batch.id, items);
                    summary.processed.extend(reports);
                }
                Err(e) => {
                    error!("Batch {} aborted: {}", batch.id, e);
                    self.failures
                        .lock()
                        .push(ProcessingError::new(batch.id, batch_label(batch), e));
                }
            }
        }

        self.cleanup();
        summary.failures = std::mem::take(&mut *self.failures.lock());
        summary.cancelled = self.cancel.is_cancelled();
        Ok(summary)
    }

    fn run_batch(&self, batch_id: u64, items: Vec<WorkItem>) -> Vec<FileReport> {
        let workers = self.config.worker_count().min(items.len()).max(1);
        let capacity = items.len().min(2 * self.config.worker_count()).max(1);
        info!(
            "Batch {}: {} file(s), {} worker(s)",
            batch_id,
            items.len(),
            workers
        );

        let (job_tx, job_rx) = bounded::<WorkItem>(capacity);
        let (result_tx, result_rx) = unbounded::<(WorkItem, CoreResult<FileReport>)>();
        let gate = ResourceGate::new(self.config.min_free_mem, self.config.max_cpu);
        let failed_before = self.failures.lock().len();
        let mut reports = Vec::new();

        thread::scope(|scope| {
            for worker in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let cancel = &self.cancel;
                let processor = FileProcessor::new(self.config, self.tools, &self.policy);
                let system = self.tools.system;
                scope.spawn(move || {
                    debug!("Worker {} started", worker);
                    for item in job_rx.iter() {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let result = gate.wait(system, cancel).and_then(|()| {
                            catch_unwind(AssertUnwindSafe(|| processor.process(&item, cancel)))
                                .unwrap_or_else(|panic| Err(CoreError::WorkerPanic(panic_message(panic.as_ref()))))
                        });
                        if result_tx.send((item, result)).is_err() {
                            break;
                        }
                    }
                    debug!("Worker {} finished", worker);
                });
            }
            drop(job_rx);
            drop(result_tx);

            for item in items {
                if self.cancel.is_cancelled() || job_tx.send(item).is_err() {
                    break;
                }
            }
            drop(job_tx);

            for (item, result) in result_rx.iter() {
                match result {
                    Ok(report) => reports.push(report),
                    Err(e) if e.is_cancelled() => {
                        debug!("Cancelled: {}", item.sidecar.display());
                    }
                    Err(e) => {
                        let path = item.video.clone().unwrap_or_else(|| item.sidecar.clone());
                        error!("{}: {}", path.display(), e);
                        self.failures.lock().push(ProcessingError::new(batch_id, path, e));
                    }
                }
            }
        });

        let failures = self.failures.lock();
        let failed = &failures[failed_before..];
        info!(
            "Batch {} finished: {} succeeded, {} failed",
            batch_id,
            reports.len(),
            failed.len()
        );
        for failure in failed {
            warn!("  {}", failure);
        }
        reports
    }

    fn cleanup(&self) {
        let released = release_pooled_buffers();
        prune_unused_locks();
        debug!("Released {} pooled buffer(s)", released);
    }
}

fn batch_label(batch: &Batch) -> PathBuf {
    match &batch.input {
        BatchInput::Directory { video_dir, sidecar_dir } => {
            video_dir.clone().unwrap_or_else(|| sidecar_dir.clone())
        }
        BatchInput::File { video, sidecar } => video
            .clone()
            .or_else(|| sidecar.clone())
            .unwrap_or_default(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::ScriptedPrompter;
    use crate::external::mocks::{
        FixedSystemProbe, MockFfmpegSpawner, MockFfprobeExecutor, StaticEncoderCatalog,
    };
    use crate::scraper::NoopScraper;
    use std::fs;
    use std::path::Path;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn failures_do_not_stop_siblings() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.info.json", r#"{"title": "Good"}"#);
        write(dir.path(), "bad.info.json", "{ not json");

        let config = CoreConfig {
            sidecar_dirs: vec![dir.path().to_path_buf()],
            concurrency: 2,
            ..CoreConfig::default()
        };
        let spawner = MockFfmpegSpawner::new();
        let prober = MockFfprobeExecutor::new();
        let catalog = StaticEncoderCatalog::new(["aac"]);
        let system = FixedSystemProbe::new(u64::MAX, 0.0);
        let scraper = NoopScraper::new();
        let prompter = ScriptedPrompter::new([]);
        let tools = Collaborators {
            spawner: &spawner,
            prober: &prober,
            catalog: &catalog,
            system: &system,
            scraper: &scraper,
            prompter: &prompter,
        };

        let summary = BatchProcessor::new(&config, tools, CancellationToken::new())
            .run()
            .unwrap();
        assert_eq!(summary.batches, 1);
        assert_eq!(summary.processed.len(), 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].batch_id, 1);
        assert!(summary.failures[0].file.ends_with("bad.info.json"));
    }

    #[test]
    fn pairing_failure_aborts_only_its_batch() {
        let videos = tempfile::tempdir().unwrap();
        let empty = tempfile::tempdir().unwrap();
        let sidecars = tempfile::tempdir().unwrap();
        write(videos.path(), "clip.mp4", "v");
        write(sidecars.path(), "other.info.json", r#"{"title": "Other"}"#);

        let config = CoreConfig {
            video_dirs: vec![videos.path().to_path_buf()],
            sidecar_dirs: vec![empty.path().to_path_buf(), sidecars.path().to_path_buf()],
            ..CoreConfig::default()
        };
        let spawner = MockFfmpegSpawner::new();
        let prober = MockFfprobeExecutor::new();
        let catalog = StaticEncoderCatalog::new(["aac"]);
        let system = FixedSystemProbe::new(u64::MAX, 0.0);
        let scraper = NoopScraper::new();
        let prompter = ScriptedPrompter::new([]);
        let tools = Collaborators {
            spawner: &spawner,
            prober: &prober,
            catalog: &catalog,
            system: &system,
            scraper: &scraper,
            prompter: &prompter,
        };

        let summary = BatchProcessor::new(&config, tools, CancellationToken::new())
            .run()
            .unwrap();
        assert_eq!(summary.batches, 2);
        assert_eq!(summary.failures.len(), 1);
        assert!(matches!(summary.failures[0].error, CoreError::Pairing(_)));
        assert_eq!(summary.processed.len(), 1);
    }

    #[test]
    fn panic_payloads_become_messages() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
