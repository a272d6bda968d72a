use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;

use crate::config::schema::AssemblyStrategy;
use crate::error::WorkerError;
use crate::pipeline::{LogProgress, PipelineConfig, PipelineContext};
use crate::sanitize;
use crate::worker::job::{DocumentOutcome, Job, JobResult};
use crate::worker::pool::{pipeline_factory, PipelineFactory, WorkerPool};
use crate::worker::scanner::DirectoryScanner;

const INTERRUPTED: &str = "interrupted before processing";

/// Outcome of one pass over the input directory.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_directory: PathBuf,
    pub output_directory: PathBuf,
    pub strategy: AssemblyStrategy,
    pub interrupted: bool,
    pub documents: Vec<JobResult>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.documents.len()
    }

    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Completed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Failed { .. }))
    }

    pub fn conflicts(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Conflict { .. }))
    }

    /// True when a document failed or could not take its intended name.
    pub fn has_problems(&self) -> bool {
        self.failed() > 0 || self.conflicts() > 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} documents: {} completed, {} skipped, {} failed, {} conflicts",
            self.total(),
            self.completed(),
            self.skipped(),
            self.failed(),
            self.conflicts()
        )
    }

    fn count(&self, predicate: impl Fn(&DocumentOutcome) -> bool) -> usize {
        self.documents
            .iter()
            .filter(|d| predicate(&d.outcome))
            .count()
    }
}

/// Runs every work order of the input directory, sequentially or on the
/// worker pool depending on `worker_count`.
pub struct BatchRunner {
    config: Arc<PipelineConfig>,
    factory: PipelineFactory,
    shutdown: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        let factory = pipeline_factory(Arc::clone(&config));
        Self::with_factory(config, factory)
    }

    pub fn with_factory(config: Arc<PipelineConfig>, factory: PipelineFactory) -> Self {
        Self {
            config,
            factory,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares an externally owned stop flag, e.g. one set from a Ctrl-C
    /// handler.
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn run(&self) -> Result<BatchReport, WorkerError> {
        let jobs = DirectoryScanner::new(&self.config.input_directory).scan()?;
        Ok(self.run_jobs(jobs))
    }

    pub fn run_jobs(&self, jobs: Vec<Job>) -> BatchReport {
        let started_at = Utc::now();
        let _span = tracing::info_span!("batch", documents = jobs.len()).entered();

        let mut documents = if self.config.worker_count > 1 && jobs.len() > 1 {
            self.run_parallel(jobs)
        } else {
            self.run_sequential(jobs)
        };
        documents.sort_by(|a, b| a.source_path.cmp(&b.source_path));

        let report = BatchReport {
            started_at,
            finished_at: Utc::now(),
            input_directory: self.config.input_directory.clone(),
            output_directory: self.config.output_directory.clone(),
            strategy: self.config.strategy,
            interrupted: self.shutdown.load(Ordering::Relaxed),
            documents,
        };

        info!("Batch finished: {}", report.summary());
        report
    }

    fn run_sequential(&self, jobs: Vec<Job>) -> Vec<JobResult> {
        let pipeline = (self.factory)();
        let mut results = Vec::with_capacity(jobs.len());

        for job in jobs {
            if self.shutdown.load(Ordering::Relaxed) {
                results.push(JobResult::skipped(&job, INTERRUPTED));
                continue;
            }

            let progress = LogProgress::new(&sanitize::redact_path(&job.source_path));
            let (result, _ctx) = pipeline.run(PipelineContext::new(job), &progress);
            results.push(result);
        }

        results
    }

    fn run_parallel(&self, jobs: Vec<Job>) -> Vec<JobResult> {
        let total = jobs.len();
        let mut pending: HashMap<String, Job> =
            jobs.iter().map(|job| (job.id.clone(), job.clone())).collect();
        let mut results = Vec::with_capacity(total);

        let pool = WorkerPool::with_factory(
            Arc::clone(&self.factory),
            self.config.worker_count,
            Arc::clone(&self.shutdown),
        );

        thread::scope(|scope| {
            let pool = &pool;
            scope.spawn(move || {
                for job in jobs {
                    if pool.submit(job).is_err() {
                        break;
                    }
                }
            });

            while results.len() < total {
                match pool.recv_result() {
                    Some(result) => {
                        pending.remove(&result.job_id);
                        results.push(result);
                    }
                    None => break,
                }
            }
        });

        pool.wait();

        if !pending.is_empty() {
            warn!("{} documents were not processed", pending.len());
        }
        results.extend(
            pending
                .into_values()
                .map(|job| JobResult::skipped(&job, INTERRUPTED)),
        );
        results
    }
}
