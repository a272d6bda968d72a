use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info};

use crate::error::WorkerError;
use crate::pipeline::{JobPhase, LogProgress, Pipeline, PipelineConfig, PipelineContext};
use crate::pipeline::{ProgressEvent, ProgressReporter};
use crate::sanitize;
use crate::worker::job::{Job, JobResult};

/// Builds one [`Pipeline`] per worker thread.
pub type PipelineFactory = Arc<dyn Fn() -> Pipeline + Send + Sync>;

/// The production factory: real GhostPCL / poppler / Tesseract adapters.
pub fn pipeline_factory(config: Arc<PipelineConfig>) -> PipelineFactory {
    Arc::new(move || Pipeline::from_config(Arc::clone(&config)))
}

/// How long an idle worker waits for a job before re-checking shutdown.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Fixed set of threads converting jobs from a bounded queue.
///
/// Results arrive in completion order, not submission order.
pub struct WorkerPool {
    jobs: Sender<Job>,
    results: Receiver<JobResult>,
    handles: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(config: Arc<PipelineConfig>, worker_count: usize) -> Self {
        Self::with_factory(
            pipeline_factory(config),
            worker_count,
            Arc::new(AtomicBool::new(false)),
        )
    }

    /// Starts `worker_count` threads (at least one) that stop taking jobs
    /// once `shutdown` is set.
    pub fn with_factory(
        factory: PipelineFactory,
        worker_count: usize,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let worker_count = worker_count.max(1);
        let (jobs, job_queue) = bounded::<Job>(worker_count * 2);
        let (result_sink, results) = bounded::<JobResult>(worker_count * 2);

        let handles = (0..worker_count)
            .map(|id| {
                let worker = Worker {
                    id,
                    jobs: job_queue.clone(),
                    results: result_sink.clone(),
                    shutdown: Arc::clone(&shutdown),
                };
                let factory = Arc::clone(&factory);
                thread::spawn(move || worker.run(factory()))
            })
            .collect();

        info!("Started {} workers", worker_count);

        Self {
            jobs,
            results,
            handles,
            shutdown,
        }
    }

    pub fn submit(&self, job: Job) -> Result<(), WorkerError> {
        if self.is_shutdown() {
            return Err(WorkerError::ChannelClosed);
        }
        self.jobs.send(job).map_err(|_| WorkerError::ChannelClosed)
    }

    /// Blocks for the next result; `None` once every worker has stopped.
    pub fn recv_result(&self) -> Option<JobResult> {
        self.results.recv().ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Closes the queue and joins every worker.
    pub fn wait(self) {
        drop(self.jobs);

        for (id, handle) in self.handles.into_iter().enumerate() {
            match handle.join() {
                Ok(()) => debug!("Worker {} finished", id),
                Err(e) => error!("Worker {} panicked: {:?}", id, e),
            }
        }

        info!("All workers have stopped");
    }
}

struct Worker {
    id: usize,
    jobs: Receiver<Job>,
    results: Sender<JobResult>,
    shutdown: Arc<AtomicBool>,
}

impl Worker {
    fn run(self, pipeline: Pipeline) {
        debug!("Worker {} started", self.id);

        while let Some(job) = self.next_job() {
            let progress = LogProgress::new(&sanitize::redact_path(&job.source_path));
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Queued,
                message: format!("Picked up by worker {}", self.id),
            });

            let (result, _ctx) = pipeline.run(PipelineContext::new(job), &progress);
            if self.results.send(result).is_err() {
                error!("Worker {}: result receiver is gone", self.id);
                break;
            }
        }

        debug!("Worker {} stopped", self.id);
    }

    /// The next queued job, or `None` on shutdown or once the queue is
    /// closed and drained.
    fn next_job(&self) -> Option<Job> {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                debug!("Worker {} received shutdown signal", self.id);
                return None;
            }
            match self.jobs.recv_timeout(IDLE_POLL) {
                Ok(job) => return Some(job),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}
