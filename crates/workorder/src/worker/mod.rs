pub mod batch;
pub mod job;
pub mod pool;
pub mod scanner;

pub use batch::{BatchReport, BatchRunner};
pub use job::{DocumentOutcome, Job, JobResult};
pub use pool::{pipeline_factory, PipelineFactory, WorkerPool};
pub use scanner::DirectoryScanner;

/// Worker count used when the caller asks for one worker per CPU.
pub fn available_workers() -> usize {
    num_cpus::get().max(1)
}
