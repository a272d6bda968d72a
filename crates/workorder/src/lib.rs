pub mod config;
pub mod error;
pub mod extractor;
pub mod naming;
pub mod pipeline;
pub mod processor;
pub mod rename;
pub mod sanitize;
pub mod storage;
pub mod worker;

pub use config::{load_config, validate_config, AssemblyStrategy, Config, RecognitionPolicy};
pub use error::{ConfigError, ProcessError, Result, StorageError, WorkerError, WorkorderError};
pub use extractor::{Assignee, ExtractedRecord, FieldExtractor, KnownAssignees};
pub use naming::document_filename;
pub use pipeline::{Pipeline, PipelineConfig, PipelineContext};
pub use rename::{RenameOutcome, RenameReport, RenameUtility};
pub use worker::{BatchReport, BatchRunner, DocumentOutcome, Job, JobResult};
