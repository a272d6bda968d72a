use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Document processing failed: {0}")]
    Processing(#[from] crate::error::ProcessError),

    #[error("Storage failed: {0}")]
    Storage(#[from] crate::error::StorageError),

    #[error("Page count changed during assembly: {expected} page images, {actual} assembled pages")]
    PageCountMismatch { expected: usize, actual: usize },
}

/// Problems that did not stop the document from being produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    PageDegraded { page: usize, reason: String },
    CleanupFailed { path: String, error: String },
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineWarning::PageDegraded { page, reason } => {
                write!(f, "page {} kept without text: {}", page, reason)
            }
            PipelineWarning::CleanupFailed { path, error } => {
                write!(f, "could not remove {}: {}", path, error)
            }
        }
    }
}
