use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkorderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid assignee list: {reason}")]
    InvalidAssignees { reason: String },
}

/// Failures of the external conversion stages.
///
/// `Render` and `Rasterize` abort the current document only. `Recognition`
/// is always tied to one page so callers can decide between aborting the
/// document and degrading that page.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render '{path}': {status}")]
    Render { path: PathBuf, status: String },

    #[error("Failed to rasterize '{path}': {reason}")]
    Rasterize { path: PathBuf, reason: String },

    #[error("OCR failed on page {page}: {reason}")]
    Recognition { page: usize, reason: String },

    #[error("Failed to assemble PDF '{path}': {reason}")]
    Assembly { path: PathBuf, reason: String },

    #[error("Failed to process PDF: {0}")]
    PdfProcessing(String),

    #[error("Failed to process image: {0}")]
    ImageProcessing(String),

    #[error("Failed to prepare work directory '{path}': {source}")]
    WorkDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move file from '{from}' to '{to}': {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot rename '{source_path}': destination '{destination}' already exists")]
    RenameConflict {
        source_path: PathBuf,
        destination: PathBuf,
    },

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Directory scan failed for '{path}': {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

pub type Result<T> = std::result::Result<T, WorkorderError>;
