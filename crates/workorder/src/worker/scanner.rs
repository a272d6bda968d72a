use std::path::{Path, PathBuf};

use log::{debug, info};
use walkdir::WalkDir;

use crate::error::WorkerError;
use crate::worker::job::Job;

pub const PCL_EXTENSION: &str = "pcl";
pub const PDF_EXTENSION: &str = "pdf";

pub struct DirectoryScanner {
    input_directory: PathBuf,
}

impl DirectoryScanner {
    pub fn new<P: AsRef<Path>>(input_directory: P) -> Self {
        Self {
            input_directory: input_directory.as_ref().to_path_buf(),
        }
    }

    pub fn input_directory(&self) -> &Path {
        &self.input_directory
    }

    /// One job per top-level `.pcl` file, in file-name order.
    pub fn scan(&self) -> Result<Vec<Job>, WorkerError> {
        let jobs: Vec<Job> = self
            .files_with_extension(PCL_EXTENSION)?
            .into_iter()
            .map(Job::new)
            .collect();

        info!(
            "Scanned {} work orders in {}",
            jobs.len(),
            self.input_directory.display()
        );
        Ok(jobs)
    }

    /// Top-level regular files whose extension matches `extension`
    /// case-insensitively, sorted by file name.
    pub fn files_with_extension(&self, extension: &str) -> Result<Vec<PathBuf>, WorkerError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.input_directory)
            .min_depth(1)
            .max_depth(1) // Only scan top level, not subdirectories or .work
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| WorkerError::ScanFailed {
                path: self.input_directory.clone(),
                source: e,
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(extension))
                .unwrap_or(false);

            if matches {
                debug!("Found document: {}", path.display());
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }
}
