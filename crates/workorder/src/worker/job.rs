use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::extractor::ExtractedRecord;

/// One PCL work order waiting to be converted.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub source_path: PathBuf,
    /// File stem of the source, used to name intermediates.
    pub base_name: String,
}

impl Job {
    pub fn new(source_path: PathBuf) -> Self {
        let base_name = Self::base_name_of(&source_path);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_path,
            base_name,
        }
    }

    fn base_name_of(path: &Path) -> String {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "document".to_string())
    }
}

/// How a single document run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Completed { output: PathBuf, pages: usize },
    /// Nothing to convert, e.g. the rendered PDF had no pages.
    Skipped { reason: String },
    Failed { error: String },
    /// The target name was taken; the document was kept under `kept_at`.
    Conflict { destination: PathBuf, kept_at: PathBuf },
}

impl fmt::Display for DocumentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentOutcome::Completed { output, pages } => {
                write!(f, "completed: {} ({} pages)", output.display(), pages)
            }
            DocumentOutcome::Skipped { reason } => write!(f, "skipped: {}", reason),
            DocumentOutcome::Failed { error } => write!(f, "failed: {}", error),
            DocumentOutcome::Conflict {
                destination,
                kept_at,
            } => write!(
                f,
                "conflict: {} exists, kept as {}",
                destination.display(),
                kept_at.display()
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub job_id: String,
    pub source_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ExtractedRecord>,
    #[serde(flatten)]
    pub outcome: DocumentOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl JobResult {
    fn new(job: &Job, outcome: DocumentOutcome) -> Self {
        Self {
            job_id: job.id.clone(),
            source_path: job.source_path.clone(),
            record: None,
            outcome,
            warnings: Vec::new(),
        }
    }

    pub fn completed(job: &Job, output: PathBuf, pages: usize) -> Self {
        Self::new(job, DocumentOutcome::Completed { output, pages })
    }

    pub fn skipped(job: &Job, reason: impl Into<String>) -> Self {
        Self::new(
            job,
            DocumentOutcome::Skipped {
                reason: reason.into(),
            },
        )
    }

    pub fn failure(job: &Job, error: impl Into<String>) -> Self {
        Self::new(
            job,
            DocumentOutcome::Failed {
                error: error.into(),
            },
        )
    }

    pub fn conflict(job: &Job, destination: PathBuf, kept_at: PathBuf) -> Self {
        Self::new(
            job,
            DocumentOutcome::Conflict {
                destination,
                kept_at,
            },
        )
    }

    pub fn with_record(mut self, record: Option<ExtractedRecord>) -> Self {
        self.record = record;
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, DocumentOutcome::Completed { .. })
    }

    pub fn output_path(&self) -> Option<&Path> {
        match &self.outcome {
            DocumentOutcome::Completed { output, .. } => Some(output),
            DocumentOutcome::Conflict { kept_at, .. } => Some(kept_at),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Assignee;

    #[test]
    fn test_outcome_display() {
        let outcome = DocumentOutcome::Conflict {
            destination: PathBuf::from("out/1_A_B.pdf"),
            kept_at: PathBuf::from("out/wo_ocr.pdf"),
        };
        assert_eq!(
            outcome.to_string(),
            "conflict: out/1_A_B.pdf exists, kept as out/wo_ocr.pdf"
        );
        assert_eq!(
            DocumentOutcome::Skipped {
                reason: "no pages".to_string()
            }
            .to_string(),
            "skipped: no pages"
        );
    }

    #[test]
    fn test_job_new() {
        let job = Job::new(PathBuf::from("/input/WO-1001.pcl"));
        assert!(!job.id.is_empty());
        assert_eq!(job.source_path, PathBuf::from("/input/WO-1001.pcl"));
        assert_eq!(job.base_name, "WO-1001");
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = Job::new(PathBuf::from("a.pcl"));
        let b = Job::new(PathBuf::from("a.pcl"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_job_base_name_fallback() {
        let job = Job::new(PathBuf::from("/"));
        assert_eq!(job.base_name, "document");
    }

    #[test]
    fn test_job_result_completed() {
        let job = Job::new(PathBuf::from("/input/doc.pcl"));
        let result = JobResult::completed(&job, PathBuf::from("/out/1_A_B.pdf"), 2);

        assert!(result.is_success());
        assert_eq!(result.job_id, job.id);
        assert_eq!(result.output_path(), Some(Path::new("/out/1_A_B.pdf")));
    }

    #[test]
    fn test_job_result_failure() {
        let job = Job::new(PathBuf::from("/input/doc.pcl"));
        let result = JobResult::failure(&job, "Test error");

        assert!(!result.is_success());
        assert!(result.output_path().is_none());
        assert_eq!(
            result.outcome,
            DocumentOutcome::Failed {
                error: "Test error".to_string()
            }
        );
    }

    #[test]
    fn test_conflict_points_at_preserved_copy() {
        let job = Job::new(PathBuf::from("/input/doc.pcl"));
        let result = JobResult::conflict(
            &job,
            PathBuf::from("/out/1_A_B.pdf"),
            PathBuf::from("/out/doc_ocr.pdf"),
        );

        assert!(!result.is_success());
        assert_eq!(result.output_path(), Some(Path::new("/out/doc_ocr.pdf")));
    }

    #[test]
    fn test_job_result_serializes_flat_status() {
        let job = Job::new(PathBuf::from("/input/doc.pcl"));
        let result = JobResult::skipped(&job, "no pages").with_record(Some(ExtractedRecord {
            work_order: Some("7".to_string()),
            description: None,
            assignee: Assignee::Unknown,
        }));

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "skipped");
        assert_eq!(value["reason"], "no pages");
        assert_eq!(value["record"]["work_order"], "7");
        assert!(value.get("warnings").is_none());
    }
}
