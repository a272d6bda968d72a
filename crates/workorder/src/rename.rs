//! Renames already searchable PDFs to `{work_order}.pdf`.
//!
//! Page text comes from the PDF's own text layer; no OCR is run. Only the
//! work-order number is extracted, from the first page that carries one.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;

use crate::error::{ProcessError, StorageError, WorkerError};
use crate::extractor::extract_work_order;
use crate::naming::work_order_filename;
use crate::sanitize;
use crate::storage::rename_no_clobber;
use crate::worker::scanner::{DirectoryScanner, PDF_EXTENSION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenameOutcome {
    Renamed {
        work_order: String,
        destination: PathBuf,
    },
    /// Dry run: the rename that would have happened.
    Planned {
        work_order: String,
        destination: PathBuf,
    },
    /// The file already carries its work-order name.
    Unchanged { work_order: String },
    /// No "Work Order" label on any page; the file is left alone.
    NoMatch,
    Conflict {
        work_order: String,
        destination: PathBuf,
    },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameResult {
    pub source_path: PathBuf,
    #[serde(flatten)]
    pub outcome: RenameOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameReport {
    pub directory: PathBuf,
    pub dry_run: bool,
    pub files: Vec<RenameResult>,
}

impl RenameReport {
    pub fn renamed(&self) -> usize {
        self.count(|o| matches!(o, RenameOutcome::Renamed { .. } | RenameOutcome::Planned { .. }))
    }

    pub fn no_match(&self) -> usize {
        self.count(|o| matches!(o, RenameOutcome::NoMatch))
    }

    pub fn conflicts(&self) -> usize {
        self.count(|o| matches!(o, RenameOutcome::Conflict { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RenameOutcome::Failed { .. }))
    }

    pub fn has_problems(&self) -> bool {
        self.conflicts() > 0 || self.failed() > 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} files: {} {}, {} without work order, {} conflicts, {} failed",
            self.files.len(),
            self.renamed(),
            if self.dry_run { "to rename" } else { "renamed" },
            self.no_match(),
            self.conflicts(),
            self.failed()
        )
    }

    fn count(&self, predicate: impl Fn(&RenameOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| predicate(&f.outcome)).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenameUtility {
    dry_run: bool,
}

impl RenameUtility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Processes every top-level `.pdf` of `directory` in name order.
    pub fn run(&self, directory: &Path) -> Result<RenameReport, WorkerError> {
        let _span = tracing::info_span!("rename", dry_run = self.dry_run).entered();
        let files = DirectoryScanner::new(directory).files_with_extension(PDF_EXTENSION)?;

        let mut names = NameLedger::default();
        let results: Vec<RenameResult> = files
            .iter()
            .map(|path| self.rename_file(path, &mut names))
            .collect();

        let report = RenameReport {
            directory: directory.to_path_buf(),
            dry_run: self.dry_run,
            files: results,
        };
        info!("{}", report.summary());
        Ok(report)
    }

    fn rename_file(&self, path: &Path, names: &mut NameLedger) -> RenameResult {
        let outcome = match find_work_order(path) {
            Ok(Some(work_order)) => self.apply(path, work_order, names),
            Ok(None) => {
                info!("No Work Order found in: {}", sanitize::redact_path(path));
                RenameOutcome::NoMatch
            }
            Err(e) => {
                warn!("Could not read {}: {}", sanitize::redact_path(path), e);
                RenameOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        RenameResult {
            source_path: path.to_path_buf(),
            outcome,
        }
    }

    fn apply(
        &self,
        path: &Path,
        work_order: String,
        names: &mut NameLedger,
    ) -> RenameOutcome {
        let filename = work_order_filename(&work_order);
        let destination = path
            .parent()
            .map(|dir| dir.join(&filename))
            .unwrap_or_else(|| PathBuf::from(&filename));

        if path.file_name().and_then(|n| n.to_str()) == Some(filename.as_str()) {
            names.claimed.insert(destination);
            return RenameOutcome::Unchanged { work_order };
        }

        if self.dry_run {
            if !names.is_free(&destination) {
                return RenameOutcome::Conflict {
                    work_order,
                    destination,
                };
            }
            names.plan_move(path, &destination);
            return RenameOutcome::Planned {
                work_order,
                destination,
            };
        }

        match rename_no_clobber(path, &destination) {
            Ok(()) => {
                info!("Renamed to: {}", filename);
                names.claimed.insert(destination.clone());
                RenameOutcome::Renamed {
                    work_order,
                    destination,
                }
            }
            Err(StorageError::RenameConflict { destination, .. }) => {
                warn!(
                    "{} already exists, leaving {} in place",
                    sanitize::redact_path(&destination),
                    sanitize::redact_path(path)
                );
                RenameOutcome::Conflict {
                    work_order,
                    destination,
                }
            }
            Err(e) => RenameOutcome::Failed {
                error: e.to_string(),
            },
        }
    }
}

/// Names taken and freed by earlier files of one run.
///
/// A dry run moves nothing on disk, so it consults this to predict what the
/// real run would find at each destination.
#[derive(Default)]
struct NameLedger {
    claimed: HashSet<PathBuf>,
    vacated: HashSet<PathBuf>,
}

impl NameLedger {
    fn is_free(&self, destination: &Path) -> bool {
        let on_disk = destination.exists() && !self.vacated.contains(destination);
        !on_disk && !self.claimed.contains(destination)
    }

    fn plan_move(&mut self, source: &Path, destination: &Path) {
        self.vacated.insert(source.to_path_buf());
        self.vacated.remove(destination);
        self.claimed.insert(destination.to_path_buf());
    }
}

/// The work-order number from the first page whose text has one.
///
/// Pages whose text cannot be decoded are skipped.
pub fn find_work_order(pdf: &Path) -> Result<Option<String>, ProcessError> {
    let doc = lopdf::Document::load(pdf)
        .map_err(|e| ProcessError::PdfProcessing(format!("{}: {}", pdf.display(), e)))?;

    for page_num in doc.get_pages().into_keys() {
        let text = match doc.extract_text(&[page_num]) {
            Ok(text) => text,
            Err(e) => {
                debug!(
                    "No text on page {} of {}: {}",
                    page_num,
                    sanitize::redact_path(pdf),
                    e
                );
                continue;
            }
        };

        if let Some(work_order) = extract_work_order(&text) {
            debug!("Found work order {} on page {}", work_order, page_num);
            return Ok(Some(work_order));
        }
    }

    Ok(None)
}
