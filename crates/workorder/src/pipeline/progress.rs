use std::path::PathBuf;
use std::sync::Mutex;

/// Steps of a single document run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Queued,
    Rendering,
    Rasterizing,
    Recognizing,
    Assembling,
    Extracting,
    Finalizing,
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPhase::Queued => write!(f, "Queued"),
            JobPhase::Rendering => write!(f, "Rendering"),
            JobPhase::Rasterizing => write!(f, "Rasterizing"),
            JobPhase::Recognizing => write!(f, "Recognizing"),
            JobPhase::Assembling => write!(f, "Assembling"),
            JobPhase::Extracting => write!(f, "Extracting fields"),
            JobPhase::Finalizing => write!(f, "Finalizing"),
        }
    }
}

/// Events emitted by the pipeline during processing.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Phase {
        phase: JobPhase,
        message: String,
    },
    Completed {
        output_path: PathBuf,
        pages: usize,
    },
    Skipped {
        reason: String,
    },
    Conflict {
        destination: PathBuf,
        kept_at: PathBuf,
    },
    Failed {
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Writes progress to the `log` facade, prefixed with the document name.
pub struct LogProgress {
    filename: String,
}

impl LogProgress {
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
        }
    }
}

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase { phase, message } => {
                log::debug!("[{}] {}: {}", self.filename, phase, message);
            }
            ProgressEvent::Completed { output_path, pages } => {
                log::info!(
                    "[{}] Completed: {} ({} pages)",
                    self.filename,
                    output_path.display(),
                    pages
                );
            }
            ProgressEvent::Skipped { reason } => {
                log::warn!("[{}] Skipped: {}", self.filename, reason);
            }
            ProgressEvent::Conflict {
                destination,
                kept_at,
            } => {
                log::warn!(
                    "[{}] {} already exists, document kept at {}",
                    self.filename,
                    destination.display(),
                    kept_at.display()
                );
            }
            ProgressEvent::Failed { error } => {
                log::error!("[{}] Failed: {}", self.filename, error);
            }
        }
    }
}

/// Keeps every event in order. Useful for asserting on a run.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn phases(&self) -> Vec<JobPhase> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Phase { phase, .. } => Some(phase),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(JobPhase::Extracting.to_string(), "Extracting fields");
        assert_eq!(JobPhase::Finalizing.to_string(), "Finalizing");
    }

    #[test]
    fn test_recording_progress_keeps_order() {
        let progress = RecordingProgress::new();
        progress.report(ProgressEvent::Phase {
            phase: JobPhase::Rendering,
            message: String::new(),
        });
        progress.report(ProgressEvent::Phase {
            phase: JobPhase::Rasterizing,
            message: String::new(),
        });
        progress.report(ProgressEvent::Failed {
            error: "boom".to_string(),
        });

        assert_eq!(
            progress.phases(),
            vec![JobPhase::Rendering, JobPhase::Rasterizing]
        );
        assert_eq!(progress.events().len(), 3);
    }

    #[test]
    fn test_log_progress_accepts_every_event() {
        let progress = LogProgress::new("wo.pcl");
        progress.report(ProgressEvent::Skipped {
            reason: "no pages".to_string(),
        });
        progress.report(ProgressEvent::Completed {
            output_path: PathBuf::from("/out/1_A_B.pdf"),
            pages: 2,
        });
    }
}
