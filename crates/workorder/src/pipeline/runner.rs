use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info_span, warn};

use crate::config::schema::RecognitionPolicy;
use crate::error::{ProcessError, StorageError};
use crate::extractor::FieldExtractor;
use crate::naming;
use crate::processor::{
    self, build_recognizer, GhostPcl, PageImage, PageRasterizer, Pdftoppm, RecognizedPage,
    Recognizer, Renderer,
};
use crate::sanitize;
use crate::storage::FileStorage;
use crate::worker::job::JobResult;

use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::{PipelineError, PipelineWarning};
use super::progress::{JobPhase, ProgressEvent, ProgressReporter};

/// How a run ended when no step failed.
enum Finish {
    Completed { output: PathBuf, pages: usize },
    Skipped { reason: String },
    Conflict { destination: PathBuf, kept_at: PathBuf },
}

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    renderer: Box<dyn Renderer>,
    rasterizer: Box<dyn PageRasterizer>,
    recognizer: Box<dyn Recognizer>,
    extractor: FieldExtractor,
    storage: FileStorage,
}

impl Pipeline {
    /// Builds the external tool adapters from config.
    pub fn from_config(config: Arc<PipelineConfig>) -> Self {
        let renderer = Box::new(GhostPcl::new(&config.renderer));
        let rasterizer = Box::new(Pdftoppm::new(&config.rasterizer));
        let recognizer = build_recognizer(&config.ocr);
        Self::new(config, renderer, rasterizer, recognizer)
    }

    /// Injects specific adapters, e.g. fakes that need no external tools.
    pub fn new(
        config: Arc<PipelineConfig>,
        renderer: Box<dyn Renderer>,
        rasterizer: Box<dyn PageRasterizer>,
        recognizer: Box<dyn Recognizer>,
    ) -> Self {
        let extractor = FieldExtractor::new(config.assignees.clone());
        let storage = FileStorage::new(&config.output_directory);

        Self {
            config,
            renderer,
            rasterizer,
            recognizer,
            extractor,
            storage,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline for a single document.
    /// Returns a (JobResult, PipelineContext) pair.
    pub fn run(
        &self,
        mut ctx: PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> (JobResult, PipelineContext) {
        let filename = sanitize::redact_path(&ctx.job.source_path);
        let _pipeline_span = info_span!("pipeline",
            job_id = %ctx.job.id,
            filename = %filename,
            strategy = self.config.strategy.as_str(),
        )
        .entered();

        let finish = self.run_steps(&mut ctx, progress);
        self.remove_work_directory(&mut ctx);

        let warnings: Vec<String> = ctx.warnings.iter().map(ToString::to_string).collect();
        let result = match finish {
            Ok(Finish::Completed { output, pages }) => {
                progress.report(ProgressEvent::Completed {
                    output_path: output.clone(),
                    pages,
                });
                JobResult::completed(&ctx.job, output, pages)
            }
            Ok(Finish::Skipped { reason }) => {
                progress.report(ProgressEvent::Skipped {
                    reason: reason.clone(),
                });
                JobResult::skipped(&ctx.job, reason)
            }
            Ok(Finish::Conflict {
                destination,
                kept_at,
            }) => {
                progress.report(ProgressEvent::Conflict {
                    destination: destination.clone(),
                    kept_at: kept_at.clone(),
                });
                JobResult::conflict(&ctx.job, destination, kept_at)
            }
            Err(e) => {
                let err_msg = e.to_string();
                progress.report(ProgressEvent::Failed {
                    error: err_msg.clone(),
                });
                JobResult::failure(&ctx.job, err_msg)
            }
        };

        (
            result
                .with_record(ctx.record.clone())
                .with_warnings(warnings),
            ctx,
        )
    }

    fn run_steps(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<Finish, PipelineError> {
        let work_directory = self
            .storage
            .create_work_directory(&sanitize::sanitize_component(&ctx.job.base_name))?;
        ctx.work_directory = Some(work_directory.clone());

        // Step 1: Render
        {
            let _step = info_span!("render").entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Rendering,
                message: "Rendering PCL to PDF...".to_string(),
            });
            self.step_render(ctx, &work_directory)?;
        }

        // Step 2: Rasterize
        {
            let _step = info_span!("rasterize", dpi = self.config.rasterizer.dpi).entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Rasterizing,
                message: "Rasterizing pages...".to_string(),
            });
            self.step_rasterize(ctx, &work_directory)?;
            if ctx.page_images.is_empty() {
                return Ok(Finish::Skipped {
                    reason: "rendered PDF has no pages to recognize".to_string(),
                });
            }
        }

        // Step 3: Recognize
        {
            let _step = info_span!("recognize", pages = ctx.page_images.len()).entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Recognizing,
                message: format!("Running OCR on {} pages...", ctx.page_images.len()),
            });
            self.step_recognize(ctx, &work_directory)?;
        }

        // Step 4: Assemble
        {
            let _step = info_span!("assemble").entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Assembling,
                message: "Assembling searchable PDF...".to_string(),
            });
            self.step_assemble(ctx, &work_directory)?;
        }

        // Step 5: Extract fields
        {
            let _step = info_span!("extract").entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Extracting,
                message: "Extracting work order fields...".to_string(),
            });
            self.step_extract(ctx);
        }

        // Step 6: Finalize
        let _step = info_span!("finalize").entered();
        progress.report(ProgressEvent::Phase {
            phase: JobPhase::Finalizing,
            message: "Renaming document...".to_string(),
        });
        self.step_finalize(ctx)
    }

    fn step_render(
        &self,
        ctx: &mut PipelineContext,
        work_directory: &Path,
    ) -> Result<(), PipelineError> {
        let rendered = work_directory.join("rendered.pdf");
        self.renderer.render(&ctx.job.source_path, &rendered)?;
        ctx.rendered_pdf = Some(rendered);
        Ok(())
    }

    fn step_rasterize(
        &self,
        ctx: &mut PipelineContext,
        work_directory: &Path,
    ) -> Result<(), PipelineError> {
        let Some(rendered) = ctx.rendered_pdf.as_ref() else {
            return Ok(());
        };

        let mut pages = self
            .rasterizer
            .rasterize(rendered, &work_directory.join("pages"))?;
        pages.sort_by_key(|page| page.index);
        debug!("Rasterized {} pages", pages.len());
        ctx.page_images = pages;
        Ok(())
    }

    fn step_recognize(
        &self,
        ctx: &mut PipelineContext,
        work_directory: &Path,
    ) -> Result<(), PipelineError> {
        let results = self.recognize_pages(&ctx.page_images);
        let mut recognized = Vec::with_capacity(results.len());

        for (image, result) in ctx.page_images.iter().zip(results) {
            match result {
                Ok(mut page) => {
                    page.index = image.index;
                    recognized.push(page);
                }
                Err(e) => match self.config.ocr.on_failure {
                    RecognitionPolicy::Abort => return Err(e.into()),
                    RecognitionPolicy::Degrade => {
                        warn!("Keeping page {} without text: {}", image.index + 1, e);
                        ctx.warnings.push(PipelineWarning::PageDegraded {
                            page: image.index + 1,
                            reason: e.to_string(),
                        });
                        recognized.push(self.degraded_page(image, work_directory)?);
                    }
                },
            }
        }

        ctx.recognized_pages = recognized;
        Ok(())
    }

    /// Recognizes every page, spreading the work over `ocr.page_workers`
    /// scoped threads. The result is ordered like `pages`.
    fn recognize_pages(&self, pages: &[PageImage]) -> Vec<Result<RecognizedPage, ProcessError>> {
        let strategy = self.config.strategy;
        let recognizer = self.recognizer.as_ref();
        let workers = self.config.ocr.page_workers.clamp(1, pages.len().max(1));

        if workers == 1 {
            return pages
                .iter()
                .map(|page| recognizer.recognize(page, strategy))
                .collect();
        }

        let chunk_size = pages.len().div_ceil(workers);
        let mut results: Vec<(usize, Result<RecognizedPage, ProcessError>)> =
            thread::scope(|scope| {
                let handles: Vec<_> = pages
                    .chunks(chunk_size)
                    .map(|chunk| {
                        let handle = scope.spawn(move || {
                            chunk
                                .iter()
                                .map(|page| (page.index, recognizer.recognize(page, strategy)))
                                .collect::<Vec<_>>()
                        });
                        (chunk, handle)
                    })
                    .collect();

                handles
                    .into_iter()
                    .flat_map(|(chunk, handle)| {
                        handle.join().unwrap_or_else(|_| {
                            chunk
                                .iter()
                                .map(|page| {
                                    (
                                        page.index,
                                        Err(ProcessError::Recognition {
                                            page: page.index + 1,
                                            reason: "recognition worker panicked".to_string(),
                                        }),
                                    )
                                })
                                .collect()
                        })
                    })
                    .collect()
            });

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }

    /// A page whose recognition failed: no text and, when fragments are
    /// merged, an image-only page so the page count is kept.
    fn degraded_page(
        &self,
        image: &PageImage,
        work_directory: &Path,
    ) -> Result<RecognizedPage, PipelineError> {
        let fragment = if self.config.strategy.wants_fragments() {
            let path = work_directory.join(format!("degraded-{}.pdf", image.index + 1));
            processor::image_page_pdf(&image.path, self.config.rasterizer.dpi, &path)?;
            Some(path)
        } else {
            None
        };

        Ok(RecognizedPage {
            index: image.index,
            text: None,
            fragment,
        })
    }

    fn step_assemble(
        &self,
        ctx: &mut PipelineContext,
        work_directory: &Path,
    ) -> Result<(), PipelineError> {
        let assembled = work_directory.join("assembled.pdf");
        let page_count =
            processor::assemble(self.config.strategy, &ctx.recognized_pages, &assembled)?;

        if page_count != ctx.page_images.len() {
            return Err(PipelineError::PageCountMismatch {
                expected: ctx.page_images.len(),
                actual: page_count,
            });
        }

        ctx.assembled_pdf = Some(assembled);
        ctx.page_count = page_count;
        Ok(())
    }

    fn step_extract(&self, ctx: &mut PipelineContext) {
        let text = processor::joined_text(&ctx.recognized_pages);
        let record = self.extractor.extract(&text);
        debug!(
            "Extracted work_order={:?} assignee={}",
            record.work_order,
            record.assignee.as_str()
        );
        ctx.record = Some(record);
    }

    fn step_finalize(&self, ctx: &mut PipelineContext) -> Result<Finish, PipelineError> {
        let (Some(assembled), Some(record)) = (ctx.assembled_pdf.as_ref(), ctx.record.as_ref())
        else {
            return Err(PipelineError::Processing(ProcessError::PdfProcessing(
                "no assembled document to finalize".to_string(),
            )));
        };

        let filename = naming::document_filename(record);
        match self.storage.finalize(assembled, &filename) {
            Ok(output) => {
                debug!(
                    "Stored {} -> {}",
                    sanitize::redact_path(&ctx.job.source_path),
                    sanitize::redact_path(&output)
                );
                ctx.output_path = Some(output.clone());
                Ok(Finish::Completed {
                    output,
                    pages: ctx.page_count,
                })
            }
            Err(StorageError::RenameConflict { destination, .. }) => {
                let fallback = format!(
                    "{}_ocr.pdf",
                    sanitize::sanitize_component(&ctx.job.base_name)
                );
                let kept_at = self.storage.preserve(assembled, &fallback)?;
                warn!(
                    "{} already exists, kept document as {}",
                    sanitize::redact_path(&destination),
                    sanitize::redact_path(&kept_at)
                );
                ctx.output_path = Some(kept_at.clone());
                Ok(Finish::Conflict {
                    destination,
                    kept_at,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn remove_work_directory(&self, ctx: &mut PipelineContext) {
        let Some(work_directory) = ctx.work_directory.take() else {
            return;
        };

        if let Err(e) = std::fs::remove_dir_all(&work_directory) {
            warn!(
                "Failed to remove work directory {}: {}",
                sanitize::redact_path(&work_directory),
                e
            );
            ctx.warnings.push(PipelineWarning::CleanupFailed {
                path: work_directory.display().to_string(),
                error: e.to_string(),
            });
        }

        // Drop the shared .work parent once no other run is using it
        if let Some(parent) = work_directory.parent() {
            let _ = std::fs::remove_dir(parent);
        }
    }
}
