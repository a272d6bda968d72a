use std::path::PathBuf;

use crate::extractor::ExtractedRecord;
use crate::processor::{PageImage, RecognizedPage};
use crate::worker::job::Job;

use super::error::PipelineWarning;

pub struct PipelineContext {
    // Input
    pub job: Job,

    // Scratch directory under <output>/.work, removed when the run ends
    pub work_directory: Option<PathBuf>,

    // Step 1 result
    pub rendered_pdf: Option<PathBuf>,

    // Step 2 result, empty means the document is skipped
    pub page_images: Vec<PageImage>,

    // Step 3 result, same length and order as page_images
    pub recognized_pages: Vec<RecognizedPage>,

    // Step 4 result
    pub assembled_pdf: Option<PathBuf>,
    pub page_count: usize,

    // Step 5 result
    pub record: Option<ExtractedRecord>,

    // Step 6 result
    pub output_path: Option<PathBuf>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineContext {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            work_directory: None,
            rendered_pdf: None,
            page_images: Vec::new(),
            recognized_pages: Vec::new(),
            assembled_pdf: None,
            page_count: 0,
            record: None,
            output_path: None,
            warnings: Vec::new(),
        }
    }
}
