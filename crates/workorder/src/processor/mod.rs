pub mod assemble;
pub mod ocr;
pub mod rasterize;
pub mod render;

use std::path::{Path, PathBuf};

use crate::config::schema::{AssemblyStrategy, OcrConfig, OcrEngine};
use crate::error::ProcessError;
use crate::extractor::PAGE_BREAK;

pub use assemble::{assemble, image_page_pdf, merge_pdfs, write_text_pdf};
pub use ocr::{LeptessRecognizer, TesseractCli};
pub use rasterize::{count_pdf_pages, Pdftoppm};
pub use render::GhostPcl;

/// One rasterized page. `index` is 0-based reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub index: usize,
    pub path: PathBuf,
}

/// OCR output for the page with the same `index`.
///
/// `text == None` marks a page whose recognition failed and was degraded;
/// `Some("")` is a page that legitimately holds no text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizedPage {
    pub index: usize,
    pub text: Option<String>,
    /// Single-page searchable PDF, present in the full-fidelity strategy.
    pub fragment: Option<PathBuf>,
}

impl RecognizedPage {
    pub fn is_degraded(&self) -> bool {
        self.text.is_none()
    }
}

/// Converts a PCL source into an image-backed PDF.
pub trait Renderer: Send + Sync {
    fn render(&self, source: &Path, output: &Path) -> Result<(), ProcessError>;
}

/// Turns a PDF into ordered page images inside `output_dir`.
///
/// An empty list means the PDF had no pages or could not be read. A tool
/// that cannot be run, exits with an error or leaves a page without an
/// image is reported as [`ProcessError::Rasterize`].
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, pdf: &Path, output_dir: &Path) -> Result<Vec<PageImage>, ProcessError>;
}

/// Recognizes the text of one page image.
pub trait Recognizer: Send + Sync {
    fn recognize(
        &self,
        page: &PageImage,
        strategy: AssemblyStrategy,
    ) -> Result<RecognizedPage, ProcessError>;
}

pub fn build_recognizer(ocr: &OcrConfig) -> Box<dyn Recognizer> {
    match ocr.engine {
        OcrEngine::Cli => Box::new(TesseractCli::new(
            &ocr.program,
            &ocr.language,
            ocr.page_segmentation_mode,
        )),
        OcrEngine::Library => Box::new(LeptessRecognizer::new(
            &ocr.language,
            ocr.page_segmentation_mode,
        )),
    }
}

/// Concatenates page texts in page order. Degraded pages contribute an
/// empty section so later pages keep their position.
pub fn joined_text(pages: &[RecognizedPage]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(PAGE_BREAK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(index: usize, text: Option<&str>) -> RecognizedPage {
        RecognizedPage {
            index,
            text: text.map(str::to_string),
            fragment: None,
        }
    }

    #[test]
    fn test_joined_text_keeps_page_order() {
        let pages = vec![page(0, Some("first")), page(1, Some("second"))];
        assert_eq!(joined_text(&pages), format!("first{}second", PAGE_BREAK));
    }

    #[test]
    fn test_joined_text_degraded_page_keeps_slot() {
        let pages = vec![page(0, Some("a")), page(1, None), page(2, Some("c"))];
        assert_eq!(
            joined_text(&pages),
            format!("a{}{}c", PAGE_BREAK, PAGE_BREAK)
        );
    }

    #[test]
    fn test_degraded_is_distinct_from_empty() {
        assert!(page(0, None).is_degraded());
        assert!(!page(0, Some("")).is_degraded());
    }

    #[test]
    fn test_build_recognizer_for_each_engine() {
        let cli = OcrConfig::default();
        let _ = build_recognizer(&cli);

        let library = OcrConfig {
            engine: OcrEngine::Library,
            ..OcrConfig::default()
        };
        let _ = build_recognizer(&library);
    }
}
