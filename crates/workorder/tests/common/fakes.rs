//! Stand-ins for the external tools.
//!
//! A fake "PCL" source is plain text with one line per page. The renderer
//! copies it, the rasterizer writes each line to its own page file and the
//! recognizer reads the page file back as its text.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use workorder::config::AssemblyStrategy;
use workorder::processor::{
    write_text_pdf, PageImage, PageRasterizer, RecognizedPage, Recognizer, Renderer,
};
use workorder::ProcessError;

/// Marker that makes [`TextRecognizer`] fail the page.
pub const UNREADABLE: &str = "UNREADABLE";

pub struct CopyRenderer;

impl Renderer for CopyRenderer {
    fn render(&self, source: &Path, output: &Path) -> Result<(), ProcessError> {
        std::fs::copy(source, output).map_err(|e| ProcessError::ReadDocument {
            path: source.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}

/// Fails every source whose name contains "broken".
pub struct SelectiveRenderer;

impl Renderer for SelectiveRenderer {
    fn render(&self, source: &Path, output: &Path) -> Result<(), ProcessError> {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if name.contains("broken") {
            return Err(ProcessError::Render {
                path: source.to_path_buf(),
                status: "exit status: 1".to_string(),
            });
        }
        CopyRenderer.render(source, output)
    }
}

/// Writes a real text-layer PDF with one page per source line, for
/// driving the real rasterizer.
pub struct TextPdfRenderer;

impl Renderer for TextPdfRenderer {
    fn render(&self, source: &Path, output: &Path) -> Result<(), ProcessError> {
        let content = std::fs::read_to_string(source).map_err(|e| ProcessError::ReadDocument {
            path: source.to_path_buf(),
            source: e,
        })?;
        let pages: Vec<&str> = content.lines().collect();
        write_text_pdf(&pages, output)
    }
}

pub struct LineRasterizer;

impl PageRasterizer for LineRasterizer {
    fn rasterize(&self, pdf: &Path, output_dir: &Path) -> Result<Vec<PageImage>, ProcessError> {
        let Ok(content) = std::fs::read_to_string(pdf) else {
            return Ok(Vec::new());
        };
        std::fs::create_dir_all(output_dir).map_err(|e| ProcessError::WorkDirectory {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        content
            .lines()
            .enumerate()
            .map(|(index, line)| {
                let path = output_dir.join(format!("page-{:02}.png", index + 1));
                std::fs::write(&path, line).map_err(|e| ProcessError::Rasterize {
                    path: pdf.to_path_buf(),
                    reason: e.to_string(),
                })?;
                Ok(PageImage { index, path })
            })
            .collect()
    }
}

#[derive(Default)]
pub struct TextRecognizer {
    calls: Arc<AtomicUsize>,
}

impl TextRecognizer {
    /// A recognizer whose call count is observable through `calls`.
    pub fn counting(calls: Arc<AtomicUsize>) -> Self {
        Self { calls }
    }
}

impl Recognizer for TextRecognizer {
    fn recognize(
        &self,
        page: &PageImage,
        strategy: AssemblyStrategy,
    ) -> Result<RecognizedPage, ProcessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = std::fs::read_to_string(&page.path).map_err(|e| {
            ProcessError::Recognition {
                page: page.index + 1,
                reason: e.to_string(),
            }
        })?;
        if text.contains(UNREADABLE) {
            return Err(ProcessError::Recognition {
                page: page.index + 1,
                reason: "no text found".to_string(),
            });
        }

        let fragment = if strategy.wants_fragments() {
            let path = page.path.with_extension("pdf");
            write_text_pdf(&[text.as_str()], &path)?;
            Some(path)
        } else {
            None
        };

        Ok(RecognizedPage {
            index: page.index,
            text: Some(text),
            fragment,
        })
    }
}
