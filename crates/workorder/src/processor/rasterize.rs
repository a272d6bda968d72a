use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::schema::RasterizerConfig;
use crate::error::ProcessError;
use crate::processor::{PageImage, PageRasterizer};

/// Rasterizes PDFs with poppler's `pdftoppm`.
pub struct Pdftoppm {
    program: String,
    dpi: u32,
}

impl Pdftoppm {
    pub fn new(config: &RasterizerConfig) -> Self {
        Self {
            program: config.program.clone(),
            dpi: config.dpi,
        }
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    fn try_rasterize(&self, pdf: &Path, output_dir: &Path) -> Result<Vec<PageImage>, ProcessError> {
        let page_count = match count_pdf_pages(pdf) {
            Ok(count) => count,
            Err(e) => {
                log::warn!("Cannot read {}: {}", pdf.display(), e);
                return Ok(Vec::new());
            }
        };
        if page_count == 0 {
            return Ok(Vec::new());
        }

        std::fs::create_dir_all(output_dir).map_err(|e| ProcessError::WorkDirectory {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

        let prefix = output_dir.join("page");
        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|e| ProcessError::Rasterize {
                path: pdf.to_path_buf(),
                reason: format!(
                    "failed to run {}: {}. Make sure poppler-utils is installed.",
                    self.program, e
                ),
            })?;

        if !output.status.success() {
            return Err(ProcessError::Rasterize {
                path: pdf.to_path_buf(),
                reason: format!(
                    "{} failed: {}",
                    self.program,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        (1..=page_count)
            .map(|page_num| {
                find_page_image(&prefix, page_num, page_count)
                    .map(|path| PageImage {
                        index: page_num - 1,
                        path,
                    })
                    .ok_or_else(|| ProcessError::Rasterize {
                        path: pdf.to_path_buf(),
                        reason: format!("no image produced for page {}", page_num),
                    })
            })
            .collect()
    }
}

impl PageRasterizer for Pdftoppm {
    fn rasterize(&self, pdf: &Path, output_dir: &Path) -> Result<Vec<PageImage>, ProcessError> {
        let _span = tracing::info_span!("processor.rasterize", dpi = self.dpi).entered();

        let pages = self.try_rasterize(pdf, output_dir)?;
        if pages.is_empty() {
            log::warn!("{} has no pages to rasterize", pdf.display());
        } else {
            log::debug!("Rasterized {} pages from {}", pages.len(), pdf.display());
        }
        Ok(pages)
    }
}

/// pdftoppm zero-pads page numbers to the width of the page count.
fn find_page_image(prefix: &Path, page_num: usize, page_count: usize) -> Option<PathBuf> {
    let width = page_count.to_string().len();
    let candidates = [
        format!("{}-{:0width$}.png", prefix.display(), page_num, width = width),
        format!("{}-{}.png", prefix.display(), page_num),
        format!("{}-{:02}.png", prefix.display(), page_num),
        format!("{}-{:03}.png", prefix.display(), page_num),
    ];

    candidates
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Page count of a PDF: lopdf first, `pdfinfo` when lopdf cannot parse it.
pub fn count_pdf_pages(pdf: &Path) -> Result<usize, ProcessError> {
    match lopdf::Document::load(pdf) {
        Ok(doc) => Ok(doc.get_pages().len()),
        Err(e) => {
            log::debug!(
                "lopdf failed to parse {}: {}. Falling back to pdfinfo.",
                pdf.display(),
                e
            );
            count_pages_with_pdfinfo(pdf)
        }
    }
}

fn count_pages_with_pdfinfo(pdf: &Path) -> Result<usize, ProcessError> {
    let output = Command::new("pdfinfo")
        .arg(pdf)
        .output()
        .map_err(|e| ProcessError::Rasterize {
            path: pdf.to_path_buf(),
            reason: format!(
                "failed to run pdfinfo: {}. Make sure poppler-utils is installed.",
                e
            ),
        })?;

    if !output.status.success() {
        return Err(ProcessError::Rasterize {
            path: pdf.to_path_buf(),
            reason: format!(
                "pdfinfo failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    parse_pdfinfo_pages(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        ProcessError::Rasterize {
            path: pdf.to_path_buf(),
            reason: "pdfinfo reported no page count".to_string(),
        }
    })
}

fn parse_pdfinfo_pages(stdout: &str) -> Option<usize> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix("Pages:"))
        .find_map(|count| count.trim().parse::<usize>().ok())
}
