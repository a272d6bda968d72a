use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use crate::config::schema::AssemblyStrategy;
use crate::error::ProcessError;
use crate::processor::{PageImage, RecognizedPage, Recognizer};

/// The `tesseract` executable. Emits `<base>.txt` and, for full-fidelity
/// runs, a searchable single-page `<base>.pdf` next to the page image.
pub struct TesseractCli {
    program: String,
    language: String,
    psm: u8,
}

impl TesseractCli {
    pub fn new(program: &str, language: &str, psm: u8) -> Self {
        Self {
            program: program.to_string(),
            language: language.to_string(),
            psm,
        }
    }

    fn args(&self, image: &Path, output_base: &Path, strategy: AssemblyStrategy) -> Vec<String> {
        let mut args = vec![
            image.display().to_string(),
            output_base.display().to_string(),
            "-l".to_string(),
            self.language.clone(),
            "--psm".to_string(),
            self.psm.to_string(),
            "txt".to_string(),
        ];
        if strategy.wants_fragments() {
            args.push("pdf".to_string());
        }
        args
    }
}

impl Recognizer for TesseractCli {
    fn recognize(
        &self,
        page: &PageImage,
        strategy: AssemblyStrategy,
    ) -> Result<RecognizedPage, ProcessError> {
        let _span = tracing::info_span!("processor.ocr", page = page.index + 1).entered();
        let page_num = page.index + 1;

        // tesseract appends the extension itself
        let output_base = page.path.with_extension("");
        let args = self.args(&page.path, &output_base, strategy);
        log::debug!("Running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| ProcessError::Recognition {
                page: page_num,
                reason: format!(
                    "failed to run {}: {}. Make sure tesseract is installed.",
                    self.program, e
                ),
            })?;

        if !output.status.success() {
            return Err(ProcessError::Recognition {
                page: page_num,
                reason: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let text = take_text_output(&output_base.with_extension("txt"), page_num)?;

        let fragment = if strategy.wants_fragments() {
            let fragment_path: PathBuf = output_base.with_extension("pdf");
            if !fragment_path.exists() {
                return Err(ProcessError::Recognition {
                    page: page_num,
                    reason: format!("no searchable PDF written at {}", fragment_path.display()),
                });
            }
            Some(fragment_path)
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

/// Reads the `.txt` tesseract wrote for a page, then deletes it.
fn take_text_output(text_path: &Path, page_num: usize) -> Result<String, ProcessError> {
    let text = std::fs::read_to_string(text_path).map_err(|e| ProcessError::Recognition {
        page: page_num,
        reason: format!("failed to read {}: {}", text_path.display(), e),
    })?;
    if let Err(e) = std::fs::remove_file(text_path) {
        log::debug!("Failed to remove {}: {}", text_path.display(), e);
    }
    Ok(text)
}

/// In-process Tesseract through leptess. Produces text only.
#[derive(Clone)]
pub struct LeptessRecognizer {
    inner: Arc<LeptessInner>,
}

struct LeptessInner {
    language: String,
    psm: u8,
}

impl LeptessRecognizer {
    pub fn new(language: &str, psm: u8) -> Self {
        let language = if language.is_empty() {
            "eng".to_string()
        } else {
            language.to_string()
        };

        Self {
            inner: Arc::new(LeptessInner { language, psm }),
        }
    }

    pub fn recognize_image(&self, image_path: &Path) -> Result<String, ProcessError> {
        self.recognize_image_bytes(&std::fs::read(image_path).map_err(|e| {
            ProcessError::ReadDocument {
                path: image_path.to_path_buf(),
                source: e,
            }
        })?)
    }

    pub fn recognize_image_bytes(&self, image_data: &[u8]) -> Result<String, ProcessError> {
        let img = image::load_from_memory(image_data)
            .map_err(|e| ProcessError::ImageProcessing(format!("Failed to load image: {}", e)))?;

        // leptess wants an encoded image, re-encode as PNG in memory
        let mut png_data = Vec::new();
        let mut cursor = Cursor::new(&mut png_data);
        img.write_to(&mut cursor, image::ImageFormat::Png)
            .map_err(|e| ProcessError::ImageProcessing(format!("Failed to convert image: {}", e)))?;

        let mut lt = leptess::LepTess::new(None, &self.inner.language).map_err(|e| {
            ProcessError::ImageProcessing(format!("Failed to initialize Tesseract: {}", e))
        })?;

        lt.set_variable(
            leptess::Variable::TesseditPagesegMode,
            &self.inner.psm.to_string(),
        )
        .map_err(|e| {
            ProcessError::ImageProcessing(format!("Failed to set page segmentation mode: {}", e))
        })?;

        lt.set_image_from_mem(&png_data)
            .map_err(|e| ProcessError::ImageProcessing(format!("Failed to set image for OCR: {}", e)))?;

        lt.get_utf8_text()
            .map_err(|e| ProcessError::ImageProcessing(format!("OCR failed: {}", e)))
    }
}

impl Recognizer for LeptessRecognizer {
    fn recognize(
        &self,
        page: &PageImage,
        strategy: AssemblyStrategy,
    ) -> Result<RecognizedPage, ProcessError> {
        let _span = tracing::info_span!("processor.ocr", page = page.index + 1).entered();
        let page_num = page.index + 1;

        if strategy.wants_fragments() {
            return Err(ProcessError::Recognition {
                page: page_num,
                reason: "the library engine cannot produce searchable PDF pages".to_string(),
            });
        }

        let text = self
            .recognize_image(&page.path)
            .map_err(|e| ProcessError::Recognition {
                page: page_num,
                reason: e.to_string(),
            })?;

        Ok(RecognizedPage {
            index: page.index,
            text: Some(text),
            fragment: None,
        })
    }
}
