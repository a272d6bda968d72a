use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub input_directory: String,
    pub output_directory: String,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default)]
    pub strategy: AssemblyStrategy,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub rasterizer: RasterizerConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    /// Personnel names accepted as the document assignee.
    #[serde(default)]
    pub assignees: Vec<String>,
}

fn default_worker_count() -> usize {
    1
}

/// Selects both the OCR output shape and how the final document is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyStrategy {
    /// Per-page searchable PDFs (image layer + invisible text) merged in order.
    #[default]
    FullFidelity,
    /// Recognized text written onto fresh blank pages, no image layer.
    TextOnly,
}

impl AssemblyStrategy {
    pub fn wants_fragments(self) -> bool {
        matches!(self, AssemblyStrategy::FullFidelity)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssemblyStrategy::FullFidelity => "full_fidelity",
            AssemblyStrategy::TextOnly => "text_only",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    #[serde(default = "default_renderer_program")]
    pub program: String,
    #[serde(default = "default_renderer_device")]
    pub device: String,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_renderer_program() -> String {
    if cfg!(windows) {
        "gpcl6win64".to_string()
    } else {
        "gpcl6".to_string()
    }
}

fn default_renderer_device() -> String {
    "pdfwrite".to_string()
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: default_renderer_program(),
            device: default_renderer_device(),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterizerConfig {
    #[serde(default = "default_rasterizer_program")]
    pub program: String,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

fn default_rasterizer_program() -> String {
    "pdftoppm".to_string()
}

fn default_dpi() -> u32 {
    400
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self {
            program: default_rasterizer_program(),
            dpi: default_dpi(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngine {
    /// The `tesseract` executable; supports searchable PDF output.
    #[default]
    Cli,
    /// In-process Tesseract through leptess; text only.
    Library,
}

/// What to do when the recognizer fails on a single page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionPolicy {
    #[default]
    Abort,
    Degrade,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default)]
    pub engine: OcrEngine,
    #[serde(default = "default_ocr_program")]
    pub program: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_psm")]
    pub page_segmentation_mode: u8,
    #[serde(default = "default_page_workers")]
    pub page_workers: usize,
    #[serde(default)]
    pub on_failure: RecognitionPolicy,
}

fn default_ocr_program() -> String {
    "tesseract".to_string()
}

fn default_language() -> String {
    "eng".to_string()
}

/// Tesseract PSM 6: a single uniform block of text.
fn default_psm() -> u8 {
    6
}

fn default_page_workers() -> usize {
    1
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: OcrEngine::default(),
            program: default_ocr_program(),
            language: default_language(),
            page_segmentation_mode: default_psm(),
            page_workers: default_page_workers(),
            on_failure: RecognitionPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_serde_names() {
        let s: AssemblyStrategy = serde_json::from_str("\"text_only\"").unwrap();
        assert_eq!(s, AssemblyStrategy::TextOnly);
        assert_eq!(
            serde_json::to_string(&AssemblyStrategy::FullFidelity).unwrap(),
            "\"full_fidelity\""
        );
    }

    #[test]
    fn test_only_full_fidelity_wants_fragments() {
        assert!(AssemblyStrategy::FullFidelity.wants_fragments());
        assert!(!AssemblyStrategy::TextOnly.wants_fragments());
    }

    #[test]
    fn test_ocr_defaults() {
        let ocr = OcrConfig::default();
        assert_eq!(ocr.engine, OcrEngine::Cli);
        assert_eq!(ocr.language, "eng");
        assert_eq!(ocr.page_segmentation_mode, 6);
        assert_eq!(ocr.on_failure, RecognitionPolicy::Abort);
    }

    #[test]
    fn test_rasterizer_defaults_to_400_dpi() {
        assert_eq!(RasterizerConfig::default().dpi, 400);
    }
}
