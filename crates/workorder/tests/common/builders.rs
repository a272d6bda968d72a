//! Builders for configs and PDF fixtures.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use workorder::config::{
    AssemblyStrategy, Config, OcrConfig, RasterizerConfig, RecognitionPolicy, RendererConfig,
};
use workorder::processor::write_text_pdf;

/// Builder for `Config` values with test-friendly defaults.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config {
                version: "1.0".to_string(),
                input_directory: "/tmp/workorders/in".to_string(),
                output_directory: "/tmp/workorders/out".to_string(),
                worker_count: 1,
                strategy: AssemblyStrategy::FullFidelity,
                renderer: RendererConfig::default(),
                rasterizer: RasterizerConfig::default(),
                ocr: OcrConfig::default(),
                assignees: vec!["David Morancie".to_string(), "Ana Lopez".to_string()],
            },
        }
    }

    pub fn directories(mut self, input: &Path, output: &Path) -> Self {
        self.config.input_directory = input.to_string_lossy().to_string();
        self.config.output_directory = output.to_string_lossy().to_string();
        self
    }

    pub fn worker_count(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    pub fn strategy(mut self, strategy: AssemblyStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn on_failure(mut self, policy: RecognitionPolicy) -> Self {
        self.config.ocr.on_failure = policy;
        self
    }

    pub fn page_workers(mut self, count: usize) -> Self {
        self.config.ocr.page_workers = count;
        self
    }

    pub fn rasterizer_program(mut self, program: &str) -> Self {
        self.config.rasterizer.program = program.to_string();
        self
    }

    pub fn assignees(mut self, names: &[&str]) -> Self {
        self.config.assignees = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }

    pub fn to_json(self) -> String {
        serde_json::to_string_pretty(&self.config).expect("config serializes")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes a text-layer PDF with one page per entry.
pub fn pdf_fixture(dir: &Path, name: &str, pages: &[&str]) -> PathBuf {
    let path = dir.join(name);
    write_text_pdf(pages, &path).expect("fixture PDF is written");
    path
}

/// A typical two-page work order in the fake one-line-per-page format.
pub fn work_order_pages(number: &str, description: &str, assignee: &str) -> Vec<String> {
    vec![
        format!("Work Order {} {}", number, description),
        format!("Location Building 4 Assigned To {}", assignee),
    ]
}
