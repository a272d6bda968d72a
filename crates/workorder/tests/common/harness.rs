//! Isolated environment for running batches end to end.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use workorder::config::Config;
use workorder::worker::PipelineFactory;
use workorder::{BatchReport, BatchRunner, Pipeline, PipelineConfig};

use super::fakes::{LineRasterizer, SelectiveRenderer, TextRecognizer};

pub struct TestHarness {
    temp_dir: TempDir,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let input_dir = temp_dir.path().join("input");
        let output_dir = temp_dir.path().join("output");

        std::fs::create_dir_all(&input_dir).expect("Failed to create input dir");
        std::fs::create_dir_all(&output_dir).expect("Failed to create output dir");

        Self {
            temp_dir,
            input_dir,
            output_dir,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes a fake PCL source, one line per page.
    pub fn write_work_order<S: AsRef<str>>(&self, filename: &str, pages: &[S]) -> PathBuf {
        let path = self.input_dir.join(filename);
        let content: Vec<&str> = pages.iter().map(|p| p.as_ref()).collect();
        std::fs::write(&path, content.join("\n")).expect("Failed to write work order");
        path
    }

    /// Writes `config` as JSON next to the input and output directories.
    pub fn write_config(&self, config: &Config) -> PathBuf {
        let path = self.temp_dir.path().join("workorder.json");
        let json = serde_json::to_string_pretty(config).expect("Failed to serialize config");
        std::fs::write(&path, json).expect("Failed to write config file");
        path
    }

    pub fn pipeline_config(&self, config: &Config) -> Arc<PipelineConfig> {
        Arc::new(PipelineConfig::from_config(config))
    }

    /// Pipelines built on the fake adapters.
    pub fn fake_factory(config: Arc<PipelineConfig>) -> PipelineFactory {
        Arc::new(move || {
            Pipeline::new(
                Arc::clone(&config),
                Box::new(SelectiveRenderer),
                Box::new(LineRasterizer),
                Box::new(TextRecognizer::default()),
            )
        })
    }

    /// Runs the whole input directory with fake adapters.
    pub fn run_batch(&self, config: &Config) -> BatchReport {
        let pipeline_config = self.pipeline_config(config);
        let factory = Self::fake_factory(Arc::clone(&pipeline_config));
        BatchRunner::with_factory(pipeline_config, factory)
            .run()
            .expect("batch runs")
    }

    /// File names directly inside the output directory, sorted.
    pub fn output_files(&self) -> Vec<String> {
        let mut names: Vec<String> = walkdir::WalkDir::new(&self.output_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn page_count(&self, filename: &str) -> usize {
        lopdf::Document::load(self.output_dir.join(filename))
            .expect("output is a readable PDF")
            .get_pages()
            .len()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_creates_directories() {
        let harness = TestHarness::new();

        assert!(harness.input_dir.exists());
        assert!(harness.output_dir.exists());
    }

    #[test]
    fn test_write_work_order() {
        let harness = TestHarness::new();
        let path = harness.write_work_order("a.pcl", &["one", "two"]);

        assert_eq!(std::fs::read_to_string(path).unwrap(), "one\ntwo");
    }
}
