use std::path::PathBuf;

use crate::config::schema::{AssemblyStrategy, OcrConfig, RasterizerConfig, RendererConfig};
use crate::config::Config;
use crate::extractor::KnownAssignees;

/// Runtime settings shared read-only by every pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_directory: PathBuf,
    pub output_directory: PathBuf,
    pub worker_count: usize,
    pub strategy: AssemblyStrategy,
    pub renderer: RendererConfig,
    pub rasterizer: RasterizerConfig,
    pub ocr: OcrConfig,
    pub assignees: KnownAssignees,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            input_directory: PathBuf::from(&config.input_directory),
            output_directory: PathBuf::from(&config.output_directory),
            worker_count: config.worker_count.max(1),
            strategy: config.strategy,
            renderer: config.renderer.clone(),
            rasterizer: config.rasterizer.clone(),
            ocr: config.ocr.clone(),
            assignees: KnownAssignees::new(&config.assignees),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    #[test]
    fn test_from_config_carries_settings() {
        let config = load_config_from_str(
            r#"{
                "version": "1.0",
                "input_directory": "/in",
                "output_directory": "/out",
                "worker_count": 3,
                "strategy": "text_only",
                "assignees": ["David Morancie", "Ann  Lee"]
            }"#,
        )
        .unwrap();

        let pipeline_config = PipelineConfig::from_config(&config);

        assert_eq!(pipeline_config.input_directory, PathBuf::from("/in"));
        assert_eq!(pipeline_config.output_directory, PathBuf::from("/out"));
        assert_eq!(pipeline_config.worker_count, 3);
        assert_eq!(pipeline_config.strategy, AssemblyStrategy::TextOnly);
        assert_eq!(pipeline_config.rasterizer.dpi, 400);
        assert_eq!(pipeline_config.assignees.len(), 2);
        assert_eq!(pipeline_config.assignees.find("Ann Lee"), Some("Ann Lee"));
    }
}
