use std::collections::HashSet;
use std::path::Path;

use crate::config::schema::{AssemblyStrategy, Config, OcrEngine};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

const MIN_DPI: u32 = 72;
const MAX_DPI: u32 = 1200;
const MAX_PSM: u8 = 13;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();

    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be at least 1".to_string(),
        });
    }

    let dpi = config.rasterizer.dpi;
    if !(MIN_DPI..=MAX_DPI).contains(&dpi) {
        return Err(ConfigError::Validation {
            message: format!(
                "rasterizer.dpi must be between {} and {}, got {}",
                MIN_DPI, MAX_DPI, dpi
            ),
        });
    }

    if config.ocr.page_segmentation_mode > MAX_PSM {
        return Err(ConfigError::Validation {
            message: format!(
                "ocr.page_segmentation_mode must be 0-{}, got {}",
                MAX_PSM, config.ocr.page_segmentation_mode
            ),
        });
    }

    if config.ocr.page_workers == 0 {
        return Err(ConfigError::Validation {
            message: "ocr.page_workers must be at least 1".to_string(),
        });
    }

    let language = &config.ocr.language;
    if language.is_empty()
        || !language
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == '_' || c == '+')
    {
        return Err(ConfigError::Validation {
            message: format!("Invalid OCR language code: '{}'", language),
        });
    }

    if config.ocr.engine == OcrEngine::Library && config.strategy == AssemblyStrategy::FullFidelity
    {
        return Err(ConfigError::Validation {
            message: "ocr.engine 'library' produces text only; use strategy 'text_only' or engine 'cli'"
                .to_string(),
        });
    }

    validate_assignees(&config.assignees)?;

    Ok(())
}

fn validate_assignees(assignees: &[String]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in assignees {
        let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return Err(ConfigError::InvalidAssignees {
                reason: "assignee names must not be blank".to_string(),
            });
        }
        if !seen.insert(normalized.clone()) {
            return Err(ConfigError::InvalidAssignees {
                reason: format!("duplicate assignee '{}'", normalized),
            });
        }
    }
    Ok(())
}
