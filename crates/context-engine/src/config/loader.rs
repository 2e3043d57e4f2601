use std::path::Path;

use crate::chunking::TextSplitter;
use crate::config::schema::{Config, VectorBackend};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

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

pub(crate) fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    TextSplitter::new(config.chunking.chunk_size, config.chunking.chunk_overlap).map_err(
        |e| ConfigError::Validation {
            message: format!("Invalid chunking settings: {}", e),
        },
    )?;

    if config.embedding.dimension == 0 {
        return Err(ConfigError::Validation {
            message: "Embedding dimension must be greater than zero".to_string(),
        });
    }

    if config.vector_index.backend == VectorBackend::Qdrant && config.vector_index.url.is_none() {
        return Err(ConfigError::Validation {
            message: "vectorIndex.url is required for the qdrant backend".to_string(),
        });
    }

    if config.connect.attempts == 0 {
        return Err(ConfigError::Validation {
            message: "connect.attempts must be at least 1".to_string(),
        });
    }

    Ok(())
}
