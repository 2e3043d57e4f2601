use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::embedding::DEFAULT_DIMENSION;
use crate::error::ConfigError;
use crate::jobs::DEFAULT_KEY_PREFIX;

/// Prefix marking a value that names an environment variable.
const ENV_PREFIX: &str = "env:";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub vector_index: VectorIndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub connect: ConnectConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            store: StoreConfig::default(),
            vector_index: VectorIndexConfig::default(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            connect: ConnectConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// SQLite file; defaults to the per-user data directory.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: None,
            key_prefix: default_key_prefix(),
        }
    }
}

impl StoreConfig {
    /// Falls back to `jobs.db` in the working directory when no home
    /// directory is known.
    pub fn database_path(&self) -> PathBuf {
        match self.path {
            Some(ref path) => PathBuf::from(path),
            None => crate::db::default_database_path()
                .unwrap_or_else(|| PathBuf::from("jobs.db")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Memory,
    Qdrant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorIndexConfig {
    #[serde(default)]
    pub backend: VectorBackend,
    #[serde(default)]
    pub url: Option<String>,
    /// Literal key, or `env:NAME` to read it from the environment.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_collection() -> String {
    "personal_gpt_collection".to_string()
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::default(),
            url: None,
            api_key: None,
            collection: default_collection(),
        }
    }
}

impl VectorIndexConfig {
    /// The API key with any `env:` reference resolved. Empty means none.
    pub fn resolve_api_key(&self) -> Result<Option<String>, ConfigError> {
        let Some(ref raw) = self.api_key else {
            return Ok(None);
        };

        let value = match raw.strip_prefix(ENV_PREFIX) {
            Some(name) => std::env::var(name)
                .map_err(|_| ConfigError::EnvVarNotSet {
                    name: name.to_string(),
                })?
                .trim()
                .to_string(),
            None => raw.clone(),
        };

        Ok(if value.is_empty() { None } else { Some(value) })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingConfig {
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
        }
    }
}

/// Startup connection retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,
}

fn default_attempts() -> u32 {
    10
}

fn default_wait_secs() -> u64 {
    5
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            wait_secs: default_wait_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "context_engine=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_api_key() {
        let config = VectorIndexConfig {
            api_key: Some("secret".into()),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key().unwrap().as_deref(), Some("secret"));
    }

    #[test]
    fn test_env_api_key() {
        std::env::set_var("CONTEXT_ENGINE_TEST_QDRANT_KEY", " from-env \n");
        let config = VectorIndexConfig {
            api_key: Some("env:CONTEXT_ENGINE_TEST_QDRANT_KEY".into()),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_api_key().unwrap().as_deref(),
            Some("from-env")
        );
        std::env::remove_var("CONTEXT_ENGINE_TEST_QDRANT_KEY");
    }

    #[test]
    fn test_missing_env_api_key() {
        let config = VectorIndexConfig {
            api_key: Some("env:CONTEXT_ENGINE_TEST_UNSET_KEY".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.resolve_api_key(),
            Err(ConfigError::EnvVarNotSet { .. })
        ));
    }

    #[test]
    fn test_empty_api_key_is_none() {
        let config = VectorIndexConfig {
            api_key: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key().unwrap(), None);
    }

    #[test]
    fn test_explicit_store_path() {
        let config = StoreConfig {
            path: Some("/tmp/jobs.db".into()),
            ..Default::default()
        };
        assert_eq!(config.database_path(), PathBuf::from("/tmp/jobs.db"));
    }
}
