use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Docsense server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores document chunks.
    pub qdrant_url: String,
    /// Name of the Qdrant collection used for document storage.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Base URL of the Ollama runtime backing both oracles.
    pub ollama_url: Option<String>,
    /// Chat model identifier used for all generation calls.
    pub chat_model: String,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Optional override for the chunk window length in characters.
    pub chunk_size: Option<usize>,
    /// Optional override for the chunk overlap in characters.
    pub chunk_overlap: Option<usize>,
    /// Number of passages returned by similarity search.
    pub search_limit: Option<usize>,
    /// Minimum similarity score accepted from the index.
    pub search_score_threshold: Option<f32>,
    /// Restrict Q&A retrieval to the document being asked about.
    pub qa_scope_to_document: bool,
    /// Per-call timeout applied to generation and embedding requests.
    pub oracle_timeout_secs: Option<u64>,
    /// Path of the SQLite file holding the analysis history.
    pub history_db_path: Option<String>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Default chunk window length, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between adjacent chunk windows, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
/// Default number of passages retrieved per search.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;
/// Default per-call oracle timeout, in seconds.
pub const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 120;
/// Default location of the analysis history database.
pub const DEFAULT_HISTORY_DB_PATH: &str = "logs/analyses.db";

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_collection_name: load_env("QDRANT_COLLECTION_NAME")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            ollama_url: load_env_optional("OLLAMA_URL"),
            chat_model: load_env("CHAT_MODEL")?,
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: load_env("EMBEDDING_DIMENSION")?
                .parse()
                .map_err(|_| ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()))?,
            chunk_size: parse_optional("CHUNK_SIZE")?,
            chunk_overlap: parse_optional("CHUNK_OVERLAP")?,
            search_limit: parse_optional("SEARCH_LIMIT")?,
            search_score_threshold: parse_optional("SEARCH_SCORE_THRESHOLD")?,
            qa_scope_to_document: load_env_optional("QA_SCOPE_TO_DOCUMENT")
                .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            oracle_timeout_secs: parse_optional("ORACLE_TIMEOUT_SECS")?,
            history_db_path: load_env_optional("HISTORY_DB_PATH"),
            server_port: parse_optional("SERVER_PORT")?,
        })
    }

    /// Effective chunk window length after applying defaults.
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE).max(1)
    }

    /// Effective chunk overlap, always strictly smaller than the window.
    pub fn effective_chunk_overlap(&self) -> usize {
        let size = self.effective_chunk_size();
        self.chunk_overlap
            .unwrap_or(DEFAULT_CHUNK_OVERLAP)
            .min(size.saturating_sub(1))
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        chat_model = %config.chat_model,
        embedding_model = %config.embedding_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        qdrant_url: "http://127.0.0.1:6333".into(),
        qdrant_collection_name: "documents".into(),
        qdrant_api_key: None,
        ollama_url: None,
        chat_model: "llama3".into(),
        embedding_model: "nomic-embed-text".into(),
        embedding_dimension: 768,
        chunk_size: None,
        chunk_overlap: None,
        search_limit: None,
        search_score_threshold: None,
        qa_scope_to_document: false,
        oracle_timeout_secs: None,
        history_db_path: None,
        server_port: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_never_reaches_window_size() {
        let config = Config {
            chunk_size: Some(100),
            chunk_overlap: Some(500),
            ..test_config()
        };
        assert_eq!(config.effective_chunk_size(), 100);
        assert_eq!(config.effective_chunk_overlap(), 99);
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = test_config();
        assert_eq!(config.effective_chunk_size(), DEFAULT_CHUNK_SIZE);
        assert_eq!(config.effective_chunk_overlap(), DEFAULT_CHUNK_OVERLAP);
    }
}
