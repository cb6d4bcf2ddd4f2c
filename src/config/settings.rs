//! Configuration settings for Pensum.

use crate::error::{PensumError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Keys backed by `Option<String>` fields. An empty value unsets them.
const OPTIONAL_STRING_KEYS: &[&str] = &["prompts.custom_dir"];

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub vector_store: VectorStoreSettings,
    pub assistant: AssistantSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory holding course documents to ingest.
    pub docs_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.pensum".to_string(),
            docs_dir: "./docs".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Embedding provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// OpenAI embeddings API (default).
    #[default]
    OpenAI,
    /// Local feature-hashing embedder. Needs no API key; lexical matching only.
    Hashing,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(EmbeddingProvider::OpenAI),
            "hashing" | "local" => Ok(EmbeddingProvider::Hashing),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::OpenAI => write!(f, "openai"),
            EmbeddingProvider::Hashing => write!(f, "hashing"),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai, hashing).
    pub provider: EmbeddingProvider,
    /// Embedding model to use (openai provider only).
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAI,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Course document chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Characters of trailing sentences repeated at the start of the next chunk.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

/// Vector store provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// SQLite database on disk (default).
    #[default]
    Sqlite,
    /// In-process store, lost on exit.
    Memory,
}

impl std::str::FromStr for VectorStoreProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(VectorStoreProvider::Sqlite),
            "memory" => Ok(VectorStoreProvider::Memory),
            _ => Err(format!("Unknown vector store provider: {}", s)),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: VectorStoreProvider,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
    /// Maximum number of fragments returned by one content search.
    pub max_results: usize,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::Sqlite,
            sqlite_path: "~/.pensum/courses.db".to_string(),
            max_results: 5,
        }
    }
}

/// Settings for the tool-using assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    /// LLM model for answers and tool selection.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens per model reply.
    pub max_tokens: u32,
    /// Maximum tool-capable model calls per question before a forced final answer.
    pub max_rounds: usize,
    /// Number of previous exchanges kept per session.
    pub max_history: usize,
    /// Live sessions kept in memory; the least recently used is dropped past this.
    pub max_sessions: usize,
    /// Timeout in seconds for each model call.
    pub timeout_seconds: u64,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 800,
            max_rounds: 2,
            max_history: 2,
            max_sessions: crate::session::DEFAULT_MAX_SESSIONS,
            timeout_seconds: crate::openai::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Ingest `general.docs_dir` when the server starts.
    pub load_docs_on_startup: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            load_docs_on_startup: true,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Check that every option holds a usable value.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(PensumError::Config(
                "chunking.chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(PensumError::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.vector_store.max_results == 0 {
            return Err(PensumError::Config(
                "vector_store.max_results must be greater than 0".to_string(),
            ));
        }
        if self.assistant.max_rounds == 0 {
            return Err(PensumError::Config(
                "assistant.max_rounds must be at least 1".to_string(),
            ));
        }
        if self.assistant.max_sessions == 0 {
            return Err(PensumError::Config(
                "assistant.max_sessions must be greater than 0".to_string(),
            ));
        }
        if self.assistant.timeout_seconds == 0 {
            return Err(PensumError::Config(
                "assistant.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.embedding.dimensions == 0 {
            return Err(PensumError::Config(
                "embedding.dimensions must be greater than 0".to_string(),
            ));
        }
        if self.assistant.model.trim().is_empty() {
            return Err(PensumError::Config("assistant.model must not be empty".to_string()));
        }
        Ok(())
    }

    /// Apply a `section.key = value` override, as used by `pensum config set`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let mut doc: toml::Value = toml::Value::try_from(&*self)
            .map_err(|e| PensumError::Config(e.to_string()))?;

        let (section, field) = key
            .split_once('.')
            .ok_or_else(|| PensumError::Config(format!("Expected 'section.key', got '{}'", key)))?;

        let table = doc
            .get_mut(section)
            .and_then(|s| s.as_table_mut())
            .ok_or_else(|| PensumError::Config(format!("Unknown config section: {}", section)))?;

        // Unset optional keys are left out of the serialized table.
        if OPTIONAL_STRING_KEYS.contains(&key) {
            if value.is_empty() {
                table.remove(field);
            } else {
                table.insert(field.to_string(), toml::Value::String(value.to_string()));
            }
            return self.replace_with(doc);
        }

        let current = table
            .get(field)
            .ok_or_else(|| PensumError::Config(format!("Unknown config key: {}", key)))?;

        let parsed = match current {
            toml::Value::Integer(_) => value
                .parse::<i64>()
                .map(toml::Value::Integer)
                .map_err(|_| PensumError::Config(format!("{} expects an integer", key)))?,
            toml::Value::Float(_) => value
                .parse::<f64>()
                .map(toml::Value::Float)
                .map_err(|_| PensumError::Config(format!("{} expects a number", key)))?,
            toml::Value::Boolean(_) => value
                .parse::<bool>()
                .map(toml::Value::Boolean)
                .map_err(|_| PensumError::Config(format!("{} expects true or false", key)))?,
            _ => toml::Value::String(value.to_string()),
        };
        table.insert(field.to_string(), parsed);
        self.replace_with(doc)
    }

    fn replace_with(&mut self, doc: toml::Value) -> Result<()> {
        let updated: Settings = doc
            .try_into()
            .map_err(|e: toml::de::Error| PensumError::Config(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PensumError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pensum")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded course documents directory path.
    pub fn docs_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.docs_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.chunking.chunk_size, 800);
        assert_eq!(settings.chunking.chunk_overlap, 100);
        assert_eq!(settings.vector_store.max_results, 5);
        assert_eq!(settings.assistant.max_rounds, 2);
        assert_eq!(settings.assistant.max_history, 2);
        assert_eq!(settings.assistant.max_sessions, 1000);
    }

    #[test]
    fn test_validate_rejects_overlap_not_below_chunk_size() {
        let mut settings = Settings::default();
        settings.chunking.chunk_overlap = 800;
        assert!(matches!(settings.validate(), Err(PensumError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_round_budget() {
        let mut settings = Settings::default();
        settings.assistant.max_rounds = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [assistant]
            max_rounds = 3

            [embedding]
            provider = "hashing"
            dimensions = 256
            "#,
        )
        .unwrap();

        assert_eq!(settings.assistant.max_rounds, 3);
        assert_eq!(settings.assistant.model, "gpt-4o-mini");
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Hashing);
        assert_eq!(settings.vector_store.provider, VectorStoreProvider::Sqlite);
    }

    #[test]
    fn test_load_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[vector_store]\nmax_results = 0\n").unwrap();

        assert!(Settings::load_from(Some(&path)).is_err());
    }

    #[test]
    fn test_set_value_on_unset_optional_key() {
        let mut settings = Settings::default();
        assert_eq!(settings.prompts.custom_dir, None);

        settings.set_value("prompts.custom_dir", "/tmp/p").unwrap();
        assert_eq!(settings.prompts.custom_dir.as_deref(), Some("/tmp/p"));

        settings.set_value("prompts.custom_dir", "").unwrap();
        assert_eq!(settings.prompts.custom_dir, None);

        assert!(settings.set_value("prompts.other_dir", "/tmp/p").is_err());
    }

    #[test]
    fn test_set_value_updates_typed_fields() {
        let mut settings = Settings::default();
        settings.set_value("assistant.max_rounds", "4").unwrap();
        settings.set_value("assistant.model", "gpt-4.1").unwrap();
        settings.set_value("server.load_docs_on_startup", "false").unwrap();

        assert_eq!(settings.assistant.max_rounds, 4);
        assert_eq!(settings.assistant.model, "gpt-4.1");
        assert!(!settings.server.load_docs_on_startup);

        assert!(settings.set_value("assistant.max_rounds", "many").is_err());
        assert!(settings.set_value("nope.key", "1").is_err());
        assert!(settings.set_value("assistant.max_rounds", "0").is_err());
        assert_eq!(settings.assistant.max_rounds, 4);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.vector_store.max_results = 7;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.vector_store.max_results, 7);
    }
}
