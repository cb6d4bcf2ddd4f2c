//! Pre-flight checks before operations that call OpenAI.
//!
//! Fails fast with a readable message instead of an API error midway
//! through an ingest or a question.

use crate::config::{EmbeddingProvider, Settings};
use crate::error::{PensumError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Indexing needs the API key when embeddings come from OpenAI.
    Ingest,
    /// Questions always need the API key for the chat model.
    Ask,
    /// Search needs the API key when embeddings come from OpenAI.
    Search,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    let needs_key = match operation {
        Operation::Ask => true,
        Operation::Ingest | Operation::Search => {
            settings.embedding.provider == EmbeddingProvider::OpenAI
        }
    };

    if needs_key {
        check_api_key(std::env::var("OPENAI_API_KEY").ok().as_deref())?;
    }
    Ok(())
}

/// Check that an OpenAI API key is configured.
fn check_api_key(key: Option<&str>) -> Result<()> {
    match key {
        Some(key) if !key.is_empty() => Ok(()),
        Some(_) => Err(PensumError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        None => Err(PensumError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}
