//! Configuration module for Pensum.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AssistantPrompts, Prompts};
pub use settings::{
    AssistantSettings, ChunkingSettings, EmbeddingProvider, EmbeddingSettings, GeneralSettings,
    PromptSettings, ServerSettings, Settings, VectorStoreProvider, VectorStoreSettings,
};
