//! Tool abstraction for the assistant's function calling.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tool definition that can be advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (dispatch key in the registry).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A citation for content a tool surfaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Display label, e.g. `Course X - Lesson 2`.
    pub label: String,
    /// Lesson or course URL when known.
    pub link: Option<String>,
}

impl Source {
    pub fn new(label: impl Into<String>, link: Option<String>) -> Self {
        Self {
            label: label.into(),
            link,
        }
    }
}

/// What a tool returns for one invocation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolOutput {
    /// Text placed verbatim into the model's context.
    pub text: String,
    /// Sources produced by this call.
    pub sources: Vec<Source>,
}

impl ToolOutput {
    /// Output without attributions.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_sources(text: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            text: text.into(),
            sources,
        }
    }
}

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Static description of the tool: name, purpose and parameter schema.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with the model-supplied JSON arguments.
    async fn execute(&self, args: &serde_json::Value) -> Result<ToolOutput>;
}
