//! Provider-agnostic conversation types and the model client seam.
//!
//! The assistant loop only speaks these types; provider SDKs are mapped to
//! them in their own client implementations.

use super::tool::ToolDefinition;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    /// Correlation id assigned by the provider, echoed back in the result.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Decoded JSON arguments.
    pub arguments: serde_json::Value,
}

/// The outcome of one tool call, always constructible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    pub tool_call_id: String,
    /// Tool output or a synthesized failure message.
    pub content: String,
}

/// Body of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TurnContent {
    Text(String),
    ToolRequests(Vec<ToolInvocationRequest>),
    ToolResults(Vec<ToolInvocationResult>),
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
}

/// Ordered turns for one query.
///
/// Append-only: a tool-results turn is user-origin and always follows the
/// assistant turn holding the matching requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Start a conversation with one user message.
    pub fn with_user_message(text: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn {
                role: Role::User,
                content: TurnContent::Text(text.into()),
            }],
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Record the model's tool requests.
    pub fn push_tool_requests(&mut self, requests: Vec<ToolInvocationRequest>) {
        self.turns.push(Turn {
            role: Role::Assistant,
            content: TurnContent::ToolRequests(requests),
        });
    }

    /// Record the results answering the previous tool requests.
    pub fn push_tool_results(&mut self, results: Vec<ToolInvocationResult>) {
        self.turns.push(Turn {
            role: Role::User,
            content: TurnContent::ToolResults(results),
        });
    }
}

/// Everything the model sees for one inference call.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub system: String,
    pub conversation: Conversation,
    /// Tool schemas on offer; empty means the model must answer in text.
    pub tools: Vec<ToolDefinition>,
}

/// What the model produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// A final answer.
    Text(String),
    /// A request to run tools. May be empty.
    ToolUse(Vec<ToolInvocationRequest>),
}

/// A language model that can optionally call tools.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run one inference call. Transport and API failures are `Err`.
    async fn infer(&self, request: InferenceRequest) -> Result<ModelReply>;
}
