//! Tool-using assistant for course questions.
//!
//! A model is offered the registered tools and may call them over a bounded
//! number of rounds before it must answer. Model and tool failures never
//! escape: they are folded into the answer or the tool results.

mod model;
mod openai_client;
mod registry;
mod runner;
mod tool;
mod tools;

pub use model::{
    Conversation, InferenceRequest, ModelClient, ModelReply, Role, ToolInvocationRequest,
    ToolInvocationResult, Turn, TurnContent,
};
pub use openai_client::OpenAIModelClient;
pub use registry::ToolRegistry;
pub use runner::{Agent, AgentResponse, ToolCallRecord, DEFAULT_MAX_ROUNDS};
pub use tool::{Source, Tool, ToolDefinition, ToolOutput};
pub use tools::{CourseOutlineTool, CourseSearchTool, OUTLINE_TOOL_NAME, SEARCH_TOOL_NAME};
