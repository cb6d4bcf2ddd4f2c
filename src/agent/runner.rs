//! Agent runner with a bounded tool-calling loop.
//!
//! Each question gets at most `max_rounds` tool rounds. If the model is
//! still asking for tools when the budget runs out, one last call is made
//! without any tools so it has to answer with what it has gathered.

use super::model::{
    Conversation, InferenceRequest, ModelClient, ModelReply, ToolInvocationRequest,
    ToolInvocationResult,
};
use super::registry::ToolRegistry;
use super::tool::{Source, ToolDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default number of tool rounds per question.
pub const DEFAULT_MAX_ROUNDS: usize = 2;

const ROUND_FAILURE_PREFIX: &str = "I encountered an error";
const EARLY_STOP_FAILURE: &str = "I encountered an issue processing your request.";
const BUDGET_FAILURE: &str =
    "I've completed my research but encountered an issue generating the final response.";

/// Why the loop is making a final, tool-less call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FinalReason {
    /// The model asked for tools but named none.
    EarlyStop,
    /// Every round was spent on tools.
    BudgetExhausted,
}

impl FinalReason {
    fn fallback(self) -> &'static str {
        match self {
            FinalReason::EarlyStop => EARLY_STOP_FAILURE,
            FinalReason::BudgetExhausted => BUDGET_FAILURE,
        }
    }
}

enum LoopState {
    AwaitingModel { round: usize },
    ExecutingTools { round: usize, requests: Vec<ToolInvocationRequest> },
    Finalizing(FinalReason),
    Done(String),
}

/// Answers a question by letting the model call tools for a bounded number of rounds.
pub struct Agent {
    model: Arc<dyn ModelClient>,
    system_prompt: String,
    max_rounds: usize,
}

impl Agent {
    /// Create a new agent over the given model client.
    pub fn new(model: Arc<dyn ModelClient>, system_prompt: &str) -> Self {
        Self {
            model,
            system_prompt: system_prompt.to_string(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set the tool round budget. Values below one are raised to one.
    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max.max(1);
        self
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    fn system_context(&self, history: Option<&str>) -> String {
        match history.filter(|h| !h.is_empty()) {
            Some(history) => format!(
                "{}\n\nPrevious conversation:\n{}",
                self.system_prompt, history
            ),
            None => self.system_prompt.clone(),
        }
    }

    fn request(
        &self,
        system: &str,
        conversation: &Conversation,
        tools: Vec<ToolDefinition>,
    ) -> InferenceRequest {
        InferenceRequest {
            system: system.to_string(),
            conversation: conversation.clone(),
            tools,
        }
    }

    /// Run the loop for one question.
    ///
    /// Never fails: model and tool failures are turned into answer text.
    #[instrument(skip(self, history, registry), fields(max_rounds = self.max_rounds))]
    pub async fn run(
        &self,
        query: &str,
        history: Option<&str>,
        registry: &ToolRegistry,
    ) -> AgentResponse {
        let system = self.system_context(history);
        let tools = registry.definitions();
        let mut conversation = Conversation::with_user_message(query);

        let mut tool_calls = Vec::new();
        let mut latest_sources: HashMap<String, Vec<Source>> = HashMap::new();
        let mut model_calls = 0;
        let mut state = LoopState::AwaitingModel { round: 1 };

        let content = loop {
            state = match state {
                LoopState::AwaitingModel { round } => {
                    debug!("Round {} of {}", round, self.max_rounds);
                    model_calls += 1;

                    let request = self.request(&system, &conversation, tools.clone());
                    match self.model.infer(request).await {
                        Ok(ModelReply::Text(text)) => LoopState::Done(text),
                        Ok(ModelReply::ToolUse(requests)) if requests.is_empty() => {
                            debug!("Model stopped requesting tools");
                            LoopState::Finalizing(FinalReason::EarlyStop)
                        }
                        Ok(ModelReply::ToolUse(requests)) => {
                            LoopState::ExecutingTools { round, requests }
                        }
                        Err(e) => {
                            warn!("Model call failed in round {}: {}", round, e);
                            LoopState::Done(format!("{}: {}", ROUND_FAILURE_PREFIX, e))
                        }
                    }
                }

                LoopState::ExecutingTools { round, requests } => {
                    info!("Round {}: executing {} tool calls", round, requests.len());
                    conversation.push_tool_requests(requests.clone());

                    let mut results = Vec::with_capacity(requests.len());
                    for request in requests {
                        let output = registry.dispatch(&request.name, &request.arguments).await;

                        if registry.contains(&request.name) {
                            latest_sources.insert(request.name.clone(), output.sources);
                        }

                        tool_calls.push(ToolCallRecord {
                            name: request.name,
                            arguments: request.arguments.to_string(),
                            result: output.text.clone(),
                        });
                        results.push(ToolInvocationResult {
                            tool_call_id: request.id,
                            content: output.text,
                        });
                    }
                    conversation.push_tool_results(results);

                    if round < self.max_rounds {
                        LoopState::AwaitingModel { round: round + 1 }
                    } else {
                        LoopState::Finalizing(FinalReason::BudgetExhausted)
                    }
                }

                LoopState::Finalizing(reason) => {
                    debug!("Final call without tools ({:?})", reason);
                    model_calls += 1;

                    let request = self.request(&system, &conversation, Vec::new());
                    match self.model.infer(request).await {
                        Ok(ModelReply::Text(text)) => LoopState::Done(text),
                        Ok(ModelReply::ToolUse(_)) => {
                            warn!("Model requested tools on the final call");
                            LoopState::Done(reason.fallback().to_string())
                        }
                        Err(e) => {
                            warn!("Final model call failed: {}", e);
                            LoopState::Done(reason.fallback().to_string())
                        }
                    }
                }

                LoopState::Done(text) => break text,
            };
        };

        let sources = registry
            .names()
            .iter()
            .filter_map(|name| latest_sources.remove(name))
            .flatten()
            .collect();

        AgentResponse {
            content,
            sources,
            tool_calls,
            model_calls,
        }
    }
}

/// Response from an agent run.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The final answer text.
    pub content: String,
    /// Sources from each tool's latest call in this run, in registration order.
    pub sources: Vec<Source>,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model inference calls made.
    pub model_calls: usize,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
