//! OpenAI chat completions behind the [`ModelClient`] trait.

use super::model::{
    InferenceRequest, ModelClient, ModelReply, Role, ToolInvocationRequest, Turn, TurnContent,
};
use super::tool::ToolDefinition;
use crate::config::AssistantSettings;
use crate::error::{PensumError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
    ChatCompletionToolChoiceOption, ChatCompletionToolType, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs, FinishReason, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

fn build_err(e: impl std::fmt::Display) -> PensumError {
    PensumError::Agent(e.to_string())
}

/// Chat-completions client for the assistant loop.
pub struct OpenAIModelClient {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIModelClient {
    /// Create a client from the assistant settings.
    pub fn from_settings(settings: &AssistantSettings) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(Duration::from_secs(settings.timeout_seconds))?,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn convert_tool(definition: &ToolDefinition) -> ChatCompletionTool {
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: definition.name.clone(),
                description: Some(definition.description.clone()),
                parameters: Some(definition.parameters.clone()),
                strict: None,
            },
        }
    }

    /// One turn may expand into several messages: each tool result is its own message.
    fn convert_turn(turn: &Turn) -> Result<Vec<ChatCompletionRequestMessage>> {
        let messages: Vec<ChatCompletionRequestMessage> = match &turn.content {
            TurnContent::Text(text) => match turn.role {
                Role::User => vec![ChatCompletionRequestUserMessageArgs::default()
                    .content(text.clone())
                    .build()
                    .map_err(build_err)?
                    .into()],
                Role::Assistant => {
                    vec![ChatCompletionRequestAssistantMessageArgs::default()
                        .content(text.clone())
                        .build()
                        .map_err(build_err)?
                        .into()]
                }
            },
            TurnContent::ToolRequests(requests) => {
                let tool_calls: Vec<ChatCompletionMessageToolCall> = requests
                    .iter()
                    .map(|r| ChatCompletionMessageToolCall {
                        id: r.id.clone(),
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionCall {
                            name: r.name.clone(),
                            arguments: r.arguments.to_string(),
                        },
                    })
                    .collect();

                vec![ChatCompletionRequestAssistantMessageArgs::default()
                    .tool_calls(tool_calls)
                    .build()
                    .map_err(build_err)?
                    .into()]
            }
            TurnContent::ToolResults(results) => results
                .iter()
                .map(|r| {
                    ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(r.tool_call_id.clone())
                        .content(r.content.clone())
                        .build()
                        .map(Into::into)
                        .map_err(build_err)
                })
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(messages)
    }

    fn build_request(&self, request: &InferenceRequest) -> Result<CreateChatCompletionRequest> {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.clone())
                .build()
                .map_err(build_err)?
                .into()];

        for turn in request.conversation.turns() {
            messages.extend(Self::convert_turn(turn)?);
        }

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens);

        if !request.tools.is_empty() {
            args.tools(request.tools.iter().map(Self::convert_tool).collect::<Vec<_>>())
                .tool_choice(ChatCompletionToolChoiceOption::Auto);
        }

        args.build().map_err(build_err)
    }
}

#[async_trait]
impl ModelClient for OpenAIModelClient {
    #[instrument(skip(self, request), fields(model = %self.model, tools = request.tools.len()))]
    async fn infer(&self, request: InferenceRequest) -> Result<ModelReply> {
        let openai_request = self.build_request(&request)?;

        let response = self
            .client
            .chat()
            .create(openai_request)
            .await
            .map_err(|e| PensumError::OpenAI(format!("Chat completion error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PensumError::Agent("No response from model".to_string()))?;

        let wants_tools = matches!(choice.finish_reason, Some(FinishReason::ToolCalls));
        let tool_calls = choice.message.tool_calls.unwrap_or_default();

        if wants_tools || !tool_calls.is_empty() {
            let requests = tool_calls
                .into_iter()
                .map(|call| {
                    let arguments = serde_json::from_str(&call.function.arguments)
                        .unwrap_or_else(|e| {
                            warn!("Tool '{}' sent invalid JSON arguments: {}", call.function.name, e);
                            serde_json::Value::String(call.function.arguments.clone())
                        });
                    ToolInvocationRequest {
                        id: call.id,
                        name: call.function.name,
                        arguments,
                    }
                })
                .collect::<Vec<_>>();

            debug!("Model requested {} tool calls", requests.len());
            return Ok(ModelReply::ToolUse(requests));
        }

        Ok(ModelReply::Text(choice.message.content.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::model::{Conversation, ToolInvocationResult};
    use serde_json::json;

    fn client() -> OpenAIModelClient {
        OpenAIModelClient::from_settings(&AssistantSettings::default()).unwrap()
    }

    fn tool_round_conversation() -> Conversation {
        let mut conversation = Conversation::with_user_message("What is in lesson 1?");
        conversation.push_tool_requests(vec![
            ToolInvocationRequest {
                id: "call_1".to_string(),
                name: "search_course_content".to_string(),
                arguments: json!({"query": "lesson 1"}),
            },
            ToolInvocationRequest {
                id: "call_2".to_string(),
                name: "get_course_outline".to_string(),
                arguments: json!({"course_name": "MCP"}),
            },
        ]);
        conversation.push_tool_results(vec![
            ToolInvocationResult {
                tool_call_id: "call_1".to_string(),
                content: "found".to_string(),
            },
            ToolInvocationResult {
                tool_call_id: "call_2".to_string(),
                content: "outline".to_string(),
            },
        ]);
        conversation
    }

    #[test]
    fn test_tool_results_become_one_message_each() {
        let request = InferenceRequest {
            system: "system".to_string(),
            conversation: tool_round_conversation(),
            tools: vec![],
        };

        let built = client().build_request(&request).unwrap();

        // system + user + assistant(tool_calls) + two tool messages
        assert_eq!(built.messages.len(), 5);
        assert!(matches!(built.messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(built.messages[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(built.messages[3], ChatCompletionRequestMessage::Tool(_)));
        assert!(matches!(built.messages[4], ChatCompletionRequestMessage::Tool(_)));
        assert!(built.tools.is_none());
        assert!(built.tool_choice.is_none());
    }

    #[test]
    fn test_tools_attached_with_auto_choice() {
        let request = InferenceRequest {
            system: "system".to_string(),
            conversation: Conversation::with_user_message("hi"),
            tools: vec![ToolDefinition {
                name: "search_course_content".to_string(),
                description: "search".to_string(),
                parameters: json!({"type": "object"}),
            }],
        };

        let built = client().build_request(&request).unwrap();

        assert_eq!(built.tools.as_ref().map(Vec::len), Some(1));
        assert!(matches!(built.tool_choice, Some(ChatCompletionToolChoiceOption::Auto)));
        assert_eq!(built.temperature, Some(0.0));
        assert_eq!(built.max_completion_tokens, Some(800));
    }
}
