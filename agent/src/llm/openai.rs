use crate::llm;
use crate::tools::{ToolCall, ToolDefinition};
use crate::{Error, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent,
        ChatCompletionRequestToolMessage, ChatCompletionRequestToolMessageContent,
        ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
        ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType,
        CreateChatCompletionRequestArgs, FunctionCall, FunctionObjectArgs, Role,
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Google's OpenAI-compatible chat completions endpoint.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const GEMINI_MODEL: &str = "gemini-2.0-flash";

pub struct OpenAI {
    model: String,
    client: Client<OpenAIConfig>,
}

impl OpenAI {
    pub fn with_config(model: String, config: OpenAIConfig) -> Arc<Self> {
        Arc::new(Self {
            model,
            client: Client::with_config(config),
        })
    }

    pub fn gemini(model: String, api_key: &str) -> Arc<Self> {
        Self::compatible(model, GEMINI_API_BASE, api_key)
    }

    /// Any provider that speaks the OpenAI chat completions protocol.
    pub fn compatible(model: String, api_base: &str, api_key: &str) -> Arc<Self> {
        Self::with_config(
            model,
            OpenAIConfig::new()
                .with_api_base(api_base.trim_end_matches('/'))
                .with_api_key(api_key),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TryFrom<&llm::Message> for ChatCompletionRequestMessage {
    type Error = Error;

    fn try_from(msg: &llm::Message) -> Result<Self> {
        match msg {
            llm::Message::User(msg) => Ok(ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(msg.clone()),
                    name: None,
                },
            )),
            llm::Message::System(msg) => Ok(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.clone()),
                    name: None,
                },
            )),
            llm::Message::Tool { id, result, .. } => Ok(ChatCompletionRequestMessage::Tool(
                ChatCompletionRequestToolMessage {
                    content: ChatCompletionRequestToolMessageContent::Text(result.clone()),
                    tool_call_id: id.clone(),
                },
            )),
            llm::Message::Assistant(msg, tool_calls) => {
                let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                args.content(ChatCompletionRequestAssistantMessageContent::Text(
                    msg.clone(),
                ));

                // some compatible providers reject an empty tool_calls array
                if !tool_calls.is_empty() {
                    args.tool_calls(
                        tool_calls
                            .iter()
                            .map(|call| ChatCompletionMessageToolCall {
                                id: call.id.clone(),
                                r#type: ChatCompletionToolType::Function,
                                function: FunctionCall {
                                    name: call.name.clone(),
                                    arguments: call.args.clone(),
                                },
                            })
                            .collect::<Vec<_>>(),
                    );
                }

                Ok(ChatCompletionRequestMessage::Assistant(args.build()?))
            }
        }
    }
}

impl TryFrom<&ToolDefinition> for ChatCompletionTool {
    type Error = Error;

    fn try_from(tool: &ToolDefinition) -> Result<Self> {
        let res = ChatCompletionToolArgs::default()
            .function(
                FunctionObjectArgs::default()
                    .name(tool.name.clone())
                    .description(tool.desc.clone())
                    .parameters(tool.params.clone())
                    .build()?,
            )
            .build()?;

        Ok(res)
    }
}

#[async_trait]
impl llm::LLM for OpenAI {
    async fn completion<'a>(
        &self,
        request: llm::CompletionRequest<'a>,
    ) -> Result<llm::CompletionResponse> {
        let mut completion = CreateChatCompletionRequestArgs::default();
        completion.model(&self.model).messages(
            request
                .messages
                .iter()
                .map(ChatCompletionRequestMessage::try_from)
                .collect::<Result<Vec<_>>>()?,
        );

        if !request.tools.is_empty() {
            completion.tools(
                request
                    .tools
                    .iter()
                    .map(ChatCompletionTool::try_from)
                    .collect::<Result<Vec<_>>>()?,
            );
        }

        let completion = completion.build()?;

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "chat completion request"
        );

        let res = self.client.chat().create(completion).await?;

        let choice = res
            .choices
            .into_iter()
            .next()
            .ok_or(Error::LLMResponseError("choices is empty".to_string()))?;

        if choice.message.role != Role::Assistant {
            return Err(Error::LLMResponseError(
                "expected role to be assistant".to_string(),
            ));
        }

        let tool_calls = choice
            .message
            .tool_calls
            .iter()
            .flat_map(|calls| {
                calls.iter().map(|call| ToolCall {
                    id: call.id.clone(),
                    name: call.function.name.clone(),
                    args: call.function.arguments.clone(),
                })
            })
            .collect::<Vec<_>>();

        let content = choice.message.content.unwrap_or_default();

        if content.is_empty() && tool_calls.is_empty() {
            return Err(Error::LLMResponseError(
                "content and tool calls are both empty".to_string(),
            ));
        }

        Ok(llm::CompletionResponse {
            content,
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    #[test]
    fn test_assistant_without_tool_calls_omits_field() -> Result<()> {
        let msg = ChatCompletionRequestMessage::try_from(&Message::Assistant(
            "hi".to_string(),
            vec![],
        ))?;
        let json = serde_json::to_value(&msg)?;
        assert_eq!(json["role"], "assistant");
        assert!(json.get("tool_calls").is_none());
        Ok(())
    }

    #[test]
    fn test_assistant_tool_calls_are_converted() -> Result<()> {
        let msg = ChatCompletionRequestMessage::try_from(&Message::Assistant(
            String::new(),
            vec![ToolCall {
                id: "call1".to_string(),
                name: "search".to_string(),
                args: "{\"search_query\":\"rust\"}".to_string(),
            }],
        ))?;
        let json = serde_json::to_value(&msg)?;
        assert_eq!(json["tool_calls"][0]["id"], "call1");
        assert_eq!(json["tool_calls"][0]["function"]["name"], "search");
        Ok(())
    }

    #[test]
    fn test_tool_message_keeps_call_id() -> Result<()> {
        let msg = ChatCompletionRequestMessage::try_from(&Message::Tool {
            id: "call7".to_string(),
            name: "search".to_string(),
            result: "ok".to_string(),
        })?;
        let json = serde_json::to_value(&msg)?;
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call7");
        Ok(())
    }
}
