use crate::Result;
use crate::llm::{CompletionRequest, LLM, Message};
use crate::tools::{NoArgs, Tool, ToolCall, ToolDefinition};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_TOKEN_BUDGET: usize = 5000;

pub struct SummarizeHistory {
    llm: Arc<dyn LLM + Send + Sync>,
    keep_last: usize,
    token_budget: usize,
}

impl SummarizeHistory {
    pub fn new(llm: Arc<dyn LLM + Send + Sync>, keep_last: usize) -> Self {
        Self {
            llm,
            keep_last: keep_last.max(1),
            token_budget: DEFAULT_TOKEN_BUDGET,
        }
    }

    pub fn token_budget(mut self, tokens: usize) -> Self {
        self.token_budget = tokens;
        self
    }

    pub fn over_budget(&self, messages: &[Message]) -> bool {
        messages.iter().map(Message::ntokens).sum::<usize>() > self.token_budget
    }

    pub async fn summarize_history(&self, mut messages: Vec<Message>) -> Result<Vec<Message>> {
        // the first two messages are the system and user prompt which contain the task instructions
        if messages.len() < 2 + self.keep_last {
            return Ok(messages);
        }

        // never separate tool results from the assistant message that requested them
        let mut split = messages.len() - self.keep_last;
        while split > 2 && matches!(messages[split], Message::Tool { .. }) {
            split -= 1;
        }
        if split <= 2 {
            return Ok(messages);
        }

        let last_messages = messages.split_off(split);

        messages.push(Message::User(PROMPT.to_string()));

        let result = self
            .llm
            .completion(CompletionRequest {
                messages: &messages,
                tools: &[],
            })
            .await?;

        debug!(
            summarized = messages.len() - 3,
            kept = last_messages.len(),
            "history summarized"
        );

        messages.truncate(2);
        messages.push(Message::Assistant(result.content, vec![]));
        messages.extend(last_messages);

        Ok(messages)
    }
}

const PROMPT: &str = "In order to keep the conversational history from becoming too long, you must generate a summary of the current chat history.
Instructions:
- The summary must compress the information, try to be as succinct as possible. The final summary should not be more than 1000 words in length.
- Preserve key information from the conversational history. Remember that information stored using the memory tools can still be retrieved later.
- Make sure to preserve any findings, sources or drafts that you will need to complete your task.";

#[async_trait]
impl Tool for SummarizeHistory {
    fn definition(&self) -> Result<ToolDefinition> {
        ToolDefinition::new::<NoArgs>(
            "summarize_history",
            &format!(
                "This tool will take in the chat history, and generate a concise summary that preserves the key components. This prevents the conversational history from becoming too long, and makes it easier to find the relevant information in the history. Note that the last {} messages will not be changed, only the preceding messages will be summarized. It will automatically be invoked if the chat history becomes too long.",
                self.keep_last
            ),
        )
    }

    async fn invoke(&self, call: &ToolCall, messages: Vec<Message>) -> Result<Vec<Message>> {
        let mut messages = self.summarize_history(messages).await?;
        messages.push(call.result("chat history summarized".to_string()));
        Ok(messages)
    }
}
