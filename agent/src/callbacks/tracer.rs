use crate::Result;
use crate::callbacks::Callback;
use crate::callbacks::logger::{Advance, HistoryCursor};
use crate::llm::Message;
use async_trait::async_trait;
use tracing::info;

/// Reports every new message of an agent through `tracing`.
pub struct StepTracer {
    name: String,
    cursor: HistoryCursor,
    step: u32,
}

impl StepTracer {
    pub fn new(name: &str) -> Box<Self> {
        Box::new(Self {
            name: name.to_string(),
            cursor: HistoryCursor::default(),
            step: 0,
        })
    }

    fn trace(&self, message: &Message) {
        match message {
            Message::Assistant(content, tool_calls) => {
                for call in tool_calls {
                    info!(agent = %self.name, step = self.step, tool = %call.name, args = %call.args, "tool call");
                }
                if !content.is_empty() {
                    info!(agent = %self.name, step = self.step, "{}", content);
                }
            }
            Message::Tool { name, result, .. } => {
                info!(
                    agent = %self.name,
                    step = self.step,
                    tool = %name,
                    chars = result.len(),
                    "tool result"
                );
            }
            Message::User(_) | Message::System(_) => {}
        }
    }
}

#[async_trait]
impl Callback for StepTracer {
    async fn call(&mut self, messages: Vec<Message>) -> Result<Vec<Message>> {
        match self.cursor.advance(&messages) {
            Advance::Cleared => {
                info!(agent = %self.name, step = self.step, "history summarized");
            }
            Advance::From(start) => messages[start..].iter().for_each(|m| self.trace(m)),
        }

        self.step += 1;

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tracer_passes_messages_through() -> Result<()> {
        let mut tracer = StepTracer::new("Writer");
        let messages = vec![
            Message::User("write".to_string()),
            Message::Assistant("done".to_string(), vec![]),
        ];

        let messages = tracer.call(messages).await?;
        assert_eq!(messages.len(), 2);
        assert_eq!(tracer.step, 1);
        Ok(())
    }
}
