use crate::Result;
use crate::tools::{ToolCall, ToolDefinition};
use async_trait::async_trait;
use std::hash::{DefaultHasher, Hash, Hasher};

mod openai;
pub use openai::{GEMINI_API_BASE, GEMINI_MODEL, OpenAI};

#[derive(Clone, Debug, Hash)]
pub enum Message {
    User(String),
    Assistant(String, Vec<ToolCall>),
    System(String),
    Tool {
        id: String,
        name: String,
        result: String,
    },
}

impl Message {
    pub fn get_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Rough token estimate, four characters per token.
    pub fn ntokens(&self) -> usize {
        let chars = match self {
            Message::User(content) | Message::System(content) => content.len(),
            Message::Assistant(content, tool_calls) => {
                content.len()
                    + tool_calls
                        .iter()
                        .map(|call| call.name.len() + call.args.len())
                        .sum::<usize>()
            }
            Message::Tool { result, .. } => result.len(),
        };
        chars.div_ceil(4)
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::User(content) => write!(f, "**User**\n\n{}\n\n", content),
            Message::System(content) => write!(f, "**System**\n\n{}\n\n", content),
            Message::Assistant(content, tool_calls) => {
                write!(f, "**Assistant**\n\n{}\n\n", content)?;
                tool_calls.iter().try_for_each(|call| write!(f, "{}", call))?;
                if !tool_calls.is_empty() {
                    writeln!(f)?;
                }
                Ok(())
            }
            Message::Tool { id, name, result } => {
                write!(f, "**Tool** `{}` ({})\n\n{}\n\n", name, id, result)
            }
        }
    }
}

pub struct CompletionRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolDefinition],
}

pub struct CompletionResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

#[async_trait]
pub trait LLM {
    async fn completion<'a>(&self, request: CompletionRequest<'a>) -> Result<CompletionResponse>;
}

#[cfg(test)]
mod tests {
    use super::Message;
    use crate::tools::ToolCall;

    #[test]
    fn test_hash_tracks_content() {
        let a = Message::User("hello".to_string());
        let b = Message::User("hello".to_string());
        let c = Message::System("hello".to_string());

        assert_eq!(a.get_hash(), b.get_hash());
        assert_ne!(a.get_hash(), c.get_hash());
    }

    #[test]
    fn test_ntokens() {
        assert_eq!(Message::User(String::new()).ntokens(), 0);
        assert_eq!(Message::User("abcde".to_string()).ntokens(), 2);

        let call = ToolCall {
            id: "1".to_string(),
            name: "abcd".to_string(),
            args: "abcd".to_string(),
        };
        assert_eq!(
            Message::Assistant("abcd".to_string(), vec![call]).ntokens(),
            3
        );
    }

    #[test]
    fn test_display_tool_message() {
        let msg = Message::Tool {
            id: "call1".to_string(),
            name: "search".to_string(),
            result: "found it".to_string(),
        };
        assert_eq!(msg.to_string(), "**Tool** `search` (call1)\n\nfound it\n\n");
    }
}
