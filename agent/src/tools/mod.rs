use crate::Result;
use crate::llm::Message;
use async_trait::async_trait;
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use std::sync::Arc;

mod complete_task;
pub use complete_task::{COMPLETE_TASK, CompleteTask};

mod kv_memory;
pub use kv_memory::KVMemoryTool;

mod serper;
pub use serper::{SERPER_ENDPOINT, SearchResponse, SerperSearch};

mod summarize_history;
pub use summarize_history::SummarizeHistory;

#[derive(Clone, Debug)]
pub struct ToolDefinition {
    pub name: String,
    pub desc: String,
    pub params: serde_json::Value,
}

impl ToolDefinition {
    pub fn new<P: JsonSchema>(name: &str, desc: &str) -> Result<Self> {
        let schema = schema_for!(P);
        let params = serde_json::to_value(&schema.schema)?;
        Ok(Self {
            name: name.to_string(),
            desc: desc.to_string(),
            params,
        })
    }
}

/// Parameters for tools that take no arguments.
#[derive(Deserialize, JsonSchema)]
pub struct NoArgs {}

#[derive(Clone, Debug, std::hash::Hash)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: String,
}

impl ToolCall {
    pub fn args<O: for<'de> serde::Deserialize<'de>>(&self) -> Result<O> {
        let args = serde_json::from_str(&self.args)?;
        Ok(args)
    }

    pub fn result(&self, result: String) -> Message {
        Message::Tool {
            id: self.id.clone(),
            name: self.name.clone(),
            result,
        }
    }
}

impl std::fmt::Display for ToolCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "- {} ({})\n\t- `{}`\n", self.name, self.id, self.args)
    }
}

#[async_trait]
pub trait Tool {
    fn definition(&self) -> Result<ToolDefinition>;

    async fn invoke(&self, args: &ToolCall, messages: Vec<Message>) -> Result<Vec<Message>>;
}

pub type SharedTool = Arc<dyn Tool + Send + Sync>;

#[async_trait]
pub trait FunctionalTool {
    fn definition(&self) -> Result<ToolDefinition>;

    async fn invoke_fn(&self, args: &ToolCall) -> Result<Message>;
}

#[async_trait]
impl<T> Tool for T
where
    T: FunctionalTool + Send + Sync,
{
    fn definition(&self) -> Result<ToolDefinition> {
        FunctionalTool::definition(self)
    }

    async fn invoke(&self, args: &ToolCall, mut messages: Vec<Message>) -> Result<Vec<Message>> {
        let result = FunctionalTool::invoke_fn(self, args).await?;
        messages.push(result);
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize, JsonSchema)]
    struct QueryArgs {
        /// what to look for
        query: String,
    }

    #[test]
    fn test_definition_schema_is_an_object() -> Result<()> {
        let def = ToolDefinition::new::<QueryArgs>("lookup", "look something up")?;
        assert_eq!(def.name, "lookup");
        assert_eq!(def.params["type"], "object");
        assert_eq!(def.params["required"][0], "query");

        let def = ToolDefinition::new::<NoArgs>("noop", "does nothing")?;
        assert_eq!(def.params["type"], "object");
        Ok(())
    }

    #[test]
    fn test_tool_call_args() -> Result<()> {
        let call = ToolCall {
            id: "call1".to_string(),
            name: "lookup".to_string(),
            args: "{\"query\":\"rust\"}".to_string(),
        };
        let args: QueryArgs = call.args()?;
        assert_eq!(args.query, "rust");

        let bad = ToolCall {
            args: "not json".to_string(),
            ..call
        };
        assert!(bad.args::<QueryArgs>().is_err());
        Ok(())
    }
}
