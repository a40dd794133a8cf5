use crate::Result;
use crate::llm::Message;
use crate::tools::{FunctionalTool, ToolCall, ToolDefinition};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

pub const COMPLETE_TASK: &str = "complete_task";

#[derive(Deserialize, JsonSchema)]
struct CompleteTaskArgs {
    /// the complete final answer to the task, not a summary of it
    final_answer: String,
}

pub struct CompleteTask;

#[async_trait]
impl FunctionalTool for CompleteTask {
    fn definition(&self) -> Result<ToolDefinition> {
        ToolDefinition::new::<CompleteTaskArgs>(
            COMPLETE_TASK,
            "finish your task and hand over your final answer",
        )
    }

    async fn invoke_fn(&self, call: &ToolCall) -> Result<Message> {
        let args: CompleteTaskArgs = call.args()?;
        Ok(call.result(args.final_answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_complete_task_returns_answer() -> Result<()> {
        let call = ToolCall {
            id: "call1".to_string(),
            name: COMPLETE_TASK.to_string(),
            args: "{\"final_answer\":\"# Title\\n\\nbody\"}".to_string(),
        };

        match CompleteTask.invoke_fn(&call).await? {
            Message::Tool { id, name, result } => {
                assert_eq!(id, "call1");
                assert_eq!(name, COMPLETE_TASK);
                assert_eq!(result, "# Title\n\nbody");
            }
            _ => panic!("not a tool message"),
        }
        Ok(())
    }
}
