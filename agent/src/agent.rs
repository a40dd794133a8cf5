use crate::callbacks;
use crate::llm::{self, Message};
use crate::tools::{self, COMPLETE_TASK, SharedTool};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_MAX_ITER: usize = 25;

const FORCE_FINAL_ANSWER: &str = "You have run out of steps. Stop using tools other than `complete_task` and give your best final answer now.";

pub trait StopCondition {
    fn done(&self, history: &[llm::Message]) -> bool;
}

/// Done once `complete_task` has been called, or the model answered
/// without asking for any tool.
pub struct TaskCompleted;

impl StopCondition for TaskCompleted {
    fn done(&self, history: &[llm::Message]) -> bool {
        final_answer(history).is_some()
    }
}

pub fn final_answer(history: &[llm::Message]) -> Option<&str> {
    match history.last() {
        Some(Message::Tool { name, result, .. }) if name == COMPLETE_TASK => Some(result.as_str()),
        Some(Message::Assistant(content, tool_calls))
            if tool_calls.is_empty() && !content.trim().is_empty() =>
        {
            Some(content.as_str())
        }
        _ => None,
    }
}

type Callback = Box<dyn callbacks::Callback + Send>;

pub struct Agent {
    llm: Arc<dyn llm::LLM + Send + Sync>,
    messages: Vec<Message>,
    tools: HashMap<String, SharedTool>,
    callbacks: Vec<Callback>,
    tool_defs: Vec<tools::ToolDefinition>,
    stop_condition: Box<dyn StopCondition + Send>,
    max_iter: usize,
}

impl Agent {
    async fn execute_tool_call(
        registry: &HashMap<String, SharedTool>,
        tool_call: &tools::ToolCall,
        messages: Vec<Message>,
    ) -> Result<Vec<Message>> {
        let tool = registry
            .get(&tool_call.name)
            .ok_or(Error::ToolDoesNotExist(tool_call.name.clone()))?;

        debug!(tool = %tool_call.name, id = %tool_call.id, "invoking tool");

        tool.invoke(tool_call, messages).await
    }

    pub async fn run(mut self) -> Result<Vec<Message>> {
        let mut messages = std::mem::take(&mut self.messages);
        let mut step = 0;

        while !self.stop_condition.done(&messages) {
            if step == self.max_iter {
                warn!(max_iter = self.max_iter, "step limit reached, asking for a final answer");
                messages.push(Message::User(FORCE_FINAL_ANSWER.to_string()));
            } else if step > self.max_iter {
                return Err(Error::AgentWorkflowError(format!(
                    "no final answer after {} steps",
                    step
                )));
            }

            let next = self
                .llm
                .completion(llm::CompletionRequest {
                    messages: &messages,
                    tools: &self.tool_defs,
                })
                .await?;

            debug!(step, tool_calls = next.tool_calls.len(), "llm turn");

            messages.push(llm::Message::Assistant(
                next.content,
                next.tool_calls.clone(),
            ));

            for tool_call in &next.tool_calls {
                messages = Self::execute_tool_call(&self.tools, tool_call, messages).await?;
            }

            for callback in &mut self.callbacks {
                messages = callback.call(messages).await?;
            }

            step += 1;
        }

        Ok(messages)
    }
}

pub struct AgentBuilder {
    llm: Option<Arc<dyn llm::LLM + Send + Sync>>,
    system_prompt: Option<String>,
    user_prompt: Option<String>,
    tools: Vec<SharedTool>,
    callbacks: Vec<Callback>,
    stop_condition: Option<Box<dyn StopCondition + Send>>,
    max_iter: usize,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            llm: None,
            system_prompt: None,
            user_prompt: None,
            tools: Vec::new(),
            callbacks: Vec::new(),
            stop_condition: None,
            max_iter: DEFAULT_MAX_ITER,
        }
    }

    pub fn llm(mut self, llm: Arc<dyn llm::LLM + Send + Sync>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = Some(prompt);
        self
    }

    pub fn user_prompt(mut self, prompt: String) -> Self {
        self.user_prompt = Some(prompt);
        self
    }

    pub fn tool(mut self, tool: SharedTool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: Vec<SharedTool>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn callback(mut self, callback: Callback) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn stop_condition(mut self, cond: Box<dyn StopCondition + Send>) -> Self {
        self.stop_condition = Some(cond);
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let mut tool_defs: Vec<tools::ToolDefinition> = Vec::new();
        let mut tools = HashMap::new();

        for tool in self.tools {
            let def = tool.definition()?;
            // a later tool with the same name replaces the earlier one
            if tools.insert(def.name.clone(), tool).is_some() {
                tool_defs.retain(|d| d.name != def.name);
            }
            tool_defs.push(def);
        }

        let mut messages = Vec::new();
        if let Some(prompt) = self.system_prompt {
            messages.push(Message::System(prompt));
        }
        messages.push(Message::User(self.user_prompt.ok_or(Error::MissingArg(
            "user_prompt is required for agent".to_string(),
        ))?));

        Ok(Agent {
            llm: self
                .llm
                .ok_or(Error::MissingArg("llm is required for agent".to_string()))?,
            messages,
            tools,
            tool_defs,
            callbacks: self.callbacks,
            stop_condition: self.stop_condition.ok_or(Error::MissingArg(
                "stop_condition is required for agent".to_string(),
            ))?,
            max_iter: self.max_iter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::FORCE_FINAL_ANSWER;
    use crate::llm::{CompletionRequest, CompletionResponse, LLM, Message};
    use crate::tools::{CompleteTask, FunctionalTool, ToolCall, ToolDefinition};
    use crate::{AgentBuilder, Error, Result, StopCondition, TaskCompleted, final_answer};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct MockLLM;

    #[async_trait]
    impl LLM for MockLLM {
        async fn completion<'a>(
            &self,
            request: CompletionRequest<'a>,
        ) -> Result<CompletionResponse> {
            match request.messages.last() {
                Some(Message::User(_)) => Ok(CompletionResponse {
                    content: "tool call".to_string(),
                    tool_calls: vec![ToolCall {
                        id: "call1".to_string(),
                        name: "double".to_string(),
                        args: "{\"arg\":123}".to_string(),
                    }],
                }),
                Some(Message::Tool { .. }) => Ok(CompletionResponse {
                    content: "tool call recieved".to_string(),
                    tool_calls: vec![],
                }),
                Some(Message::Assistant(_, _)) => Ok(CompletionResponse {
                    content: "completed".to_string(),
                    tool_calls: vec![],
                }),
                _ => panic!("unexpected message sequence"),
            }
        }
    }

    struct DoubleTool;

    #[derive(serde::Deserialize, schemars::JsonSchema)]
    struct DoubleArgs {
        arg: i32,
    }

    #[async_trait]
    impl FunctionalTool for DoubleTool {
        fn definition(&self) -> Result<ToolDefinition> {
            ToolDefinition::new::<DoubleArgs>("double", "double")
        }

        async fn invoke_fn(&self, tool_call: &ToolCall) -> Result<Message> {
            let args: DoubleArgs = tool_call.args()?;
            Ok(Message::Tool {
                id: tool_call.id.clone(),
                name: "double".to_string(),
                result: format!("2 * {} = {}", args.arg, 2 * args.arg),
            })
        }
    }

    struct SimpleStop;

    impl StopCondition for SimpleStop {
        fn done(&self, history: &[Message]) -> bool {
            if let Some(Message::Assistant(content, _)) = history.last() {
                content == "completed"
            } else {
                false
            }
        }
    }

    #[tokio::test]
    async fn test_agent() -> Result<()> {
        let agent = AgentBuilder::new()
            .user_prompt("do stuff".to_string())
            .llm(Arc::new(MockLLM))
            .tool(Arc::new(DoubleTool))
            .stop_condition(Box::new(SimpleStop))
            .build()?;

        let history = agent.run().await?;

        assert_eq!(history.len(), 5);

        assert!(matches!(&history[0], Message::User (content) if content == "do stuff"));
        assert!(matches!(&history[1], Message::Assistant (_, tool_calls) if tool_calls.len() == 1));
        assert!(matches!(&history[2], Message::Tool {  result,.. } if result == "2 * 123 = 246"));
        assert!(
            matches!(&history[3], Message::Assistant (content, _) if content== "tool call recieved")
        );
        assert!(matches!(&history[4], Message::Assistant (content, _) if content== "completed"));

        Ok(())
    }

    #[tokio::test]
    async fn test_task_completed_stops_on_plain_answer() -> Result<()> {
        let agent = AgentBuilder::new()
            .system_prompt("you double numbers".to_string())
            .user_prompt("double 123".to_string())
            .llm(Arc::new(MockLLM))
            .tool(Arc::new(DoubleTool))
            .stop_condition(Box::new(TaskCompleted))
            .build()?;

        let history = agent.run().await?;

        assert_eq!(history.len(), 5);
        assert!(matches!(&history[0], Message::System(_)));
        assert_eq!(final_answer(&history), Some("tool call recieved"));
        Ok(())
    }

    struct CompletingLLM;

    #[async_trait]
    impl LLM for CompletingLLM {
        async fn completion<'a>(&self, _: CompletionRequest<'a>) -> Result<CompletionResponse> {
            Ok(CompletionResponse {
                content: String::new(),
                tool_calls: vec![ToolCall {
                    id: "done".to_string(),
                    name: "complete_task".to_string(),
                    args: "{\"final_answer\":\"the answer\"}".to_string(),
                }],
            })
        }
    }

    #[tokio::test]
    async fn test_complete_task_ends_run() -> Result<()> {
        let agent = AgentBuilder::new()
            .user_prompt("answer".to_string())
            .llm(Arc::new(CompletingLLM))
            .tool(Arc::new(CompleteTask))
            .stop_condition(Box::new(TaskCompleted))
            .build()?;

        let history = agent.run().await?;

        assert_eq!(history.len(), 3);
        assert_eq!(final_answer(&history), Some("the answer"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() -> Result<()> {
        let agent = AgentBuilder::new()
            .user_prompt("do stuff".to_string())
            .llm(Arc::new(MockLLM))
            .stop_condition(Box::new(SimpleStop))
            .build()?;

        assert!(matches!(agent.run().await, Err(Error::ToolDoesNotExist(name)) if name == "double"));
        Ok(())
    }

    struct LoopingLLM;

    #[async_trait]
    impl LLM for LoopingLLM {
        async fn completion<'a>(&self, _: CompletionRequest<'a>) -> Result<CompletionResponse> {
            Ok(CompletionResponse {
                content: String::new(),
                tool_calls: vec![ToolCall {
                    id: "again".to_string(),
                    name: "double".to_string(),
                    args: "{\"arg\":1}".to_string(),
                }],
            })
        }
    }

    #[tokio::test]
    async fn test_step_limit() -> Result<()> {
        let agent = AgentBuilder::new()
            .user_prompt("loop".to_string())
            .llm(Arc::new(LoopingLLM))
            .tool(Arc::new(DoubleTool))
            .stop_condition(Box::new(TaskCompleted))
            .max_iter(3)
            .build()?;

        assert!(matches!(agent.run().await, Err(Error::AgentWorkflowError(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_answer_after_step_limit() -> Result<()> {
        /// Keeps calling tools until it is told to answer.
        struct StubbornLLM;

        #[async_trait]
        impl LLM for StubbornLLM {
            async fn completion<'a>(
                &self,
                request: CompletionRequest<'a>,
            ) -> Result<CompletionResponse> {
                match request.messages.last() {
                    Some(Message::User(prompt)) if prompt == FORCE_FINAL_ANSWER => {
                        Ok(CompletionResponse {
                            content: "best effort".to_string(),
                            tool_calls: vec![],
                        })
                    }
                    _ => Ok(CompletionResponse {
                        content: String::new(),
                        tool_calls: vec![ToolCall {
                            id: "again".to_string(),
                            name: "double".to_string(),
                            args: "{\"arg\":1}".to_string(),
                        }],
                    }),
                }
            }
        }

        let agent = AgentBuilder::new()
            .user_prompt("loop".to_string())
            .llm(Arc::new(StubbornLLM))
            .tool(Arc::new(DoubleTool))
            .stop_condition(Box::new(TaskCompleted))
            .max_iter(3)
            .build()?;

        let history = agent.run().await?;

        assert_eq!(final_answer(&history), Some("best effort"));
        assert!(history
            .iter()
            .any(|m| matches!(m, Message::User(prompt) if prompt == FORCE_FINAL_ANSWER)));
        assert_eq!(
            history
                .iter()
                .filter(|m| matches!(m, Message::Tool { .. }))
                .count(),
            3
        );
        Ok(())
    }

    #[test]
    fn test_builder_requires_llm_and_prompt() {
        let missing_prompt = AgentBuilder::new()
            .llm(Arc::new(MockLLM))
            .stop_condition(Box::new(TaskCompleted))
            .build();
        assert!(matches!(missing_prompt, Err(Error::MissingArg(_))));

        let missing_llm = AgentBuilder::new()
            .user_prompt("hi".to_string())
            .stop_condition(Box::new(TaskCompleted))
            .build();
        assert!(matches!(missing_llm, Err(Error::MissingArg(_))));
    }
}
