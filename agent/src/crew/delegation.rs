use crate::Result;
use crate::crew::role::{Assignment, Role};
use crate::crew::task::render_task_prompt;
use crate::llm::Message;
use crate::tools::{FunctionalTool, KVMemoryTool, ToolCall, ToolDefinition};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

const COWORKER_EXPECTED_OUTPUT: &str =
    "Your best answer to your coworker asking you this, accounting for the context shared.";

#[derive(Clone)]
pub(crate) struct Coworkers {
    roles: Vec<Arc<Role>>,
    memory: KVMemoryTool,
}

impl Coworkers {
    pub(crate) fn new(roles: Vec<Arc<Role>>, memory: KVMemoryTool) -> Self {
        Self { roles, memory }
    }

    fn names(&self) -> String {
        self.roles
            .iter()
            .map(|role| role.role())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn find(&self, coworker: &str) -> Option<&Arc<Role>> {
        self.roles.iter().find(|role| role.is(coworker))
    }

    async fn ask(&self, call: &ToolCall, coworker: &str, request: String) -> Result<Message> {
        let Some(role) = self.find(coworker) else {
            warn!(coworker, "delegation to unknown coworker");
            return Ok(call.result(format!(
                "Error executing tool. coworker mentioned not found, it must be one of the following options:\n{}",
                self.roles
                    .iter()
                    .map(|role| format!("- {}", role.role()))
                    .collect::<Vec<_>>()
                    .join("\n")
            )));
        };

        info!(coworker = %role.role(), "delegating");

        let answer = role
            .execute(
                request,
                Assignment {
                    tools: Vec::new(),
                    coworkers: Vec::new(),
                    memory: self.memory.clone(),
                    transcript: None,
                },
            )
            .await?;

        Ok(call.result(answer))
    }
}

fn with_context(context: &str) -> String {
    if context.trim().is_empty() {
        String::new()
    } else {
        format!("\nThis is the context you're working with:\n{}\n", context)
    }
}

#[derive(Deserialize, JsonSchema)]
struct DelegateWorkArgs {
    /// the task to delegate
    task: String,
    /// the context for the task, everything the coworker needs to know
    context: String,
    /// the role of the coworker to delegate to
    coworker: String,
}

pub(crate) struct DelegateWork(pub Coworkers);

#[async_trait]
impl FunctionalTool for DelegateWork {
    fn definition(&self) -> Result<ToolDefinition> {
        ToolDefinition::new::<DelegateWorkArgs>(
            "delegate_work",
            &format!(
                "Delegate a specific task to one of the following coworkers: {}. The input to this tool should be the coworker, the task you want them to do, and ALL necessary context to execute the task, they know nothing about the task, so share absolutely everything you know, don't reference things but instead explain them.",
                self.0.names()
            ),
        )
    }

    async fn invoke_fn(&self, call: &ToolCall) -> Result<Message> {
        let args: DelegateWorkArgs = call.args()?;
        let request = render_task_prompt(
            &args.task,
            COWORKER_EXPECTED_OUTPUT,
            &with_context(&args.context),
        );
        self.0.ask(call, &args.coworker, request).await
    }
}

#[derive(Deserialize, JsonSchema)]
struct AskQuestionArgs {
    /// the question to ask
    question: String,
    /// the context for the question, everything the coworker needs to know
    context: String,
    /// the role of the coworker to ask
    coworker: String,
}

pub(crate) struct AskQuestion(pub Coworkers);

#[async_trait]
impl FunctionalTool for AskQuestion {
    fn definition(&self) -> Result<ToolDefinition> {
        ToolDefinition::new::<AskQuestionArgs>(
            "ask_question",
            &format!(
                "Ask a specific question to one of the following coworkers: {}. The input to this tool should be the coworker, the question you have for them, and ALL necessary context to ask the question properly, they know nothing about the question, so share absolutely everything you know, don't reference things but instead explain them.",
                self.0.names()
            ),
        )
    }

    async fn invoke_fn(&self, call: &ToolCall) -> Result<Message> {
        let args: AskQuestionArgs = call.args()?;
        let request = render_task_prompt(
            &args.question,
            COWORKER_EXPECTED_OUTPUT,
            &with_context(&args.context),
        );
        self.0.ask(call, &args.coworker, request).await
    }
}
