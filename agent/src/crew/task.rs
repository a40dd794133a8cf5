use crate::crew::{Role, render};
use crate::tools::SharedTool;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const TASK_PROMPT: &str = include_str!("prompts/task.md");

pub(crate) fn render_task_prompt(description: &str, expected_output: &str, context: &str) -> String {
    render(
        TASK_PROMPT,
        &[
            ("description", description),
            ("expected_output", expected_output),
            ("context", context),
        ],
    )
}

/// A unit of work for one role of the crew.
#[derive(Clone)]
pub struct Task {
    description: String,
    expected_output: String,
    tools: Vec<SharedTool>,
    agent: Arc<Role>,
    output_file: Option<PathBuf>,
    async_execution: bool,
}

/// What a finished task produced.
#[derive(Clone, Debug)]
pub struct TaskOutput {
    pub description: String,
    pub agent: String,
    pub raw: String,
}

impl Task {
    pub fn builder() -> TaskBuilder {
        TaskBuilder::new()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }

    pub fn tools(&self) -> &[SharedTool] {
        &self.tools
    }

    pub fn agent(&self) -> &Arc<Role> {
        &self.agent
    }

    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    pub fn async_execution(&self) -> bool {
        self.async_execution
    }

    /// The request handed to the agent, with the output of earlier tasks as context.
    pub fn prompt(&self, context: &[TaskOutput]) -> String {
        let context = if context.is_empty() {
            String::new()
        } else {
            format!(
                "\nThis is the context you're working with:\n{}\n",
                context
                    .iter()
                    .map(|output| output.raw.trim())
                    .collect::<Vec<_>>()
                    .join("\n\n----------\n\n")
            )
        };

        render_task_prompt(&self.description, &self.expected_output, &context)
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("description", &self.description)
            .field("agent", &self.agent.role())
            .field("output_file", &self.output_file)
            .field("async_execution", &self.async_execution)
            .finish_non_exhaustive()
    }
}

pub struct TaskBuilder {
    description: Option<String>,
    expected_output: Option<String>,
    tools: Vec<SharedTool>,
    agent: Option<Arc<Role>>,
    output_file: Option<PathBuf>,
    async_execution: bool,
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskBuilder {
    pub fn new() -> Self {
        Self {
            description: None,
            expected_output: None,
            tools: Vec::new(),
            agent: None,
            output_file: None,
            async_execution: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn expected_output(mut self, expected_output: impl Into<String>) -> Self {
        self.expected_output = Some(expected_output.into());
        self
    }

    pub fn tool(mut self, tool: SharedTool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn agent(mut self, agent: Arc<Role>) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    pub fn async_execution(mut self, async_execution: bool) -> Self {
        self.async_execution = async_execution;
        self
    }

    pub fn build(self) -> Result<Task> {
        Ok(Task {
            description: self
                .description
                .ok_or(Error::MissingArg("description is required for task".to_string()))?,
            expected_output: self.expected_output.ok_or(Error::MissingArg(
                "expected_output is required for task".to_string(),
            ))?,
            tools: self.tools,
            agent: self
                .agent
                .ok_or(Error::MissingArg("agent is required for task".to_string()))?,
            output_file: self.output_file,
            async_execution: self.async_execution,
        })
    }
}
