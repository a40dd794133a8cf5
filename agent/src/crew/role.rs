use crate::callbacks::{MessageLogger, StepTracer};
use crate::crew::delegation::{AskQuestion, Coworkers, DelegateWork};
use crate::crew::render;
use crate::llm::LLM;
use crate::tools::{CompleteTask, KVMemoryTool, SharedTool, SummarizeHistory};
use crate::{AgentBuilder, DEFAULT_MAX_ITER, Error, Result, TaskCompleted, final_answer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

const ROLE_PROMPT: &str = include_str!("prompts/role.md");

/// Messages kept verbatim when the history gets summarized.
const KEEP_LAST: usize = 4;

/// Who an agent is and what it may use. The crew turns a role into a
/// running agent once per task.
pub struct Role {
    role: String,
    goal: String,
    backstory: String,
    tools: Vec<SharedTool>,
    llm: Arc<dyn LLM + Send + Sync>,
    allow_delegation: bool,
    verbose: bool,
    memory: bool,
    max_iter: usize,
    respect_context_window: bool,
}

/// Everything a role needs besides itself to work on one request.
pub(crate) struct Assignment {
    /// Replaces the role's own tools when non-empty.
    pub tools: Vec<SharedTool>,
    /// Empty when the request may not be delegated further.
    pub coworkers: Vec<Arc<Role>>,
    pub memory: KVMemoryTool,
    pub transcript: Option<PathBuf>,
}

impl Role {
    pub fn builder() -> RoleBuilder {
        RoleBuilder::new()
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn backstory(&self) -> &str {
        &self.backstory
    }

    pub fn tools(&self) -> &[SharedTool] {
        &self.tools
    }

    pub fn llm(&self) -> &Arc<dyn LLM + Send + Sync> {
        &self.llm
    }

    pub fn allow_delegation(&self) -> bool {
        self.allow_delegation
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn memory(&self) -> bool {
        self.memory
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    pub fn is(&self, role: &str) -> bool {
        self.role.trim().eq_ignore_ascii_case(role.trim())
    }

    pub fn system_prompt(&self) -> String {
        render(
            ROLE_PROMPT,
            &[
                ("role", self.role.as_str()),
                ("goal", self.goal.as_str()),
                ("backstory", self.backstory.trim()),
            ],
        )
    }

    /// Runs `request` to completion with a fresh agent and returns its final answer.
    pub(crate) async fn execute(&self, request: String, assignment: Assignment) -> Result<String> {
        let Assignment {
            tools,
            coworkers,
            memory,
            transcript,
        } = assignment;

        let tools = if tools.is_empty() {
            self.tools.clone()
        } else {
            tools
        };

        let mut builder = AgentBuilder::new()
            .system_prompt(self.system_prompt())
            .user_prompt(request)
            .llm(self.llm.clone())
            .tools(tools)
            .tool(Arc::new(CompleteTask))
            .stop_condition(Box::new(TaskCompleted))
            .max_iter(self.max_iter);

        if self.memory {
            builder = builder.tools(memory.tools());
        }

        if self.allow_delegation && !coworkers.is_empty() {
            let coworkers = Coworkers::new(coworkers, memory);
            builder = builder
                .tool(Arc::new(DelegateWork(coworkers.clone())))
                .tool(Arc::new(AskQuestion(coworkers)));
        }

        if self.respect_context_window {
            builder = builder
                .tool(Arc::new(SummarizeHistory::new(self.llm.clone(), KEEP_LAST)))
                .callback(Box::new(SummarizeHistory::new(
                    self.llm.clone(),
                    KEEP_LAST,
                )));
        }

        if self.verbose {
            builder = builder.callback(StepTracer::new(&self.role));
        }

        if let Some(path) = transcript {
            builder = builder.callback(MessageLogger::create(&self.role, &path)?);
        }

        let history = builder.build()?.run().await?;

        debug!(role = %self.role, messages = history.len(), "agent finished");

        final_answer(&history)
            .map(str::to_string)
            .ok_or(Error::AgentWorkflowError(format!(
                "{} finished without a final answer",
                self.role
            )))
    }
}

impl std::fmt::Debug for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Role")
            .field("role", &self.role)
            .field("goal", &self.goal)
            .field("tools", &self.tools.len())
            .field("allow_delegation", &self.allow_delegation)
            .finish_non_exhaustive()
    }
}

pub struct RoleBuilder {
    role: Option<String>,
    goal: Option<String>,
    backstory: Option<String>,
    tools: Vec<SharedTool>,
    llm: Option<Arc<dyn LLM + Send + Sync>>,
    allow_delegation: bool,
    verbose: bool,
    memory: bool,
    max_iter: usize,
    respect_context_window: bool,
}

impl Default for RoleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleBuilder {
    pub fn new() -> Self {
        Self {
            role: None,
            goal: None,
            backstory: None,
            tools: Vec::new(),
            llm: None,
            allow_delegation: false,
            verbose: false,
            memory: false,
            max_iter: DEFAULT_MAX_ITER,
            respect_context_window: true,
        }
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    pub fn backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = Some(backstory.into());
        self
    }

    pub fn tool(mut self, tool: SharedTool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn llm(mut self, llm: Arc<dyn LLM + Send + Sync>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn allow_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn memory(mut self, memory: bool) -> Self {
        self.memory = memory;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn respect_context_window(mut self, respect: bool) -> Self {
        self.respect_context_window = respect;
        self
    }

    pub fn build(self) -> Result<Arc<Role>> {
        let required = |value: Option<String>, name: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or(Error::MissingArg(format!("{} is required for role", name)))
        };

        Ok(Arc::new(Role {
            role: required(self.role, "role")?,
            goal: required(self.goal, "goal")?,
            backstory: required(self.backstory, "backstory")?,
            tools: self.tools,
            llm: self
                .llm
                .ok_or(Error::MissingArg("llm is required for role".to_string()))?,
            allow_delegation: self.allow_delegation,
            verbose: self.verbose,
            memory: self.memory,
            max_iter: self.max_iter,
            respect_context_window: self.respect_context_window,
        }))
    }
}
