mod delegation;
mod role;
mod task;

pub use role::{Role, RoleBuilder};
pub use task::{Task, TaskBuilder, TaskOutput};

use crate::tools::KVMemoryTool;
use crate::{Error, Result};
use role::Assignment;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::info;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Process {
    #[default]
    Sequential,
}

#[derive(Clone, Debug)]
pub struct CrewOutput {
    /// Output of the last task.
    pub raw: String,
    pub tasks_output: Vec<TaskOutput>,
}

impl std::fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug)]
pub struct Crew {
    agents: Vec<Arc<Role>>,
    tasks: Vec<Task>,
    process: Process,
    log_dir: Option<PathBuf>,
}

impl Crew {
    pub fn new(agents: Vec<Arc<Role>>, tasks: Vec<Task>, process: Process) -> Result<Self> {
        if agents.is_empty() {
            return Err(Error::InvalidCrew("a crew needs at least one agent".to_string()));
        }
        if tasks.is_empty() {
            return Err(Error::InvalidCrew("a crew needs at least one task".to_string()));
        }

        for (i, agent) in agents.iter().enumerate() {
            if agents[..i].iter().any(|other| other.is(agent.role())) {
                return Err(Error::InvalidCrew(format!(
                    "role {} appears more than once",
                    agent.role()
                )));
            }
        }

        for task in &tasks {
            if !agents.iter().any(|agent| agent.is(task.agent().role())) {
                return Err(Error::InvalidCrew(format!(
                    "task \"{}\" is assigned to {} who is not part of the crew",
                    task.description(),
                    task.agent().role()
                )));
            }
        }

        Ok(Self {
            agents,
            tasks,
            process,
            log_dir: None,
        })
    }

    /// Write a markdown transcript of every task into `dir`.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn agents(&self) -> &[Arc<Role>] {
        &self.agents
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn process(&self) -> Process {
        self.process
    }

    pub async fn kickoff(&self) -> Result<CrewOutput> {
        info!(
            agents = self.agents.len(),
            tasks = self.tasks.len(),
            process = ?self.process,
            "crew kickoff"
        );

        match self.process {
            Process::Sequential => self.run_sequential().await,
        }
    }

    async fn run_sequential(&self) -> Result<CrewOutput> {
        let memory = KVMemoryTool::new();
        let mut outputs: Vec<(usize, TaskOutput)> = Vec::new();
        let mut pending: JoinSet<Result<(usize, TaskOutput)>> = JoinSet::new();

        for (index, task) in self.tasks.iter().enumerate() {
            if task.async_execution() {
                let run = self.task_run(index, task, &outputs, &memory);
                pending.spawn(async move { run.execute().await.map(|output| (index, output)) });
                continue;
            }

            join_pending(&mut pending, &mut outputs).await?;

            let output = self
                .task_run(index, task, &outputs, &memory)
                .execute()
                .await?;
            outputs.push((index, output));
        }

        join_pending(&mut pending, &mut outputs).await?;

        let tasks_output = outputs
            .into_iter()
            .map(|(_, output)| output)
            .collect::<Vec<_>>();

        let raw = tasks_output
            .last()
            .map(|output| output.raw.clone())
            .ok_or(Error::AgentWorkflowError("crew produced no output".to_string()))?;

        info!(tasks = tasks_output.len(), "crew finished");

        Ok(CrewOutput { raw, tasks_output })
    }

    fn task_run(
        &self,
        index: usize,
        task: &Task,
        outputs: &[(usize, TaskOutput)],
        memory: &KVMemoryTool,
    ) -> TaskRun {
        let role = task.agent();

        TaskRun {
            index,
            task: task.clone(),
            context: outputs.iter().map(|(_, output)| output.clone()).collect(),
            coworkers: self
                .agents
                .iter()
                .filter(|agent| !agent.is(role.role()))
                .cloned()
                .collect(),
            memory: memory.clone(),
            transcript: self
                .log_dir
                .as_ref()
                .map(|dir| dir.join(format!("{:02}-{}.md", index + 1, slug(role.role())))),
        }
    }
}

async fn join_pending(
    pending: &mut JoinSet<Result<(usize, TaskOutput)>>,
    outputs: &mut Vec<(usize, TaskOutput)>,
) -> Result<()> {
    while let Some(result) = pending.join_next().await {
        outputs.push(result??);
    }
    outputs.sort_by_key(|(index, _)| *index);
    Ok(())
}

fn slug(role: &str) -> String {
    role.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

struct TaskRun {
    index: usize,
    task: Task,
    context: Vec<TaskOutput>,
    coworkers: Vec<Arc<Role>>,
    memory: KVMemoryTool,
    transcript: Option<PathBuf>,
}

impl TaskRun {
    async fn execute(self) -> Result<TaskOutput> {
        let role = self.task.agent().clone();

        info!(task = self.index + 1, role = %role.role(), "task started");

        let raw = role
            .execute(
                self.task.prompt(&self.context),
                Assignment {
                    tools: self.task.tools().to_vec(),
                    coworkers: self.coworkers,
                    memory: self.memory,
                    transcript: self.transcript,
                },
            )
            .await?;

        if let Some(path) = self.task.output_file() {
            write_output(path, &raw).await?;
            info!(task = self.index + 1, path = %path.display(), "task output written");
        }

        info!(task = self.index + 1, role = %role.role(), "task finished");

        Ok(TaskOutput {
            description: self.task.description().to_string(),
            agent: role.role().to_string(),
            raw,
        })
    }
}

/// Fills `{key}` placeholders in a single pass. Inserted values are never scanned again.
pub(crate) fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let placeholder = values
            .iter()
            .find(|(key, _)| tail.starts_with(*key) && tail[key.len()..].starts_with('}'));

        match placeholder {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

async fn write_output(path: &Path, raw: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, raw).await?;
    Ok(())
}
