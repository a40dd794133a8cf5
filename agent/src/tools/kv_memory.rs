use crate::Result;
use crate::llm::Message;
use crate::tools::{FunctionalTool, NoArgs, SharedTool, ToolCall, ToolDefinition};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Key/value notes shared by every agent that holds a clone.
#[derive(Clone, Default)]
pub struct KVMemoryTool {
    memory: Arc<Mutex<BTreeMap<String, String>>>,
}

impl KVMemoryTool {
    pub fn new() -> Self {
        Self::default()
    }

    fn memory(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.memory().len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory().is_empty()
    }

    fn list_keys(&self) -> String {
        let mut s = "Keys in memory:\n".to_string();
        for key in self.memory().keys() {
            s.push_str(&format!("- {}\n", key));
        }
        s
    }

    fn get_key(&self, key: &str) -> String {
        self.memory()
            .get(key)
            .map(|value| format!("value of key {}:\n{}", key, value))
            .unwrap_or(format!("key {} is not in memory", key))
    }

    fn set_key(&self, key: String, value: String) -> String {
        let msg = format!("key {} inserted into memory", key);
        self.memory().insert(key, value);
        msg
    }

    fn list_tool(&self) -> MemoryListTool {
        MemoryListTool(self.clone())
    }

    fn get_tool(&self) -> MemoryGetTool {
        MemoryGetTool(self.clone())
    }

    fn set_tool(&self) -> MemorySetTool {
        MemorySetTool(self.clone())
    }

    pub fn tools(&self) -> Vec<SharedTool> {
        vec![
            Arc::new(self.list_tool()) as SharedTool,
            Arc::new(self.get_tool()),
            Arc::new(self.set_tool()),
        ]
    }
}

struct MemoryListTool(KVMemoryTool);

#[async_trait]
impl FunctionalTool for MemoryListTool {
    fn definition(&self) -> Result<ToolDefinition> {
        ToolDefinition::new::<NoArgs>(
            "memory_list_keys",
            "list the keys of the notes the crew has saved in memory",
        )
    }

    async fn invoke_fn(&self, call: &ToolCall) -> Result<Message> {
        Ok(call.result(self.0.list_keys()))
    }
}

#[derive(Deserialize, JsonSchema)]
struct MemoryGetArgs {
    key: String,
}

struct MemoryGetTool(KVMemoryTool);

#[async_trait]
impl FunctionalTool for MemoryGetTool {
    fn definition(&self) -> Result<ToolDefinition> {
        ToolDefinition::new::<MemoryGetArgs>(
            "memory_get_key",
            "get the note associated with the given key in memory",
        )
    }

    async fn invoke_fn(&self, call: &ToolCall) -> Result<Message> {
        let args: MemoryGetArgs = call.args()?;
        Ok(call.result(self.0.get_key(&args.key)))
    }
}

#[derive(Deserialize, JsonSchema)]
struct MemorySetArgs {
    key: String,
    value: String,
}

struct MemorySetTool(KVMemoryTool);

#[async_trait]
impl FunctionalTool for MemorySetTool {
    fn definition(&self) -> Result<ToolDefinition> {
        ToolDefinition::new::<MemorySetArgs>(
            "memory_set_key",
            "save a note under the given key so that you and your coworkers can retrieve it later",
        )
    }

    async fn invoke_fn(&self, call: &ToolCall) -> Result<Message> {
        let args: MemorySetArgs = call.args()?;
        Ok(call.result(self.0.set_key(args.key, args.value)))
    }
}
