//! Pluggable memory tool creators (spec §2, §6.2): each wraps a
//! [`MemoryService`] behind the graph engine's [`CallableTool`] contract so
//! an agent can add/update/delete/clear/load/search memories as ordinary
//! tool calls.

use crate::model::{MemoryKey, UserKey};
use crate::service::MemoryService;
use async_trait::async_trait;
use langgraph_core::{CallableTool, CallableToolError, ToolDeclaration};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn decode<T: for<'de> Deserialize<'de>>(
    tool: &str,
    raw_args: &[u8],
) -> Result<T, CallableToolError> {
    serde_json::from_slice(raw_args).map_err(|e| CallableToolError::ExecutionFailed {
        tool: tool.to_string(),
        message: format!("invalid arguments: {e}"),
    })
}

fn encode<T: Serialize>(tool: &str, value: &T) -> Result<Vec<u8>, CallableToolError> {
    serde_json::to_vec(value).map_err(|e| CallableToolError::ExecutionFailed {
        tool: tool.to_string(),
        message: format!("failed to encode result: {e}"),
    })
}

fn wrap_err(tool: &str, err: crate::error::MemoryError) -> CallableToolError {
    CallableToolError::ExecutionFailed {
        tool: tool.to_string(),
        message: err.to_string(),
    }
}

#[derive(Deserialize)]
struct AddArgs {
    app_name: String,
    user_id: String,
    memory: String,
    #[serde(default)]
    topics: Vec<String>,
}

pub struct AddMemoryTool {
    service: Arc<dyn MemoryService>,
}

impl AddMemoryTool {
    pub fn new(service: Arc<dyn MemoryService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CallableTool for AddMemoryTool {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: "memory_add".to_string(),
            description: "Add a new long-term memory for a user".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["app_name", "user_id", "memory"],
                "properties": {
                    "app_name": {"type": "string"},
                    "user_id": {"type": "string"},
                    "memory": {"type": "string"},
                    "topics": {"type": "array", "items": {"type": "string"}}
                }
            }),
            output_schema: None,
        }
    }

    async fn call(&self, raw_args: &[u8]) -> Result<Vec<u8>, CallableToolError> {
        let args: AddArgs = decode("memory_add", raw_args)?;
        let user = UserKey::new(args.app_name, args.user_id);
        let entry = self
            .service
            .add(&user, args.memory, args.topics)
            .await
            .map_err(|e| wrap_err("memory_add", e))?;
        encode("memory_add", &entry)
    }
}

#[derive(Deserialize)]
struct UpdateArgs {
    app_name: String,
    user_id: String,
    memory_id: String,
    memory: String,
    #[serde(default)]
    topics: Vec<String>,
}

pub struct UpdateMemoryTool {
    service: Arc<dyn MemoryService>,
}

impl UpdateMemoryTool {
    pub fn new(service: Arc<dyn MemoryService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CallableTool for UpdateMemoryTool {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: "memory_update".to_string(),
            description: "Update an existing long-term memory".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["app_name", "user_id", "memory_id", "memory"],
                "properties": {
                    "app_name": {"type": "string"},
                    "user_id": {"type": "string"},
                    "memory_id": {"type": "string"},
                    "memory": {"type": "string"},
                    "topics": {"type": "array", "items": {"type": "string"}}
                }
            }),
            output_schema: None,
        }
    }

    async fn call(&self, raw_args: &[u8]) -> Result<Vec<u8>, CallableToolError> {
        let args: UpdateArgs = decode("memory_update", raw_args)?;
        let key = MemoryKey {
            app_name: args.app_name,
            user_id: args.user_id,
            memory_id: args.memory_id,
        };
        let entry = self
            .service
            .update(&key, args.memory, args.topics)
            .await
            .map_err(|e| wrap_err("memory_update", e))?;
        encode("memory_update", &entry)
    }
}

#[derive(Deserialize)]
struct DeleteArgs {
    app_name: String,
    user_id: String,
    memory_id: String,
}

pub struct DeleteMemoryTool {
    service: Arc<dyn MemoryService>,
}

impl DeleteMemoryTool {
    pub fn new(service: Arc<dyn MemoryService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CallableTool for DeleteMemoryTool {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: "memory_delete".to_string(),
            description: "Delete a long-term memory by id".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["app_name", "user_id", "memory_id"],
                "properties": {
                    "app_name": {"type": "string"},
                    "user_id": {"type": "string"},
                    "memory_id": {"type": "string"}
                }
            }),
            output_schema: None,
        }
    }

    async fn call(&self, raw_args: &[u8]) -> Result<Vec<u8>, CallableToolError> {
        let args: DeleteArgs = decode("memory_delete", raw_args)?;
        let key = MemoryKey {
            app_name: args.app_name,
            user_id: args.user_id,
            memory_id: args.memory_id,
        };
        self.service
            .delete(&key)
            .await
            .map_err(|e| wrap_err("memory_delete", e))?;
        encode("memory_delete", &serde_json::json!({"deleted": true}))
    }
}

#[derive(Deserialize)]
struct UserScopedArgs {
    app_name: String,
    user_id: String,
}

pub struct ClearMemoryTool {
    service: Arc<dyn MemoryService>,
}

impl ClearMemoryTool {
    pub fn new(service: Arc<dyn MemoryService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CallableTool for ClearMemoryTool {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: "memory_clear".to_string(),
            description: "Delete every memory for a user".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["app_name", "user_id"],
                "properties": {
                    "app_name": {"type": "string"},
                    "user_id": {"type": "string"}
                }
            }),
            output_schema: None,
        }
    }

    async fn call(&self, raw_args: &[u8]) -> Result<Vec<u8>, CallableToolError> {
        let args: UserScopedArgs = decode("memory_clear", raw_args)?;
        let user = UserKey::new(args.app_name, args.user_id);
        self.service
            .clear(&user)
            .await
            .map_err(|e| wrap_err("memory_clear", e))?;
        encode("memory_clear", &serde_json::json!({"cleared": true}))
    }
}

#[derive(Deserialize)]
struct LoadArgs {
    app_name: String,
    user_id: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    20
}

pub struct LoadMemoryTool {
    service: Arc<dyn MemoryService>,
}

impl LoadMemoryTool {
    pub fn new(service: Arc<dyn MemoryService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CallableTool for LoadMemoryTool {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: "memory_load".to_string(),
            description: "Load a user's most recent memories, newest first".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["app_name", "user_id"],
                "properties": {
                    "app_name": {"type": "string"},
                    "user_id": {"type": "string"},
                    "limit": {"type": "integer", "minimum": 1}
                }
            }),
            output_schema: None,
        }
    }

    async fn call(&self, raw_args: &[u8]) -> Result<Vec<u8>, CallableToolError> {
        let args: LoadArgs = decode("memory_load", raw_args)?;
        let user = UserKey::new(args.app_name, args.user_id);
        let entries = self
            .service
            .read(&user, args.limit)
            .await
            .map_err(|e| wrap_err("memory_load", e))?;
        encode("memory_load", &entries)
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    app_name: String,
    user_id: String,
    query: String,
}

pub struct SearchMemoryTool {
    service: Arc<dyn MemoryService>,
}

impl SearchMemoryTool {
    pub fn new(service: Arc<dyn MemoryService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CallableTool for SearchMemoryTool {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: "memory_search".to_string(),
            description: "Search a user's memories by substring or exact topic".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["app_name", "user_id", "query"],
                "properties": {
                    "app_name": {"type": "string"},
                    "user_id": {"type": "string"},
                    "query": {"type": "string"}
                }
            }),
            output_schema: None,
        }
    }

    async fn call(&self, raw_args: &[u8]) -> Result<Vec<u8>, CallableToolError> {
        let args: SearchArgs = decode("memory_search", raw_args)?;
        let user = UserKey::new(args.app_name, args.user_id);
        let matches = self
            .service
            .search(&user, &args.query)
            .await
            .map_err(|e| wrap_err("memory_search", e))?;
        let texts: Vec<&str> = matches.iter().map(|m| m.entry.memory_text.as_str()).collect();
        encode("memory_search", &texts)
    }
}

/// Builds the full enabled-tools set for a memory service, in the order
/// `{add, update, delete, clear, load, search}`.
pub fn default_tools(service: Arc<dyn MemoryService>) -> Vec<Arc<dyn CallableTool>> {
    vec![
        Arc::new(AddMemoryTool::new(service.clone())),
        Arc::new(UpdateMemoryTool::new(service.clone())),
        Arc::new(DeleteMemoryTool::new(service.clone())),
        Arc::new(ClearMemoryTool::new(service.clone())),
        Arc::new(LoadMemoryTool::new(service.clone())),
        Arc::new(SearchMemoryTool::new(service)),
    ]
}

/// Builds the system-instruction text describing a set of enabled memory
/// tools (spec §2's "instruction-prompt builder"), for a caller to prepend
/// to a request's system message the same way a global-instruction plugin
/// prepends its own fixed text. Returns an empty string for an empty tool
/// set, so prepending it is always a safe no-op.
///
/// # Examples
///
/// ```
/// use memory::service::InMemoryMemoryService;
/// use memory::tools::{default_tools, instruction_prompt};
/// use std::sync::Arc;
///
/// let service: Arc<dyn memory::MemoryService> = Arc::new(InMemoryMemoryService::default());
/// let tools = default_tools(service);
/// let prompt = instruction_prompt(&tools);
/// assert!(prompt.contains("memory_add"));
/// assert!(prompt.contains("memory_search"));
/// ```
pub fn instruction_prompt(tools: &[Arc<dyn CallableTool>]) -> String {
    if tools.is_empty() {
        return String::new();
    }

    let mut prompt = String::from(
        "You have access to long-term memory tools for this user. Use them to recall \
         relevant facts before answering and to record new facts worth remembering:\n",
    );
    for tool in tools {
        let declaration = tool.declaration();
        prompt.push_str("- ");
        prompt.push_str(&declaration.name);
        prompt.push_str(": ");
        prompt.push_str(&declaration.description);
        prompt.push('\n');
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::InMemoryMemoryService;

    #[tokio::test]
    async fn add_then_search_round_trip() {
        let service: Arc<dyn MemoryService> = Arc::new(InMemoryMemoryService::new(50));
        let add = AddMemoryTool::new(service.clone());
        let search = SearchMemoryTool::new(service.clone());

        let raw = serde_json::to_vec(&serde_json::json!({
            "app_name": "app",
            "user_id": "u1",
            "memory": "alice likes tea",
            "topics": ["beverage"]
        }))
        .unwrap();
        add.call(&raw).await.unwrap();

        let raw_query = serde_json::to_vec(&serde_json::json!({
            "app_name": "app",
            "user_id": "u1",
            "query": "tea"
        }))
        .unwrap();
        let result = search.call(&raw_query).await.unwrap();
        let texts: Vec<String> = serde_json::from_slice(&result).unwrap();
        assert_eq!(texts, vec!["alice likes tea".to_string()]);
    }

    #[tokio::test]
    async fn default_tools_returns_all_six_in_order() {
        let service: Arc<dyn MemoryService> = Arc::new(InMemoryMemoryService::new(50));
        let tools = default_tools(service);
        let names: Vec<String> = tools.iter().map(|t| t.declaration().name).collect();
        assert_eq!(
            names,
            vec![
                "memory_add",
                "memory_update",
                "memory_delete",
                "memory_clear",
                "memory_load",
                "memory_search",
            ]
        );
    }

    #[tokio::test]
    async fn instruction_prompt_lists_every_tool_by_name() {
        let service: Arc<dyn MemoryService> = Arc::new(InMemoryMemoryService::new(50));
        let tools = default_tools(service);
        let prompt = instruction_prompt(&tools);
        for name in ["memory_add", "memory_update", "memory_delete", "memory_clear", "memory_load", "memory_search"] {
            assert!(prompt.contains(name), "missing {name} in prompt: {prompt}");
        }
    }

    #[test]
    fn instruction_prompt_is_empty_for_no_tools() {
        assert_eq!(instruction_prompt(&[]), "");
    }
}
