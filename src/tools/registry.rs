use crate::tools::ToolExecutor;
use crate::types::{
    AgentToolCall, Result, ToolDefinition, ToolExecutionContext, ToolResult,
};
use crate::utils::panic_message;
use crate::utils::toml_config::{AgentOsConfig, ToolConfig};
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

/// A callable tool. Implementations are registered with [`ToolRegistry`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name, matched against `AgentToolCall::tool_id`.
    fn name(&self) -> &str;
    /// Default description for tool definitions.
    fn description(&self) -> &str;
    /// JSON Schema of the arguments.
    fn parameters_schema(&self) -> Value;
    /// Run the tool with the call's arguments.
    async fn execute(&self, args: Value, ctx: &ToolExecutionContext) -> Result<Value>;
}

/// Registry of named tools; the default [`ToolExecutor`].
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    configs: HashMap<String, ToolConfig>,
    /// Held while an `exclusive` tool runs.
    exclusive_lock: Mutex<()>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Empty registry with default settings for every tool.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            configs: HashMap::new(),
            exclusive_lock: Mutex::new(()),
        }
    }

    /// Create an empty registry that applies the `[tools.*]` settings of `config`
    pub fn with_config(config: &AgentOsConfig) -> Self {
        Self {
            configs: config.tools.clone(),
            ..Self::new()
        }
    }

    /// Add a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Override the settings for a single tool
    pub fn configure(&mut self, name: &str, config: ToolConfig) {
        self.configs.insert(name.to_string(), config);
    }

    /// Definitions of every enabled tool.
    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .filter(|tool| self.is_enabled(tool.name()))
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: self
                    .configs
                    .get(tool.name())
                    .and_then(|c| c.description.clone())
                    .unwrap_or_else(|| tool.description().to_string()),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    /// Get a list of all registered tool names
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Check if a tool is registered
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    fn is_enabled(&self, name: &str) -> bool {
        self.configs.get(name).map(|c| c.enabled).unwrap_or(true)
    }

    fn tool_timeout(&self, name: &str) -> Duration {
        let secs = self
            .configs
            .get(name)
            .map(|c| c.timeout_secs)
            .unwrap_or_else(|| ToolConfig::default().timeout_secs);
        Duration::from_secs(secs)
    }

    fn is_exclusive(&self, name: &str) -> bool {
        self.configs.get(name).map(|c| c.exclusive).unwrap_or(false)
    }

    async fn run_with_timeout(
        &self,
        tool: &Arc<dyn Tool>,
        call: &AgentToolCall,
        ctx: &ToolExecutionContext,
    ) -> ToolResult {
        let limit = self.tool_timeout(&call.tool_id);
        let run = AssertUnwindSafe(tool.execute(call.arguments.clone(), ctx)).catch_unwind();
        match timeout(limit, run).await {
            Ok(Ok(Ok(value))) => ToolResult::success(&call.call_id, &call.tool_id, value),
            Ok(Ok(Err(e))) => ToolResult::failure(&call.call_id, &call.tool_id, e.to_string()),
            Ok(Err(payload)) => ToolResult::failure(
                &call.call_id,
                &call.tool_id,
                format!("Tool panicked: {}", panic_message(&*payload)),
            ),
            Err(_) => ToolResult::failure(
                &call.call_id,
                &call.tool_id,
                format!("Tool execution timed out after {}s", limit.as_secs()),
            ),
        }
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute_tool(
        &self,
        call: &AgentToolCall,
        ctx: &ToolExecutionContext,
    ) -> Result<ToolResult> {
        let Some(tool) = self.tools.get(&call.tool_id) else {
            return Ok(ToolResult::failure(
                &call.call_id,
                &call.tool_id,
                format!("Tool not found: {}", call.tool_id),
            ));
        };

        if !self.is_enabled(&call.tool_id) {
            return Ok(ToolResult::failure(
                &call.call_id,
                &call.tool_id,
                format!("Tool is disabled: {}", call.tool_id),
            ));
        }

        tracing::debug!(
            tool = %call.tool_id,
            call_id = %call.call_id,
            agent_id = %ctx.agent_id,
            "executing tool"
        );

        let result = if self.is_exclusive(&call.tool_id) {
            let _guard = self.exclusive_lock.lock().await;
            self.run_with_timeout(tool, call, ctx).await
        } else {
            self.run_with_timeout(tool, call, ctx).await
        };

        if let crate::types::ToolOutcome::Error(e) = &result.outcome {
            tracing::warn!(tool = %call.tool_id, call_id = %call.call_id, "tool failed: {}", e);
        }

        Ok(result)
    }
}
