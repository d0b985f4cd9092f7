//! Agent contracts driven by the orchestrator.
//!
//! An [`Agent`] is bound to a persona and turns user input and tool results
//! into [`AgentOutput`]s. How it talks to a model is its own business; the
//! orchestrator only relies on the call/return contract below.
//!
//! Agents that can explain their own failures in natural language also
//! implement [`SelfExplainingAgent`] and expose it through
//! [`Agent::as_self_explaining`].

/// Agent lookup and construction.
pub mod registry;

use crate::memory::ConversationContext;
use crate::tools::ToolExecutor;
use crate::types::{AgentOutput, Result, ToolOutcome};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

pub use registry::{AgentConstructor, AgentFactory, AgentRegistry, AgentRegistryBuilder};

/// Base trait for all agents
#[async_trait]
pub trait Agent: Send + Sync {
    /// Identifier the agent was resolved under
    fn id(&self) -> &str;

    /// Start a turn. `user_input` is `None` for agent-initiated turns.
    async fn process_turn(
        &self,
        user_input: Option<&str>,
        context: &mut ConversationContext,
    ) -> Result<AgentOutput>;

    /// Continue a turn with the result of one requested tool call
    async fn handle_tool_result(
        &self,
        call_id: &str,
        payload: &ToolOutcome,
        tool_id: &str,
        context: &mut ConversationContext,
    ) -> Result<AgentOutput>;

    /// Returns the agent as a [`SelfExplainingAgent`] if it can explain its own errors
    fn as_self_explaining(&self) -> Option<&dyn SelfExplainingAgent> {
        None
    }
}

/// Optional capability: turn an internal failure into a user-facing answer.
#[async_trait]
pub trait SelfExplainingAgent: Send + Sync {
    /// Produce a reply explaining `message`. `is_fatal` is set when the turn
    /// cannot continue.
    async fn handle_internal_agent_error(
        &self,
        message: &str,
        context: &mut ConversationContext,
        is_fatal: bool,
    ) -> Result<AgentOutput>;
}

/// Shared dependencies injected into every agent the factory builds.
#[derive(Clone, Default)]
pub struct AgentDependencies {
    /// Executor agents may use to inspect or pre-validate tools
    pub tool_executor: Option<Arc<dyn ToolExecutor>>,
    /// Recursive factory access for agents that delegate to other agents
    pub agent_factory: Option<Arc<dyn AgentFactory>>,
    /// Opaque settings (model selection, prompt options) owned by the host
    pub settings: Map<String, Value>,
}

impl AgentDependencies {
    /// No executor, no factory, no settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tool executor.
    pub fn with_tool_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.tool_executor = Some(executor);
        self
    }

    /// Set the factory for delegation.
    pub fn with_agent_factory(mut self, factory: Arc<dyn AgentFactory>) -> Self {
        self.agent_factory = Some(factory);
        self
    }

    /// Add a host setting.
    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    /// Look a host setting up.
    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }
}

impl std::fmt::Debug for AgentDependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentDependencies")
            .field("tool_executor", &self.tool_executor.is_some())
            .field("agent_factory", &self.agent_factory.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}
