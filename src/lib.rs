//! # AgentOS - Agent Turn Orchestration
//!
//! The turn engine of a conversational multi-agent system. Given a user
//! message, a target agent and a conversation, it drives the agent through
//! zero or more rounds of concurrent tool calls until the agent produces a
//! final answer, fails, or exhausts its iteration budget.
//!
//! ## Overview
//!
//! - Agents are resolved by id through an [`AgentFactory`] and implement the
//!   [`Agent`] contract.
//! - Tools are executed through a [`ToolExecutor`]; [`ToolRegistry`] is the
//!   default one.
//! - Every step lands in the [`ConversationContext`] as a [`Message`], so the
//!   log always shows which tool result answers which request.
//! - The caller always gets exactly one [`AgentOutput`] back, even when an
//!   agent errors, panics or hangs.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use agentos::{AgentOrchestrator, AgentOsConfig, AgentRegistryBuilder, ConversationContext, ToolRegistry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentOsConfig::load_with_env(Some("agentos.toml".as_ref()))?;
//!     agentos::init_tracing(&config.logging)?;
//!
//!     let agents = AgentRegistryBuilder::new()
//!         .with_instance(Arc::new(MyAgent::default()))
//!         .build();
//!     let mut tools = ToolRegistry::with_config(&config);
//!     tools.register(Arc::new(MyClock));
//!
//!     let orchestrator = AgentOrchestrator::new(
//!         Arc::new(agents),
//!         Arc::new(tools),
//!         config.orchestrator.clone(),
//!     );
//!
//!     let mut context = ConversationContext::new("session-1", "user-1");
//!     let output = orchestrator
//!         .process_agent_turn(&mut context, Some("What time is it?"), "my-agent")
//!         .await;
//!     println!("{:?}", output.response_text);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`agents`] - Agent contracts and the agent registry
//! - [`memory`] - Conversation context and per-session storage
//! - [`orchestrator`] - The turn state machine
//! - [`tools`] - Tool executor contract and registry
//! - [`types`] - Messages, tool calls, outputs and errors
//! - [`utils`] - Configuration and logging

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Agent contracts and resolution.
pub mod agents;
/// Conversation memory and context management.
pub mod memory;
/// Agent turn orchestration.
pub mod orchestrator;
/// Tool execution contract and registry.
pub mod tools;
/// Core types (messages, tool calls, outputs, errors).
pub mod types;
/// Configuration and logging utilities.
pub mod utils;

// Re-export commonly used types
pub use agents::{
    Agent, AgentDependencies, AgentFactory, AgentRegistry, AgentRegistryBuilder,
    SelfExplainingAgent,
};
pub use memory::{ConversationContext, SessionStore};
pub use orchestrator::{AgentOrchestrator, TerminationReason, TurnEvent, TurnOutcome, TurnState};
pub use tools::{Tool, ToolExecutor, ToolRegistry};
pub use types::{
    AgentOutput, AgentToolCall, AppError, Message, MessageRole, Result, ToolExecutionContext,
    ToolOutcome, ToolResult,
};
pub use utils::init_tracing;
pub use utils::toml_config::{AgentOsConfig, OrchestratorConfig};
