//! Tool execution for agent turns.
//!
//! Agents request tools with an [`AgentToolCall`]; the orchestrator hands every
//! call of a batch to a [`ToolExecutor`] concurrently and waits for all of them.
//!
//! # Module Structure
//!
//! - [`registry`](crate::tools::registry) - the [`Tool`] trait and the default
//!   registry-backed executor
//!
//! # Error Contract
//!
//! A tool that fails produces a [`ToolResult`] carrying
//! [`ToolOutcome::Error`](crate::types::ToolOutcome::Error). That result goes
//! back into the conversation and to the agent like any other. Returning
//! `Err` from [`ToolExecutor::execute_tool`] is reserved for infrastructure
//! failures and ends the turn.
//!
//! ```ignore
//! let mut registry = ToolRegistry::new();
//! registry.register(Arc::new(MyClock));
//! let call = AgentToolCall::with_id("call_1", "clock", json!({}));
//! let result = registry.execute_tool(&call, &exec_ctx).await?;
//! ```

/// Tool registry for managing available tools.
pub mod registry;

pub use registry::{Tool, ToolRegistry};

use crate::types::{AgentToolCall, Result, ToolExecutionContext, ToolResult};
use async_trait::async_trait;

/// Executes one requested tool invocation.
///
/// Implementations must be safe to call concurrently for distinct calls of
/// the same batch.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Run `call` and return exactly one result with the same `call_id`.
    async fn execute_tool(
        &self,
        call: &AgentToolCall,
        ctx: &ToolExecutionContext,
    ) -> Result<ToolResult>;
}
