//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod mocks;

use agentos::agents::{Agent, AgentRegistryBuilder};
use agentos::memory::ConversationContext;
use agentos::orchestrator::AgentOrchestrator;
use agentos::tools::ToolExecutor;
use agentos::types::MessageRole;
use agentos::utils::toml_config::OrchestratorConfig;
use std::sync::Arc;

/// Build an orchestrator over the given agents and executor.
pub fn orchestrator(
    agents: Vec<Arc<dyn Agent>>,
    executor: Arc<dyn ToolExecutor>,
    config: OrchestratorConfig,
) -> AgentOrchestrator {
    let registry = agents
        .into_iter()
        .fold(AgentRegistryBuilder::new(), |builder, agent| {
            builder.with_instance(agent)
        })
        .build();
    AgentOrchestrator::new(Arc::new(registry), executor, config)
}

/// Config with a custom iteration budget.
pub fn config_with_max(max_tool_call_iterations: usize) -> OrchestratorConfig {
    OrchestratorConfig {
        max_tool_call_iterations,
        ..OrchestratorConfig::default()
    }
}

pub fn count_role(context: &ConversationContext, role: MessageRole) -> usize {
    context.messages().iter().filter(|m| m.role == role).count()
}

/// Every tool message answers exactly one earlier assistant tool call, and
/// every call id appears in at most one assistant message.
pub fn assert_correlated(context: &ConversationContext) {
    let messages = context.messages();
    for (index, message) in messages.iter().enumerate() {
        if message.role != MessageRole::Tool {
            continue;
        }
        let call_id = message
            .tool_call_id
            .as_deref()
            .expect("tool message without tool_call_id");

        let requests = messages[..index]
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .filter(|m| m.tool_calls.iter().any(|c| c.call_id == call_id))
            .count();
        assert_eq!(
            requests, 1,
            "tool message {} must answer exactly one prior request",
            call_id
        );
        assert!(context.find_tool_call(call_id).is_some());
    }
}

/// Every tool call recorded on an assistant message has a tool message.
pub fn assert_all_answered(context: &ConversationContext) {
    for message in context.messages() {
        for call in &message.tool_calls {
            let answered = context.messages().iter().any(|m| {
                m.role == MessageRole::Tool && m.tool_call_id.as_deref() == Some(call.call_id.as_str())
            });
            assert!(answered, "tool call {} was recorded but never answered", call.call_id);
        }
    }
}
