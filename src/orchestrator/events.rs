//! Turn lifecycle events: lets a host observe a turn (for SSE, audit logs,
//! or tests) without scraping log output.

use crate::orchestrator::state::{TerminationReason, TurnState};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// One lifecycle event of a turn (serializable as JSON for front ends).
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// A turn began.
    TurnStarted {
        /// Session the turn runs in.
        session_id: String,
        /// Requested agent.
        agent_id: String,
    },
    /// The state machine moved.
    StateChanged {
        /// State entered.
        state: TurnState,
    },
    /// The agent produced output (initial or after a tool result).
    AgentResponded {
        /// Whether the output carries response text.
        has_text: bool,
        /// Number of tool calls requested.
        tool_calls: usize,
        /// Whether the agent declared the turn finished.
        is_complete: bool,
    },
    /// A tool batch is about to run.
    ToolBatchStarted {
        /// One-based round number.
        iteration: usize,
        /// Calls in the batch.
        batch_size: usize,
    },
    /// All tools of the batch returned.
    ToolBatchCompleted {
        /// One-based round number.
        iteration: usize,
        /// Results that carry an error.
        failed: usize,
    },
    /// A tool result was handed back to the agent.
    ToolResultFed {
        /// Call the result answers.
        call_id: String,
        /// Tool that produced it.
        tool_id: String,
    },
    /// The turn reached a terminal state.
    TurnFinished {
        /// How the turn ended.
        reason: TerminationReason,
        /// Tool rounds performed.
        iterations: usize,
    },
}

/// Fire-and-forget sender; a dropped receiver never affects the turn.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventEmitter {
    tx: Option<UnboundedSender<TurnEvent>>,
}

impl EventEmitter {
    pub(crate) fn new(tx: Option<UnboundedSender<TurnEvent>>) -> Self {
        Self { tx }
    }

    pub(crate) fn emit(&self, event: TurnEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
