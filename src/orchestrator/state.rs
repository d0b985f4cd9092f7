use crate::types::AgentOutput;
use serde::{Deserialize, Serialize};

/// Position of a turn in the orchestration state machine.
///
/// Every turn starts in [`TurnState::ResolvingAgent`] and ends in
/// [`TurnState::Done`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum TurnState {
    /// Looking the target agent up through the factory.
    ResolvingAgent,
    /// Waiting for `process_turn`.
    Processing,
    /// Running the pending tool batch.
    ExecutingTools,
    /// Handing tool results back to the agent one at a time.
    FeedingResults,
    /// Terminal.
    Done(TerminationReason),
}

impl TurnState {
    /// Whether the turn has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Done(_))
    }

    /// Snake-case name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            TurnState::ResolvingAgent => "resolving_agent",
            TurnState::Processing => "processing",
            TurnState::ExecutingTools => "executing_tools",
            TurnState::FeedingResults => "feeding_results",
            TurnState::Done(_) => "done",
        }
    }
}

/// Why a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The agent finished, or had nothing further to do.
    Completed,
    /// The tool loop hit `max_tool_call_iterations`.
    MaxIterations,
    /// The target agent id is unknown.
    AgentNotFound,
    /// An agent call failed or panicked.
    AgentFailure,
    /// The tool executor reported an infrastructure failure.
    ToolInfrastructureFailure,
    /// A step exceeded the configured timeout.
    Timeout,
}

impl TerminationReason {
    /// Whether the turn ended on an error path.
    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            TerminationReason::Completed | TerminationReason::MaxIterations
        )
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::Completed => write!(f, "completed"),
            TerminationReason::MaxIterations => write!(f, "max_iterations"),
            TerminationReason::AgentNotFound => write!(f, "agent_not_found"),
            TerminationReason::AgentFailure => write!(f, "agent_failure"),
            TerminationReason::ToolInfrastructureFailure => {
                write!(f, "tool_infrastructure_failure")
            }
            TerminationReason::Timeout => write!(f, "timeout"),
        }
    }
}

/// Final output of a turn together with how it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Output returned to the caller.
    pub output: AgentOutput,
    /// How the turn ended.
    pub reason: TerminationReason,
    /// Tool execution rounds performed.
    pub iterations: usize,
}
