//! Agent Turn Orchestration
//!
//! This module provides the [`AgentOrchestrator`], which drives one user turn
//! through an agent to a single final [`AgentOutput`]:
//!
//! 1. Resolve the target agent through the [`AgentFactory`]
//! 2. Ask the agent to process the input
//! 3. While the agent requests tools, run the whole batch concurrently
//! 4. Record each result in the conversation and feed them back one by one
//! 5. Stop on completion, on failure, or when the iteration budget runs out
//!
//! The loop is an explicit state machine ([`TurnState`]) advanced by a single
//! dispatch function. Every external call (agent, tool batch, result feedback)
//! is fenced: errors, panics and timeouts all end the turn with an
//! `AgentOutput { is_complete: true, error: Some(..) }` and a matching
//! message in the context. Nothing escapes [`AgentOrchestrator::process_agent_turn`].
//!
//! # Example
//!
//! ```rust,ignore
//! use agentos::{AgentOrchestrator, AgentRegistry, ConversationContext, ToolRegistry};
//! use std::sync::Arc;
//!
//! let orchestrator = AgentOrchestrator::new(
//!     Arc::new(agent_registry),
//!     Arc::new(ToolRegistry::new()),
//!     OrchestratorConfig::default(),
//! );
//!
//! let mut context = ConversationContext::new("session-1", "user-1");
//! let output = orchestrator
//!     .process_agent_turn(&mut context, Some("What's the weather?"), "assistant")
//!     .await;
//! println!("{:?}", output.response_text);
//! ```

/// Observable turn lifecycle.
pub mod events;
/// Turn states and outcomes.
pub mod state;

pub use events::TurnEvent;
pub use state::{TerminationReason, TurnOutcome, TurnState};

use crate::agents::{Agent, AgentDependencies, AgentFactory};
use crate::memory::{ConversationContext, SessionStore, CURRENT_AGENT_MOOD_KEY};
use crate::tools::ToolExecutor;
use crate::types::{
    AgentOutput, AgentToolCall, AppError, Message, MessageRole, Result, ToolExecutionContext,
    ToolResult,
};
use crate::utils::panic_message;
use crate::utils::toml_config::OrchestratorConfig;
use events::EventEmitter;
use futures::future::join_all;
use futures::FutureExt;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::timeout;
use tracing::{debug, error, info, warn, Instrument};

const AGENT_NOT_FOUND_RESPONSE: &str =
    "I'm sorry, I couldn't find the assistant you asked for. Please pick another one and try again.";

const GENERIC_APOLOGY: &str =
    "I'm sorry, something went wrong while I was working on that. Please try again in a moment.";

const LOOP_SUFFIX: &str =
    "I seem to be stuck in a loop trying to complete this. Could you clarify or rephrase your request?";

/// Why a fenced step did not produce a value.
#[derive(Debug, thiserror::Error)]
enum StepFailure {
    #[error("{0}")]
    Failed(AppError),
    #[error("panicked: {0}")]
    Panicked(String),
    #[error("timed out after {0} ms")]
    TimedOut(u128),
}

impl StepFailure {
    fn reason(&self, otherwise: TerminationReason) -> TerminationReason {
        match self {
            StepFailure::TimedOut(_) => TerminationReason::Timeout,
            _ => otherwise,
        }
    }
}

/// Mutable state of one turn, threaded through the dispatch function.
struct TurnRun<'a> {
    context: &'a mut ConversationContext,
    user_input: Option<&'a str>,
    agent_id: &'a str,
    agent: Option<Arc<dyn Agent>>,
    /// Latest output; returned when the turn ends.
    output: AgentOutput,
    /// Calls waiting for the next tool batch, in request order.
    pending: Vec<AgentToolCall>,
    /// Pending calls not yet written to an assistant message.
    unrecorded: Vec<AgentToolCall>,
    /// Results of the last batch waiting to be fed back.
    results: Vec<ToolResult>,
    iteration: usize,
    /// Every call id present in the log, so new ids never collide.
    seen_call_ids: HashSet<String>,
}

impl<'a> TurnRun<'a> {
    fn new(
        context: &'a mut ConversationContext,
        user_input: Option<&'a str>,
        agent_id: &'a str,
    ) -> Self {
        let seen_call_ids = context
            .messages()
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .flat_map(|m| m.tool_calls.iter().map(|c| c.call_id.clone()))
            .collect();

        Self {
            context,
            user_input,
            agent_id,
            agent: None,
            output: AgentOutput::default(),
            pending: Vec::new(),
            unrecorded: Vec::new(),
            results: Vec::new(),
            iteration: 0,
            seen_call_ids,
        }
    }

    fn exec_context(&self) -> ToolExecutionContext {
        ToolExecutionContext {
            user_id: self.context.user_id().to_string(),
            conversation_id: self.context.session_id().to_string(),
            agent_id: self.agent_id.to_string(),
        }
    }
}

/// Drives user turns through agents and their tool calls.
pub struct AgentOrchestrator {
    agent_factory: Arc<dyn AgentFactory>,
    tool_executor: Arc<dyn ToolExecutor>,
    deps: AgentDependencies,
    config: OrchestratorConfig,
    events: EventEmitter,
}

impl AgentOrchestrator {
    /// Create an orchestrator. Agents are built with the same factory and
    /// executor as dependencies unless [`with_dependencies`](Self::with_dependencies)
    /// overrides them.
    pub fn new(
        agent_factory: Arc<dyn AgentFactory>,
        tool_executor: Arc<dyn ToolExecutor>,
        config: OrchestratorConfig,
    ) -> Self {
        let deps = AgentDependencies::new()
            .with_tool_executor(Arc::clone(&tool_executor))
            .with_agent_factory(Arc::clone(&agent_factory));

        Self {
            agent_factory,
            tool_executor,
            deps,
            config,
            events: EventEmitter::default(),
        }
    }

    /// Replace the dependencies handed to the agent factory.
    pub fn with_dependencies(mut self, deps: AgentDependencies) -> Self {
        self.deps = deps;
        self
    }

    /// Send [`TurnEvent`]s for every turn to `tx`.
    pub fn with_event_sender(mut self, tx: UnboundedSender<TurnEvent>) -> Self {
        self.events = EventEmitter::new(Some(tx));
        self
    }

    /// Limits this orchestrator runs turns with.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Drive one turn and return its final output.
    pub async fn process_agent_turn(
        &self,
        context: &mut ConversationContext,
        user_input: Option<&str>,
        target_agent_id: &str,
    ) -> AgentOutput {
        self.run_turn(context, user_input, target_agent_id)
            .await
            .output
    }

    /// Run one turn against the session's context, holding the session lock
    /// for the whole turn.
    pub async fn process_session_turn(
        &self,
        store: &SessionStore,
        session_id: &str,
        user_id: &str,
        user_input: Option<&str>,
        target_agent_id: &str,
    ) -> AgentOutput {
        let handle = store.get_or_create(session_id, user_id);
        let mut context = handle.lock().await;
        self.process_agent_turn(&mut context, user_input, target_agent_id)
            .await
    }

    /// Drive one turn and report how it ended.
    pub async fn run_turn(
        &self,
        context: &mut ConversationContext,
        user_input: Option<&str>,
        target_agent_id: &str,
    ) -> TurnOutcome {
        let span = tracing::info_span!(
            "agent_turn",
            session_id = %context.session_id(),
            agent_id = %target_agent_id
        );
        self.drive(context, user_input, target_agent_id)
            .instrument(span)
            .await
    }

    async fn drive(
        &self,
        context: &mut ConversationContext,
        user_input: Option<&str>,
        target_agent_id: &str,
    ) -> TurnOutcome {
        info!("turn started");
        self.events.emit(TurnEvent::TurnStarted {
            session_id: context.session_id().to_string(),
            agent_id: target_agent_id.to_string(),
        });

        let mut turn = TurnRun::new(context, user_input, target_agent_id);
        let mut state = TurnState::ResolvingAgent;

        loop {
            self.events.emit(TurnEvent::StateChanged { state });

            if let TurnState::Done(reason) = state {
                info!(%reason, iterations = turn.iteration, "turn finished");
                self.events.emit(TurnEvent::TurnFinished {
                    reason,
                    iterations: turn.iteration,
                });
                return TurnOutcome {
                    output: turn.output,
                    reason,
                    iterations: turn.iteration,
                };
            }

            debug!(state = state.name(), iteration = turn.iteration, "advancing turn");
            state = self.step(state, &mut turn).await;
        }
    }

    /// Advance the turn by one state.
    async fn step(&self, state: TurnState, turn: &mut TurnRun<'_>) -> TurnState {
        match state {
            TurnState::ResolvingAgent => self.resolve_agent(turn).await,
            TurnState::Processing => self.process(turn).await,
            TurnState::ExecutingTools => self.execute_tools(turn).await,
            TurnState::FeedingResults => self.feed_results(turn).await,
            TurnState::Done(reason) => TurnState::Done(reason),
        }
    }

    async fn resolve_agent(&self, turn: &mut TurnRun<'_>) -> TurnState {
        let lookup = self.agent_factory.get_agent(turn.agent_id, &self.deps);
        match timeout(self.config.step_timeout(), lookup).await {
            Ok(Some(agent)) => {
                turn.agent = Some(agent);
                TurnState::Processing
            }
            Ok(None) => {
                let error = format!("Agent '{}' not found", turn.agent_id);
                warn!("{}", error);
                turn.context.add_message(Message::error(error.clone()));
                turn.output = AgentOutput::failed(AGENT_NOT_FOUND_RESPONSE, error);
                TurnState::Done(TerminationReason::AgentNotFound)
            }
            Err(_) => {
                let error = format!(
                    "Resolving agent '{}' timed out after {} ms",
                    turn.agent_id, self.config.default_agent_turn_timeout_ms
                );
                error!("{}", error);
                turn.context.add_message(Message::error(error.clone()));
                turn.output = AgentOutput::failed(GENERIC_APOLOGY, error);
                TurnState::Done(TerminationReason::Timeout)
            }
        }
    }

    async fn process(&self, turn: &mut TurnRun<'_>) -> TurnState {
        let Some(agent) = turn.agent.clone() else {
            return TurnState::ResolvingAgent;
        };

        let result = self
            .fenced(agent.process_turn(turn.user_input, &mut *turn.context))
            .await;

        match result {
            Ok(output) => {
                self.accept_output(turn, output, false);
                self.decide(turn)
            }
            Err(failure) => {
                let stage = format!("Agent '{}' failed while processing the turn", turn.agent_id);
                self.fail_turn(turn, Some(agent), &stage, failure, TerminationReason::AgentFailure)
                    .await
            }
        }
    }

    async fn execute_tools(&self, turn: &mut TurnRun<'_>) -> TurnState {
        if !turn.unrecorded.is_empty() {
            let calls = std::mem::take(&mut turn.unrecorded);
            turn.context
                .add_message(Message::assistant_with_tool_calls(None, calls));
        }

        let calls = std::mem::take(&mut turn.pending);
        let iteration = turn.iteration + 1;
        info!(iteration, batch_size = calls.len(), "executing tool batch");
        self.events.emit(TurnEvent::ToolBatchStarted {
            iteration,
            batch_size: calls.len(),
        });

        let exec_ctx = turn.exec_context();
        let executor = Arc::clone(&self.tool_executor);
        let batch = async {
            join_all(calls.iter().map(|call| executor.execute_tool(call, &exec_ctx)))
                .await
                .into_iter()
                .collect::<Result<Vec<ToolResult>>>()
        };

        let results = match self.fenced(batch).await {
            Ok(results) => results,
            Err(failure) => {
                let agent = turn.agent.clone();
                return self
                    .fail_turn(
                        turn,
                        agent,
                        "Tool execution failed",
                        failure,
                        TerminationReason::ToolInfrastructureFailure,
                    )
                    .await;
            }
        };

        // Results are written in request order, whatever order they finished in.
        let mut correlated = Vec::with_capacity(results.len());
        for (call, mut result) in calls.iter().zip(results) {
            if result.call_id != call.call_id {
                warn!(
                    expected = %call.call_id,
                    got = %result.call_id,
                    "tool executor returned a mismatched call id"
                );
                result.call_id = call.call_id.clone();
            }
            turn.context.add_message(Message::tool_result(&result));
            correlated.push(result);
        }

        let failed = correlated.iter().filter(|r| !r.is_success()).count();
        debug!(iteration, failed, "tool batch completed");
        self.events
            .emit(TurnEvent::ToolBatchCompleted { iteration, failed });

        turn.results = correlated;
        TurnState::FeedingResults
    }

    async fn feed_results(&self, turn: &mut TurnRun<'_>) -> TurnState {
        let Some(agent) = turn.agent.clone() else {
            return TurnState::ResolvingAgent;
        };

        let results = std::mem::take(&mut turn.results);
        let total = results.len();

        for (index, result) in results.iter().enumerate() {
            self.events.emit(TurnEvent::ToolResultFed {
                call_id: result.call_id.clone(),
                tool_id: result.tool_id.clone(),
            });

            let fed = self
                .fenced(agent.handle_tool_result(
                    &result.call_id,
                    &result.outcome,
                    &result.tool_id,
                    &mut *turn.context,
                ))
                .await;

            match fed {
                Ok(output) => {
                    self.accept_output(turn, output, true);
                    if turn.output.is_complete || turn.output.error.is_some() {
                        if index + 1 < total {
                            debug!(
                                skipped = total - index - 1,
                                "agent concluded; remaining results not fed"
                            );
                        }
                        break;
                    }
                }
                Err(failure) => {
                    let stage = format!(
                        "Agent '{}' failed while handling the result of tool '{}' ({})",
                        turn.agent_id, result.tool_id, result.call_id
                    );
                    return self
                        .fail_turn(turn, Some(agent), &stage, failure, TerminationReason::AgentFailure)
                        .await;
                }
            }
        }

        turn.iteration += 1;
        self.decide(turn)
    }

    /// Pick the next state from the latest output and the iteration budget.
    fn decide(&self, turn: &mut TurnRun<'_>) -> TurnState {
        if turn.output.error.is_some() {
            turn.output.is_complete = true;
            self.clear_pending(turn);
            return TurnState::Done(TerminationReason::AgentFailure);
        }

        if turn.output.is_complete || turn.pending.is_empty() {
            turn.output.is_complete = true;
            self.clear_pending(turn);
            return TurnState::Done(TerminationReason::Completed);
        }

        if turn.iteration >= self.config.max_tool_call_iterations {
            self.exhaust(turn);
            return TurnState::Done(TerminationReason::MaxIterations);
        }

        TurnState::ExecutingTools
    }

    /// Record an agent output in the context and make it the current output.
    ///
    /// Tool calls are only recorded and queued when the output is not
    /// complete; completion wins over trailing tool calls.
    fn accept_output(&self, turn: &mut TurnRun<'_>, mut output: AgentOutput, from_feedback: bool) {
        self.events.emit(TurnEvent::AgentResponded {
            has_text: output.response_text.is_some(),
            tool_calls: output.tool_calls.len(),
            is_complete: output.is_complete,
        });

        if let Some(mood) = output.metadata.get("mood") {
            turn.context
                .set_metadata(CURRENT_AGENT_MOOD_KEY, mood.clone());
        }

        let executes = output.wants_tools() && output.error.is_none();
        if executes {
            Self::assign_call_ids(turn, &mut output.tool_calls);
        } else if !output.tool_calls.is_empty() {
            debug!(
                count = output.tool_calls.len(),
                "ignoring tool calls on a concluded output"
            );
        }

        let calls = if executes {
            output.tool_calls.clone()
        } else {
            Vec::new()
        };

        // Calls go on an assistant message only once their batch is certain to
        // run; follow-ups from feedback may be dropped by completion or the cap.
        let runs_next = !from_feedback && turn.iteration < self.config.max_tool_call_iterations;
        let attached = if runs_next { calls.clone() } else { Vec::new() };
        if !runs_next {
            turn.unrecorded.extend(calls.iter().cloned());
        }

        if let Some(text) = &output.response_text {
            let mut message = Message::assistant_with_tool_calls(Some(text.clone()), attached);
            message.metadata = output.metadata.clone();
            turn.context.add_message(message);
        } else if runs_next {
            turn.unrecorded.extend(attached);
        }

        turn.pending.extend(calls);
        turn.output = output;
    }

    /// Give every call a turn-unique id, replacing missing or repeated ones.
    fn assign_call_ids(turn: &mut TurnRun<'_>, calls: &mut [AgentToolCall]) {
        for call in calls.iter_mut() {
            if call.has_call_id() && turn.seen_call_ids.insert(call.call_id.clone()) {
                continue;
            }
            if call.has_call_id() {
                warn!(call_id = %call.call_id, "duplicate tool call id; assigning a new one");
            }
            let id = AgentToolCall::generate_call_id();
            turn.seen_call_ids.insert(id.clone());
            call.call_id = id;
        }
    }

    fn clear_pending(&self, turn: &mut TurnRun<'_>) {
        turn.pending.clear();
        turn.unrecorded.clear();
        turn.output.tool_calls.clear();
    }

    /// Close a turn whose agent kept asking for tools past the budget.
    fn exhaust(&self, turn: &mut TurnRun<'_>) {
        let max = self.config.max_tool_call_iterations;
        let error = format!(
            "Maximum tool call iterations ({}) reached while the agent kept requesting tools",
            max
        );
        warn!(pending = turn.pending.len(), "{}", error);

        let text = match turn.output.response_text.take() {
            Some(text) if !text.trim().is_empty() => format!("{}\n\n{}", text, LOOP_SUFFIX),
            _ => LOOP_SUFFIX.to_string(),
        };

        self.clear_pending(turn);
        turn.output.response_text = Some(text);
        turn.output.is_complete = true;
        turn.output.error = Some(error.clone());
        turn.context
            .add_message(Message::system(format!("Turn stopped: {}", error)));
    }

    /// Record a fatal step failure and produce the terminal output.
    async fn fail_turn(
        &self,
        turn: &mut TurnRun<'_>,
        agent: Option<Arc<dyn Agent>>,
        stage: &str,
        failure: StepFailure,
        otherwise: TerminationReason,
    ) -> TurnState {
        let reason = failure.reason(otherwise);
        let detail = format!("{}: {}", stage, failure);
        error!(%reason, "{}", detail);
        turn.context.add_message(Message::error(detail.clone()));

        self.clear_pending(turn);
        turn.results.clear();

        turn.output = match self.explain_failure(turn, agent, &detail).await {
            Some(mut explained) => {
                explained.is_complete = true;
                explained.tool_calls.clear();
                if explained.error.is_none() {
                    explained.error = Some(detail);
                }
                if let Some(text) = &explained.response_text {
                    let mut message = Message::assistant(text.clone());
                    message.metadata = explained.metadata.clone();
                    turn.context.add_message(message);
                }
                explained
            }
            None => AgentOutput::failed(GENERIC_APOLOGY, detail),
        };

        TurnState::Done(reason)
    }

    /// Ask the failing agent, then the configured error-handling agent, to
    /// explain the failure. `None` when neither can.
    async fn explain_failure(
        &self,
        turn: &mut TurnRun<'_>,
        agent: Option<Arc<dyn Agent>>,
        detail: &str,
    ) -> Option<AgentOutput> {
        if let Some(agent) = agent {
            if let Some(explained) = self.try_self_explain(turn, &agent, detail).await {
                return Some(explained);
            }
        }

        let fallback_id = self.config.error_handling_agent_id.as_deref()?;
        if fallback_id == turn.agent_id {
            return None;
        }

        let fallback = match timeout(
            self.config.step_timeout(),
            self.agent_factory.get_agent(fallback_id, &self.deps),
        )
        .await
        {
            Ok(Some(agent)) => agent,
            Ok(None) => {
                warn!(fallback_id, "error handling agent not found");
                return None;
            }
            Err(_) => {
                warn!(fallback_id, "resolving error handling agent timed out");
                return None;
            }
        };

        self.try_self_explain(turn, &fallback, detail).await
    }

    async fn try_self_explain(
        &self,
        turn: &mut TurnRun<'_>,
        agent: &Arc<dyn Agent>,
        detail: &str,
    ) -> Option<AgentOutput> {
        let explainer = agent.as_self_explaining()?;
        match self
            .fenced(explainer.handle_internal_agent_error(detail, &mut *turn.context, true))
            .await
        {
            Ok(output) => Some(output),
            Err(failure) => {
                warn!(agent_id = agent.id(), "self-explanation failed: {}", failure);
                None
            }
        }
    }

    /// Run `fut` under the step timeout, converting errors and panics.
    async fn fenced<T, F>(&self, fut: F) -> std::result::Result<T, StepFailure>
    where
        F: Future<Output = Result<T>>,
    {
        let limit: Duration = self.config.step_timeout();
        match timeout(limit, AssertUnwindSafe(fut).catch_unwind()).await {
            Err(_) => Err(StepFailure::TimedOut(limit.as_millis())),
            Ok(Err(payload)) => Err(StepFailure::Panicked(panic_message(&*payload))),
            Ok(Ok(Err(e))) => Err(StepFailure::Failed(e)),
            Ok(Ok(Ok(value))) => Ok(value),
        }
    }
}
