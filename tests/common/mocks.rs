//! Mock implementations for testing.
//!
//! This module provides scripted agents and tool executors that can be used
//! across different test files without duplication.

#![allow(dead_code)]

use agentos::agents::{Agent, SelfExplainingAgent};
use agentos::memory::ConversationContext;
use agentos::tools::ToolExecutor;
use agentos::types::{
    AgentOutput, AgentToolCall, AppError, Message, Result, ToolExecutionContext, ToolOutcome,
    ToolResult,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Decides what the agent says after seeing one tool result.
pub type ResultHandler = Arc<dyn Fn(&str, &ToolOutcome, &str) -> Result<AgentOutput> + Send + Sync>;

/// A tool result as the agent saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct FedResult {
    pub call_id: String,
    pub tool_id: String,
    pub outcome: ToolOutcome,
}

/// Agent with a fixed first response and a scripted reaction to tool results.
///
/// Like a real agent it records the user input in the context itself.
///
/// # Examples
///
/// ```ignore
/// // Answers right away
/// let agent = ScriptedAgent::new("echo", AgentOutput::respond("hi"));
///
/// // Requests a tool, then finishes after the result
/// let agent = ScriptedAgent::new("clock", AgentOutput::with_tool_calls(None, vec![call]))
///     .on_result(|_, _, _| Ok(AgentOutput::respond("It's noon")));
///
/// // Fails in process_turn but can explain itself
/// let agent = ScriptedAgent::failing("broken", "model unavailable").explaining("Sorry!");
/// ```
pub struct ScriptedAgent {
    id: String,
    initial: AgentOutput,
    initial_error: Option<String>,
    panic_on_process: bool,
    panic_on_result: bool,
    process_delay: Option<Duration>,
    handler: ResultHandler,
    explanation: Option<String>,
    fed: Mutex<Vec<FedResult>>,
    explained: Mutex<Vec<String>>,
    process_calls: AtomicUsize,
}

impl ScriptedAgent {
    /// Create an agent that answers `process_turn` with `initial`.
    pub fn new(id: &str, initial: AgentOutput) -> Self {
        Self {
            id: id.to_string(),
            initial,
            initial_error: None,
            panic_on_process: false,
            panic_on_result: false,
            process_delay: None,
            handler: Arc::new(|_, _, _| Ok(AgentOutput::respond("done"))),
            explanation: None,
            fed: Mutex::new(Vec::new()),
            explained: Mutex::new(Vec::new()),
            process_calls: AtomicUsize::new(0),
        }
    }

    /// Create an agent whose `process_turn` returns an error.
    pub fn failing(id: &str, error: &str) -> Self {
        let mut agent = Self::new(id, AgentOutput::default());
        agent.initial_error = Some(error.to_string());
        agent
    }

    /// Create an agent whose `process_turn` panics.
    pub fn panicking(id: &str) -> Self {
        let mut agent = Self::new(id, AgentOutput::default());
        agent.panic_on_process = true;
        agent
    }

    /// Create an agent that requests one more tool after every result, forever.
    pub fn looping(id: &str, tool_id: &str) -> Self {
        let tool = tool_id.to_string();
        let first = AgentOutput::with_tool_calls(
            Some("Let me check.".to_string()),
            vec![AgentToolCall::new(tool_id, json!({}))],
        );
        Self::new(id, first).on_result(move |_, _, _| {
            Ok(AgentOutput::with_tool_calls(
                Some("Checking again.".to_string()),
                vec![AgentToolCall::new(tool.as_str(), json!({}))],
            ))
        })
    }

    /// Script the reaction to tool results.
    pub fn on_result<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &ToolOutcome, &str) -> Result<AgentOutput> + Send + Sync + 'static,
    {
        self.handler = Arc::new(handler);
        self
    }

    /// Panic whenever a tool result is handed over.
    pub fn panicking_on_result(mut self) -> Self {
        self.panic_on_result = true;
        self
    }

    /// Sleep before answering `process_turn`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.process_delay = Some(delay);
        self
    }

    /// Make the agent self-explaining with a fixed apology.
    pub fn explaining(mut self, text: &str) -> Self {
        self.explanation = Some(text.to_string());
        self
    }

    /// Tool results received so far, in the order they were fed.
    pub fn fed(&self) -> Vec<FedResult> {
        self.fed.lock().clone()
    }

    /// Failure messages the agent was asked to explain.
    pub fn explained(&self) -> Vec<String> {
        self.explained.lock().clone()
    }

    pub fn process_calls(&self) -> usize {
        self.process_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn id(&self) -> &str {
        &self.id
    }

    async fn process_turn(
        &self,
        user_input: Option<&str>,
        context: &mut ConversationContext,
    ) -> Result<AgentOutput> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(input) = user_input {
            context.add_message(Message::user(input));
        }

        if let Some(delay) = self.process_delay {
            tokio::time::sleep(delay).await;
        }

        if self.panic_on_process {
            panic!("scripted agent {} blew up", self.id);
        }

        if let Some(error) = &self.initial_error {
            return Err(AppError::Agent(error.clone()));
        }

        Ok(self.initial.clone())
    }

    async fn handle_tool_result(
        &self,
        call_id: &str,
        payload: &ToolOutcome,
        tool_id: &str,
        _context: &mut ConversationContext,
    ) -> Result<AgentOutput> {
        self.fed.lock().push(FedResult {
            call_id: call_id.to_string(),
            tool_id: tool_id.to_string(),
            outcome: payload.clone(),
        });

        if self.panic_on_result {
            panic!("scripted agent {} choked on {}", self.id, call_id);
        }

        (self.handler)(call_id, payload, tool_id)
    }

    fn as_self_explaining(&self) -> Option<&dyn SelfExplainingAgent> {
        if self.explanation.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl SelfExplainingAgent for ScriptedAgent {
    async fn handle_internal_agent_error(
        &self,
        message: &str,
        _context: &mut ConversationContext,
        _is_fatal: bool,
    ) -> Result<AgentOutput> {
        self.explained.lock().push(message.to_string());
        let text = self.explanation.clone().unwrap_or_default();
        Ok(AgentOutput::respond(text))
    }
}

/// Tool executor with per-tool latency and failure modes.
///
/// Successful calls answer `{"tool": <id>, "args": <arguments>}`.
#[derive(Default)]
pub struct MockToolExecutor {
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    broken: bool,
    started: Mutex<Vec<String>>,
    contexts: Mutex<Vec<ToolExecutionContext>>,
    finished: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockToolExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay `tool_id` by `delay` before it answers.
    pub fn with_delay(mut self, tool_id: &str, delay: Duration) -> Self {
        self.delays.insert(tool_id.to_string(), delay);
        self
    }

    /// Make `tool_id` produce a tool-level error result.
    pub fn with_failing_tool(mut self, tool_id: &str) -> Self {
        self.failing.insert(tool_id.to_string());
        self
    }

    /// Every call fails at the infrastructure level.
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    /// Call ids in the order execution began.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().clone()
    }

    /// Call ids in the order execution finished.
    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().clone()
    }

    /// Execution contexts received, in the order calls began.
    pub fn contexts(&self) -> Vec<ToolExecutionContext> {
        self.contexts.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.started.lock().len()
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    async fn execute_tool(
        &self,
        call: &AgentToolCall,
        ctx: &ToolExecutionContext,
    ) -> Result<ToolResult> {
        self.started.lock().push(call.call_id.clone());
        self.contexts.lock().push(ctx.clone());

        if self.broken {
            return Err(AppError::Tool("executor backend unreachable".to_string()));
        }

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&call.tool_id) {
            tokio::time::sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.finished.lock().push(call.call_id.clone());

        if self.failing.contains(&call.tool_id) {
            return Ok(ToolResult::failure(
                &call.call_id,
                &call.tool_id,
                format!("{} is unavailable", call.tool_id),
            ));
        }

        Ok(ToolResult::success(
            &call.call_id,
            &call.tool_id,
            json!({ "tool": call.tool_id, "args": call.arguments }),
        ))
    }
}
