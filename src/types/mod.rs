use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

// ============= Message Types =============

/// Role of a message in the conversation log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions and orchestrator notes.
    System,
    /// User input.
    User,
    /// Agent response, possibly carrying tool call requests.
    Assistant,
    /// Result of a tool call, correlated by `tool_call_id`.
    Tool,
    /// Failure recorded by the orchestrator.
    Error,
}

impl MessageRole {
    /// Lowercase role name as used by chat-completion style providers.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
            MessageRole::Error => "error",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in a [`ConversationContext`](crate::memory::ConversationContext).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Who produced the message.
    pub role: MessageRole,
    /// Text content. `None` for assistant messages that only request tools.
    pub content: Option<String>,
    /// Tool name for `tool` messages, or an optional speaker name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Call id this `tool` message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool calls requested by an `assistant` message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<AgentToolCall>,
    /// Free-form metadata (mood, tool execution status, ...).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
    /// Stamped by the context on append when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    fn with_role(role: MessageRole, content: Option<String>) -> Self {
        Self {
            role,
            content,
            name: None,
            tool_call_id: None,
            tool_calls: Vec::new(),
            metadata: HashMap::new(),
            timestamp: None,
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, Some(content.into()))
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, Some(content.into()))
    }

    /// Create a plain assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, Some(content.into()))
    }

    /// Create an assistant message that requests tool calls.
    pub fn assistant_with_tool_calls(
        content: Option<String>,
        tool_calls: Vec<AgentToolCall>,
    ) -> Self {
        let mut msg = Self::with_role(MessageRole::Assistant, content);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Create a tool result message for the given result.
    pub fn tool_result(result: &ToolResult) -> Self {
        let mut msg = Self::with_role(MessageRole::Tool, Some(result.content_string()));
        msg.name = Some(result.tool_id.clone());
        msg.tool_call_id = Some(result.call_id.clone());
        msg.metadata.insert(
            "status".to_string(),
            Value::String(if result.is_success() { "success" } else { "error" }.to_string()),
        );
        msg
    }

    /// Create an error message.
    pub fn error(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Error, Some(content.into()))
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

// ============= Tool Types =============

/// Schema of a tool as advertised to a model.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDefinition {
    /// Name agents call the tool by.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON Schema of the arguments.
    pub parameters: serde_json::Value,
}

/// A tool invocation requested by an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentToolCall {
    /// Correlation id. Empty means the orchestrator assigns one.
    #[serde(default)]
    pub call_id: String,
    /// Name of the tool to run.
    pub tool_id: String,
    /// JSON arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

impl AgentToolCall {
    /// Create a call without an id; the orchestrator will synthesize one.
    pub fn new(tool_id: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: String::new(),
            tool_id: tool_id.into(),
            arguments,
        }
    }

    /// Create a call with an explicit id.
    pub fn with_id(call_id: impl Into<String>, tool_id: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: call_id.into(),
            tool_id: tool_id.into(),
            arguments,
        }
    }

    /// Whether the agent supplied a call id.
    pub fn has_call_id(&self) -> bool {
        !self.call_id.trim().is_empty()
    }

    /// Generate a fresh call id.
    pub fn generate_call_id() -> String {
        format!("call_{}", Uuid::new_v4().simple())
    }
}

/// Output or error of a single tool execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    /// The tool produced a value.
    Output(Value),
    /// The tool failed; the message is handed to the agent as data.
    Error(String),
}

/// Result of one [`AgentToolCall`], correlated by `call_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    /// Id of the call this result answers.
    pub call_id: String,
    /// Tool that was invoked.
    pub tool_id: String,
    /// What happened.
    pub outcome: ToolOutcome,
}

impl ToolResult {
    /// Create a successful result.
    pub fn success(call_id: impl Into<String>, tool_id: impl Into<String>, output: Value) -> Self {
        Self {
            call_id: call_id.into(),
            tool_id: tool_id.into(),
            outcome: ToolOutcome::Output(output),
        }
    }

    /// Create a failed result.
    pub fn failure(
        call_id: impl Into<String>,
        tool_id: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_id: tool_id.into(),
            outcome: ToolOutcome::Error(error.into()),
        }
    }

    /// Whether the tool succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Output(_))
    }

    /// Content for the `tool` message: stringified output, or `Error: ...`.
    pub fn content_string(&self) -> String {
        match &self.outcome {
            ToolOutcome::Output(Value::String(s)) => s.clone(),
            ToolOutcome::Output(value) => {
                serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
            }
            ToolOutcome::Error(e) => format!("Error: {}", e),
        }
    }
}

/// Identifiers handed to every tool execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolExecutionContext {
    /// User the turn runs for.
    pub user_id: String,
    /// Conversation (session) id.
    pub conversation_id: String,
    /// Agent that requested the call.
    pub agent_id: String,
}

// ============= Agent Output =============

/// The unit of progress returned by every agent call and by the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentOutput {
    /// Natural-language response, if any.
    pub response_text: Option<String>,
    /// Tool calls the agent wants executed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<AgentToolCall>,
    /// Terminal signal for the turn.
    pub is_complete: bool,
    /// Failure description, if the turn failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Per-response metadata such as `mood`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl AgentOutput {
    /// A final text response.
    pub fn respond(text: impl Into<String>) -> Self {
        Self {
            response_text: Some(text.into()),
            is_complete: true,
            ..Default::default()
        }
    }

    /// A non-final output requesting tool calls.
    pub fn with_tool_calls(text: Option<String>, tool_calls: Vec<AgentToolCall>) -> Self {
        Self {
            response_text: text,
            tool_calls,
            is_complete: false,
            ..Default::default()
        }
    }

    /// A terminal failure with a user-facing explanation.
    pub fn failed(text: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            response_text: Some(text.into()),
            is_complete: true,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Complete with nothing to say.
    pub fn empty_complete() -> Self {
        Self {
            is_complete: true,
            ..Default::default()
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Attach a mood, surfaced on the assistant message and the session metadata.
    pub fn with_mood(self, mood: impl Into<String>) -> Self {
        self.with_metadata("mood", Value::String(mood.into()))
    }

    /// Whether the agent asks for another tool round.
    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty() && !self.is_complete
    }
}

// ============= Error Types =============

/// Failures reported by agents, tool executors and setup code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// An agent could not produce an output.
    #[error("Agent error: {0}")]
    Agent(String),

    /// A tool or executor failed outside the tool's own result.
    #[error("Tool error: {0}")]
    Tool(String),

    /// Invalid or unloadable settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Bad arguments.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AppError>;
