use crate::types::{Message, MessageRole};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Session metadata key holding the mood of the last agent response.
pub const CURRENT_AGENT_MOOD_KEY: &str = "currentAgentMood";

/// Append-only message log plus session-scoped metadata for one conversation.
///
/// Messages are only ever appended; nothing in this type reorders or removes
/// an entry once it is in the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    session_id: String,
    user_id: String,
    messages: Vec<Message>,
    metadata: HashMap<String, Value>,
}

impl ConversationContext {
    /// Empty context for a session.
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            messages: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Rehydrate a context from previously persisted messages.
    pub fn with_messages(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        messages: Vec<Message>,
    ) -> Self {
        let mut context = Self::new(session_id, user_id);
        for message in messages {
            context.add_message(message);
        }
        context
    }

    /// Session this log belongs to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// User the session belongs to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Append a message, stamping the current time if it has none.
    pub fn add_message(&mut self, mut message: Message) {
        if message.timestamp.is_none() {
            message.timestamp = Some(Utc::now());
        }
        self.messages.push(message);
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recently appended message.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Find the assistant message that requested `call_id`.
    pub fn find_tool_call(&self, call_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| {
            m.role == MessageRole::Assistant && m.tool_calls.iter().any(|c| c.call_id == call_id)
        })
    }

    /// Session metadata entry.
    pub fn get_metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Set a session metadata entry.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Mood of the last agent response, if one was reported.
    pub fn current_mood(&self) -> Option<&str> {
        self.get_metadata(CURRENT_AGENT_MOOD_KEY)
            .and_then(|v| v.as_str())
    }
}
