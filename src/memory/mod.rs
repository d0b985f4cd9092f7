//! Conversation memory for agent turns.
//!
//! This module provides:
//! - [`ConversationContext`] - the append-only message log and session metadata
//!   that every turn reads and writes
//! - [`SessionStore`] - one lockable context per session, so turns on the same
//!   conversation never interleave
//!
//! Persistence and session lifetime are owned by the embedding application;
//! contexts can be rehydrated with [`ConversationContext::with_messages`].

/// Append-only conversation log.
pub mod context_manager;
/// Per-session context handles.
pub mod session_store;

pub use context_manager::{ConversationContext, CURRENT_AGENT_MOOD_KEY};
pub use session_store::{SessionHandle, SessionStore};
