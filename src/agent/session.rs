//! In-process session state.
//!
//! Sessions are process-local and are never persisted: the session manager
//! is a plain in-memory map, not a durable conversation store (§1 non-goals).

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;
use uuid::Uuid;

use super::types::{AssistantToolCall, Message, Role};

/// Per-session conversation history and scratch context.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// 128-bit unique identifier for this session
    pub session_id: Uuid,
    /// Ordered message history (I1, I2)
    pub history: Vec<Message>,
    /// Free-form scratch context the agent loop may stash data in between turns
    pub scratch_context: HashMap<String, Value>,
}

impl SessionState {
    fn new() -> Self {
        SessionState {
            session_id: Uuid::new_v4(),
            history: Vec::new(),
            scratch_context: HashMap::new(),
        }
    }

    /// Append a message, preserving the invariant that `tool` messages
    /// carry a `tool_call_id` and `assistant` messages with no text store
    /// `content = None` rather than an empty string.
    pub fn add_message(
        &mut self,
        role: Role,
        content: Option<String>,
        tool_calls: Option<Vec<AssistantToolCall>>,
        tool_call_id: Option<String>,
    ) {
        self.history.push(Message {
            role,
            content: content.filter(|s| !s.is_empty()),
            name: None,
            tool_call_id,
            tool_calls,
            reasoning_content: None,
        });
    }

    /// Return the last `limit` messages in history order.
    pub fn recent_messages(&self, limit: usize) -> &[Message] {
        let start = self.history.len().saturating_sub(limit);
        &self.history[start..]
    }

    /// Clear scratch context while preserving conversation history.
    pub fn clear_context(&mut self) {
        self.scratch_context.clear();
    }
}

/// Manages agent sessions in-memory, keyed by UUID.
///
/// `get_session` accepts both string and native UUID forms; a string lookup
/// succeeds if and only if it parses to the same 128-bit value as a stored
/// session id.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, SessionState>>,
}

impl SessionManager {
    /// Create an empty session manager.
    pub fn new() -> Self {
        SessionManager {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new session and return its id.
    pub fn create_session(&self) -> Uuid {
        let state = SessionState::new();
        let id = state.session_id;
        self.sessions.write().unwrap().insert(id, state);
        id
    }

    /// Fetch a session by its native UUID.
    pub fn get_session(&self, session_id: Uuid) -> Option<SessionState> {
        self.sessions.read().unwrap().get(&session_id).cloned()
    }

    /// Fetch a session by a string form of its id (any UUID textual
    /// representation `Uuid::parse_str` accepts).
    pub fn get_session_by_str(&self, session_id: &str) -> Option<SessionState> {
        let id = Uuid::parse_str(session_id).ok()?;
        self.get_session(id)
    }

    /// Get-or-create: returns the session for `session_id` if it exists,
    /// otherwise creates and registers a fresh one with that id.
    pub fn get_or_create(&self, session_id: Uuid) -> SessionState {
        {
            let sessions = self.sessions.read().unwrap();
            if let Some(state) = sessions.get(&session_id) {
                return state.clone();
            }
        }
        let mut sessions = self.sessions.write().unwrap();
        let state = sessions.entry(session_id).or_insert_with(|| SessionState {
            session_id,
            history: Vec::new(),
            scratch_context: HashMap::new(),
        });
        state.clone()
    }

    /// Persist a session's updated state back into the manager.
    pub fn save_session(&self, state: SessionState) {
        self.sessions.write().unwrap().insert(state.session_id, state);
    }

    /// Delete a session.
    pub fn delete_session(&self, session_id: Uuid) {
        self.sessions.write().unwrap().remove(&session_id);
    }

    /// List all active session ids.
    pub fn list_sessions(&self) -> Vec<Uuid> {
        self.sessions.read().unwrap().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_lookup_succeeds_iff_same_128_bit_value() {
        let manager = SessionManager::new();
        let id = manager.create_session();

        assert!(manager.get_session_by_str(&id.to_string()).is_some());
        assert!(manager
            .get_session_by_str(&id.hyphenated().to_string())
            .is_some());
        assert!(manager.get_session_by_str("not-a-uuid").is_none());
        assert!(manager
            .get_session_by_str("00000000-0000-0000-0000-000000000000")
            .is_none());
    }

    #[test]
    fn add_message_never_stores_empty_content_alongside_tool_calls() {
        let mut state = SessionState::new();
        state.add_message(
            Role::Assistant,
            Some(String::new()),
            Some(vec![AssistantToolCall {
                id: "call_1".into(),
                call_type: "function".into(),
                function: super::super::types::FunctionCall {
                    name: "search".into(),
                    arguments: "{}".into(),
                },
            }]),
            None,
        );
        assert!(state.history[0].content.is_none());
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let manager = SessionManager::new();
        let id = Uuid::new_v4();
        let first = manager.get_or_create(id);
        manager.save_session({
            let mut s = first.clone();
            s.scratch_context.insert("k".into(), serde_json::json!(1));
            s
        });
        let second = manager.get_or_create(id);
        assert_eq!(second.scratch_context.get("k"), Some(&serde_json::json!(1)));
    }
}
