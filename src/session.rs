//! Conversation sessions with bounded history.

use crate::error::{CourseRagError, Result};
use crate::llm::Role;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// One remembered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    fn label(&self) -> &'static str {
        match self.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

type Sessions = HashMap<String, Vec<HistoryEntry>>;

/// In-memory store of conversation sessions.
///
/// Each session keeps at most `2 * max_history` messages, i.e. the latest
/// `max_history` exchanges.
pub struct SessionManager {
    max_history: usize,
    sessions: RwLock<Sessions>,
    counter: AtomicU64,
}

impl SessionManager {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            sessions: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(0),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Sessions>> {
        self.sessions
            .read()
            .map_err(|e| CourseRagError::Session(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Sessions>> {
        self.sessions
            .write()
            .map_err(|e| CourseRagError::Session(format!("Failed to acquire lock: {}", e)))
    }

    /// Start a new empty session and return its id.
    pub fn create_session(&self) -> Result<String> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let session_id = format!("session_{}", n);
        self.write()?.insert(session_id.clone(), Vec::new());
        debug!("Created {}", session_id);
        Ok(session_id)
    }

    /// Append a message, creating the session if it does not exist.
    pub fn add_message(&self, session_id: &str, role: Role, content: &str) -> Result<()> {
        let mut sessions = self.write()?;
        let history = sessions.entry(session_id.to_string()).or_default();
        history.push(HistoryEntry {
            role,
            content: content.to_string(),
        });

        let limit = self.max_history * 2;
        if history.len() > limit {
            let excess = history.len() - limit;
            history.drain(..excess);
        }
        Ok(())
    }

    /// Append a user question and the assistant's answer.
    pub fn add_exchange(&self, session_id: &str, query: &str, response: &str) -> Result<()> {
        self.add_message(session_id, Role::User, query)?;
        self.add_message(session_id, Role::Assistant, response)
    }

    /// History as `User: ...` / `Assistant: ...` lines, or `None` when there is none.
    pub fn get_conversation_history(&self, session_id: &str) -> Result<Option<String>> {
        let sessions = self.read()?;
        let history = match sessions.get(session_id) {
            Some(history) if !history.is_empty() => history,
            _ => return Ok(None),
        };

        Ok(Some(
            history
                .iter()
                .map(|entry| format!("{}: {}", entry.label(), entry.content))
                .collect::<Vec<_>>()
                .join("\n"),
        ))
    }

    /// Empty a session's history, keeping the id valid.
    pub fn clear_session(&self, session_id: &str) -> Result<()> {
        if let Some(history) = self.write()?.get_mut(session_id) {
            history.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_sequential() {
        let manager = SessionManager::new(2);
        assert_eq!(manager.create_session().unwrap(), "session_1");
        assert_eq!(manager.create_session().unwrap(), "session_2");
        assert_eq!(manager.get_conversation_history("session_1").unwrap(), None);
    }

    #[test]
    fn test_history_formatting() {
        let manager = SessionManager::new(2);
        let id = manager.create_session().unwrap();
        manager
            .add_exchange(&id, "What is ML?", "A branch of AI.")
            .unwrap();

        assert_eq!(
            manager.get_conversation_history(&id).unwrap().as_deref(),
            Some("User: What is ML?\nAssistant: A branch of AI.")
        );
    }

    #[test]
    fn test_history_is_bounded() {
        let manager = SessionManager::new(2);
        let id = manager.create_session().unwrap();
        for i in 1..=3 {
            manager
                .add_exchange(&id, &format!("q{}", i), &format!("a{}", i))
                .unwrap();
        }

        assert_eq!(
            manager.get_conversation_history(&id).unwrap().as_deref(),
            Some("User: q2\nAssistant: a2\nUser: q3\nAssistant: a3")
        );
    }

    #[test]
    fn test_unknown_session_is_created_on_write() {
        let manager = SessionManager::new(2);
        assert_eq!(manager.get_conversation_history("custom").unwrap(), None);

        manager.add_message("custom", Role::User, "hello").unwrap();
        assert_eq!(
            manager.get_conversation_history("custom").unwrap().as_deref(),
            Some("User: hello")
        );
    }

    #[test]
    fn test_clear_session() {
        let manager = SessionManager::new(2);
        let id = manager.create_session().unwrap();
        manager.add_exchange(&id, "q", "a").unwrap();

        manager.clear_session(&id).unwrap();
        assert_eq!(manager.get_conversation_history(&id).unwrap(), None);

        // Clearing an unknown session is a no-op.
        manager.clear_session("missing").unwrap();
    }
}
