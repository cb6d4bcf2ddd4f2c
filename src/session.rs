//! Conversation sessions.
//!
//! Each session keeps the last few question/answer exchanges so follow-up
//! questions can be answered in context.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// One message in a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: &'static str,
    pub content: String,
}

/// Default cap on live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

#[derive(Default)]
struct Sessions {
    histories: HashMap<String, VecDeque<Message>>,
    /// Session ids, least recently used first.
    recency: VecDeque<String>,
}

impl Sessions {
    fn touch(&mut self, session_id: &str) {
        if let Some(pos) = self.recency.iter().position(|id| id == session_id) {
            self.recency.remove(pos);
        }
        self.recency.push_back(session_id.to_string());
    }

    fn evict_over(&mut self, max_sessions: usize) {
        while self.histories.len() > max_sessions {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            self.histories.remove(&oldest);
            debug!("Evicted session {}", oldest);
        }
    }

    fn remove(&mut self, session_id: &str) -> bool {
        self.recency.retain(|id| id != session_id);
        self.histories.remove(session_id).is_some()
    }
}

/// Thread-safe store of bounded conversation histories.
///
/// At most `max_sessions` sessions are kept; starting one more drops the
/// session that was used least recently.
pub struct SessionManager {
    max_history: usize,
    max_sessions: usize,
    sessions: Mutex<Sessions>,
}

impl SessionManager {
    /// Keep at most `max_history` exchanges (twice as many messages) per session.
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            max_sessions: DEFAULT_MAX_SESSIONS,
            sessions: Mutex::new(Sessions::default()),
        }
    }

    /// Set the number of live sessions kept. Values below 1 are raised to 1.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, Sessions> {
        // Poisoning is ignored: history is best-effort
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a new empty session and return its id.
    pub fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions();
        sessions.histories.insert(id.clone(), VecDeque::new());
        sessions.touch(&id);
        sessions.evict_over(self.max_sessions);
        debug!("Created session {}", id);
        id
    }

    /// Whether a session with this id exists.
    pub fn exists(&self, session_id: &str) -> bool {
        self.sessions().histories.contains_key(session_id)
    }

    /// Record a question and its answer, dropping the oldest messages past the limit.
    ///
    /// Unknown ids start a new session under that id.
    pub fn add_exchange(&self, session_id: &str, question: &str, answer: &str) {
        let limit = self.max_history * 2;
        let mut sessions = self.sessions();
        let history = sessions
            .histories
            .entry(session_id.to_string())
            .or_default();

        history.push_back(Message {
            role: "User",
            content: question.to_string(),
        });
        history.push_back(Message {
            role: "Assistant",
            content: answer.to_string(),
        });

        while history.len() > limit {
            history.pop_front();
        }

        sessions.touch(session_id);
        sessions.evict_over(self.max_sessions);
    }

    /// Formatted history for the model, or `None` when there is nothing to show.
    pub fn history(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions();
        let history = sessions.histories.get(session_id)?;
        if history.is_empty() {
            return None;
        }

        Some(
            history
                .iter()
                .map(|m| format!("{}: {}", m.role, m.content))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Forget a session's history. Returns whether it existed.
    pub fn clear_session(&self, session_id: &str) -> bool {
        let removed = self.sessions().remove(session_id);
        debug!("Cleared session {} (existed: {})", session_id, removed);
        removed
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions().histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
