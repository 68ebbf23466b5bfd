//! Worker-side session store

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use conduit_core::protocol::{Role, ToolCallResult};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Tool results merged into this message by `callTool`
    pub tool_results: Vec<ToolCallResult>,
}

#[derive(Debug, Clone)]
pub struct WorkerSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    messages: Vec<StoredMessage>,
}

impl WorkerSession {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    pub fn add_message(&mut self, role: Role, content: String) -> &StoredMessage {
        self.messages.push(StoredMessage {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_results: Vec::new(),
        });
        &self.messages[self.messages.len() - 1]
    }

    pub fn message(&self, id: &str) -> Option<&StoredMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn message_mut(&mut self, id: &str) -> Option<&mut StoredMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    pub fn messages(&self) -> &[StoredMessage] {
        &self.messages
    }
}

/// All sessions opened by the controller during this worker's lifetime
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, WorkerSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self) -> &WorkerSession {
        let session = WorkerSession::new();
        let id = session.id.clone();
        self.sessions.entry(id).or_insert(session)
    }

    pub fn get(&self, id: &str) -> Option<&WorkerSession> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut WorkerSession> {
        self.sessions.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
