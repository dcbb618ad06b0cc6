//! Bounded per-session conversation history.
//!
//! The session map is only write-locked to insert or remove a session;
//! each session carries its own mutex, so exchanges on different sessions
//! never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;
use lectern_core::message::{Message, Role, SessionId};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

type SessionHandle = Arc<Mutex<Vec<Message>>>;

pub struct SessionStore {
    max_history: usize,
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionStore {
    /// `max_history` is the number of user/assistant exchanges kept.
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub async fn create_session(&self) -> SessionId {
        let id = SessionId::new();
        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(Vec::new())));
        debug!(session_id = %id, "Session created");
        id
    }

    async fn handle(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    async fn handle_or_insert(&self, id: &SessionId) -> SessionHandle {
        if let Some(handle) = self.handle(id).await {
            return handle;
        }
        self.sessions
            .write()
            .await
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone()
    }

    /// Record one exchange, evicting the oldest exchanges beyond the limit.
    ///
    /// Unknown ids start a new session.
    pub async fn add_exchange(&self, id: &SessionId, user: &str, assistant: &str) {
        let handle = self.handle_or_insert(id).await;
        let mut messages = handle.lock().await;
        messages.push(Message::user(user));
        messages.push(Message::assistant(assistant));

        // Length stays even, so whole pairs always come off the front
        let limit = self.max_history * 2;
        while messages.len() > limit {
            messages.drain(..2);
        }
    }

    /// History as `User: ...` / `Assistant: ...` lines, or `None` when
    /// there is nothing to show.
    pub async fn get_history(&self, id: &SessionId) -> Option<String> {
        let handle = self.handle(id).await?;
        let messages = handle.lock().await;
        if messages.is_empty() {
            return None;
        }

        let lines: Vec<String> = messages
            .iter()
            .map(|m| {
                let speaker = match m.role {
                    Role::User => "User",
                    _ => "Assistant",
                };
                format!("{speaker}: {}", m.content)
            })
            .collect();
        Some(lines.join("\n"))
    }

    pub async fn messages(&self, id: &SessionId) -> Vec<Message> {
        match self.handle(id).await {
            Some(handle) => handle.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Forget a session. Returns whether it existed.
    pub async fn clear_session(&self, id: &SessionId) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_session_has_no_history() {
        let store = SessionStore::new(2);
        let id = store.create_session().await;
        assert!(store.get_history(&id).await.is_none());
        assert!(store.get_history(&SessionId::from("unknown")).await.is_none());
        assert_ne!(store.create_session().await, id);
    }

    #[tokio::test]
    async fn history_formats_exchanges() {
        let store = SessionStore::new(2);
        let id = store.create_session().await;
        store.add_exchange(&id, "What is MCP?", "A protocol.").await;
        assert_eq!(
            store.get_history(&id).await.as_deref(),
            Some("User: What is MCP?\nAssistant: A protocol.")
        );
    }

    #[tokio::test]
    async fn truncates_oldest_pairs() {
        let store = SessionStore::new(2);
        let id = store.create_session().await;
        for i in 1..=3 {
            store.add_exchange(&id, &format!("q{i}"), &format!("a{i}")).await;
        }
        let messages = store.messages(&id).await;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].content, "q2");
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[3].content, "a3");
    }

    #[tokio::test]
    async fn truncation_drops_one_exchange_at_a_time() {
        let store = SessionStore::new(3);
        let id = store.create_session().await;
        for i in 1..=4 {
            store.add_exchange(&id, &format!("q{i}"), &format!("a{i}")).await;
        }
        let messages = store.messages(&id).await;
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[0].content, "q2");
        assert_eq!(messages[1].content, "a2");
        assert_eq!(
            store.get_history(&id).await.as_deref(),
            Some("User: q2\nAssistant: a2\nUser: q3\nAssistant: a3\nUser: q4\nAssistant: a4")
        );
    }

    #[tokio::test]
    async fn zero_history_keeps_nothing() {
        let store = SessionStore::new(0);
        let id = store.create_session().await;
        store.add_exchange(&id, "q", "a").await;
        assert!(store.get_history(&id).await.is_none());
    }

    #[tokio::test]
    async fn unknown_id_is_adopted() {
        let store = SessionStore::default();
        let id = SessionId::from("client-chosen");
        store.add_exchange(&id, "q", "a").await;
        assert_eq!(store.session_count().await, 1);
        assert!(store.get_history(&id).await.is_some());
    }

    #[tokio::test]
    async fn clear_session_forgets() {
        let store = SessionStore::default();
        let id = store.create_session().await;
        assert!(store.clear_session(&id).await);
        assert!(!store.clear_session(&id).await);
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = Arc::new(SessionStore::new(2));
        let a = store.create_session().await;
        let b = store.create_session().await;
        let (sa, sb) = (Arc::clone(&store), Arc::clone(&store));
        let (ia, ib) = (a.clone(), b.clone());
        let ta = tokio::spawn(async move { sa.add_exchange(&ia, "qa", "aa").await });
        let tb = tokio::spawn(async move { sb.add_exchange(&ib, "qb", "ab").await });
        ta.await.unwrap();
        tb.await.unwrap();
        assert_eq!(store.get_history(&a).await.as_deref(), Some("User: qa\nAssistant: aa"));
        assert_eq!(store.get_history(&b).await.as_deref(), Some("User: qb\nAssistant: ab"));
    }
}
