//! Session Management
//!
//! Per-user conversation state. Each user owns one bounded history behind its
//! own async mutex, so turns of the same user are serialized while different
//! users proceed concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::message::{Conversation, DEFAULT_MAX_HISTORY};

/// Identity of the person sending a message, as reported by the transport
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    /// Stable user identifier
    pub user_id: String,

    /// Handle without the leading `@`
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_name(mut self, first: impl Into<String>, last: Option<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = last;
        self
    }

    /// Username, else full name, else `User<id>`
    pub fn display_name(&self) -> String {
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            return username.to_string();
        }
        if let Some(first) = self.first_name.as_deref().filter(|f| !f.is_empty()) {
            return match self.last_name.as_deref().filter(|l| !l.is_empty()) {
                Some(last) => format!("{first} {last}"),
                None => first.to_string(),
            };
        }
        format!("User{}", self.user_id)
    }

    /// How the assistant should address the user: first name, else display name
    pub fn addressed_as(&self) -> String {
        self.first_name
            .clone()
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| self.display_name())
    }
}

/// In-memory, process-lifetime conversation store keyed by user id
pub struct ConversationStore {
    max_history: usize,
    slots: Mutex<HashMap<String, Arc<AsyncMutex<Conversation>>>>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl ConversationStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, user_id: &str) -> Arc<AsyncMutex<Conversation>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(Conversation::with_capacity(self.max_history))))
            .clone()
    }

    /// Wait for exclusive access to a user's history.
    ///
    /// The guard is held for a whole turn; a second turn of the same user queues here.
    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<Conversation> {
        self.slot(user_id).lock_owned().await
    }

    /// Exclusive access without waiting; `None` if a turn is already in flight
    pub fn try_acquire(&self, user_id: &str) -> Option<OwnedMutexGuard<Conversation>> {
        self.slot(user_id).try_lock_owned().ok()
    }

    /// Snapshot of a user's history
    pub async fn history(&self, user_id: &str) -> Conversation {
        self.acquire(user_id).await.clone()
    }

    /// Forget a user's history
    pub async fn reset(&self, user_id: &str) {
        self.acquire(user_id).await.clear();
    }

    /// Number of users with a history slot
    pub fn user_count(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(UserContext::new("7").with_username("ann").display_name(), "ann");
        assert_eq!(
            UserContext::new("7").with_name("Ann", Some("Lee".into())).display_name(),
            "Ann Lee"
        );
        assert_eq!(UserContext::new("7").display_name(), "User7");
        assert_eq!(
            UserContext::new("7").with_username("ann").with_name("Ann", None).addressed_as(),
            "Ann"
        );
    }

    #[tokio::test]
    async fn test_histories_are_per_user() {
        let store = ConversationStore::new(10);
        store.acquire("a").await.push(Message::user("from a"));
        store.acquire("b").await.push(Message::user("from b"));

        assert_eq!(store.history("a").await.len(), 1);
        assert_eq!(store.history("b").await.messages()[0].text(), "from b");
        assert_eq!(store.user_count(), 2);
    }

    #[tokio::test]
    async fn test_same_user_is_exclusive() {
        let store = ConversationStore::new(10);
        let guard = store.acquire("a").await;

        assert!(store.try_acquire("a").is_none());
        assert!(store.try_acquire("b").is_some());

        drop(guard);
        assert!(store.try_acquire("a").is_some());
    }

    #[tokio::test]
    async fn test_store_applies_cap() {
        let store = ConversationStore::new(3);
        {
            let mut conv = store.acquire("a").await;
            for i in 0..5 {
                conv.push(Message::user(format!("{i}")));
            }
        }
        let history = store.history("a").await;
        assert_eq!(history.len(), 3);
        assert_eq!(history.messages()[0].text(), "2");
    }
}
