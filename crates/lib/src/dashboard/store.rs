//! Message records, id assignment and the repository they are kept in.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

const DEFAULT_AUTHOR: &str = "user";

/// Which list a message belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageScope {
    /// The single shared list behind `/api/messages/global`.
    Global,
    /// One list per conversation id.
    Conversation(String),
}

/// A stored chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub text: String,
    /// RFC 3339, UTC, millisecond precision.
    pub timestamp: String,
}

/// Wire shape of a conversation-scope record: the author is named `sender`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationMessage<'a> {
    pub id: &'a str,
    pub sender: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<&'a str>,
    pub text: &'a str,
    pub timestamp: &'a str,
}

impl<'a> From<&'a ChatMessage> for ConversationMessage<'a> {
    fn from(m: &'a ChatMessage) -> Self {
        Self {
            id: &m.id,
            sender: &m.author,
            avatar: m.avatar.as_deref(),
            text: &m.text,
            timestamp: &m.timestamp,
        }
    }
}

/// POST body for a new message. `sender` is accepted as an alias of `author`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMessage {
    #[serde(default)]
    pub text: String,
    #[serde(default, alias = "sender")]
    pub author: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl ChatMessage {
    /// Build the stored record: server id and timestamp, author defaulting to "user".
    pub fn from_new(new: NewMessage, id: u64) -> Self {
        let author = new
            .author
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());
        Self {
            id: id.to_string(),
            author,
            avatar: new.avatar,
            text: new.text,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Message ids from wall-clock milliseconds, strictly increasing within the process.
#[derive(Debug, Default)]
pub struct MessageIds {
    last: AtomicU64,
}

impl MessageIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id: `now_ms`, or one past the previous id when the clock has not moved on.
    pub fn next_after(&self, now_ms: u64) -> u64 {
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now_ms.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now_ms.max(prev + 1)
    }

    pub fn next(&self) -> u64 {
        let now_ms = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.next_after(now_ms)
    }
}

/// Storage for message lists: read a list, append to a list.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Messages in insertion order; empty when the scope has none yet.
    async fn list(&self, scope: &MessageScope) -> Vec<ChatMessage>;
    async fn append(&self, scope: &MessageScope, message: ChatMessage);
}

/// Process-local repository. Contents are lost on restart.
pub struct InMemoryMessageRepository {
    inner: Arc<RwLock<HashMap<MessageScope, Vec<ChatMessage>>>>,
}

impl Default for InMemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn list(&self, scope: &MessageScope) -> Vec<ChatMessage> {
        self.inner
            .read()
            .await
            .get(scope)
            .cloned()
            .unwrap_or_default()
    }

    async fn append(&self, scope: &MessageScope, message: ChatMessage) {
        self.inner
            .write()
            .await
            .entry(scope.clone())
            .or_default()
            .push(message);
    }
}
