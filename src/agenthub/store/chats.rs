// SPDX-License-Identifier: MIT

//! Chat repository

use crate::adk::error::HubError;
use crate::adk::model::Content;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Reply,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// RFC 3339
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

impl ChatMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            kind,
            timestamp: Utc::now().to_rfc3339(),
            files: Vec::new(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageKind::User, text)
    }

    pub fn reply(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Reply, text)
    }

    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub name: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: String,
    pub updated_at: String,
}

impl Chat {
    fn new() -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            name: "New Chat".to_string(),
            messages: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// The last `window` messages as model turns, always opening on a user turn
    pub fn transcript(&self, window: usize) -> Vec<Content> {
        let skip = self.messages.len().saturating_sub(window);
        self.messages[skip..]
            .iter()
            .skip_while(|m| m.kind == MessageKind::Reply)
            .map(|m| match m.kind {
                MessageKind::User => Content::user(m.text.clone()),
                MessageKind::Reply => Content::model(m.text.clone()),
            })
            .collect()
    }

    pub fn summary(&self) -> ChatSummary {
        ChatSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
            message_count: self.messages.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    pub message_count: usize,
}

/// Storage backend for chats
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn create(&self) -> Chat;
    async fn get(&self, id: &str) -> Option<Chat>;
    /// Summaries, most recently updated first
    async fn list(&self) -> Vec<ChatSummary>;
    async fn append(&self, id: &str, messages: Vec<ChatMessage>) -> Result<(), HubError>;
    /// Returns false when the chat did not exist
    async fn delete(&self, id: &str) -> bool;
}

/// Process-local chat store; contents are lost on restart
#[derive(Clone, Default)]
pub struct InMemoryChatStore {
    chats: Arc<RwLock<HashMap<String, Chat>>>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn create(&self) -> Chat {
        let chat = Chat::new();
        log::info!("Created chat {}", chat.id);
        self.chats
            .write()
            .await
            .insert(chat.id.clone(), chat.clone());
        chat
    }

    async fn get(&self, id: &str) -> Option<Chat> {
        self.chats.read().await.get(id).cloned()
    }

    async fn list(&self) -> Vec<ChatSummary> {
        let chats = self.chats.read().await;
        let mut summaries: Vec<ChatSummary> = chats.values().map(Chat::summary).collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        summaries
    }

    async fn append(&self, id: &str, messages: Vec<ChatMessage>) -> Result<(), HubError> {
        let mut chats = self.chats.write().await;
        let chat = chats
            .get_mut(id)
            .ok_or_else(|| HubError::ChatNotFound(id.to_string()))?;
        chat.messages.extend(messages);
        chat.updated_at = Utc::now().to_rfc3339();
        Ok(())
    }

    async fn delete(&self, id: &str) -> bool {
        let removed = self.chats.write().await.remove(id).is_some();
        if removed {
            log::info!("Deleted chat {}", id);
        }
        removed
    }
}
