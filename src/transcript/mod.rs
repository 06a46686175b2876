//! Append-only chat transcript with an injected persistence collaborator.
//!
//! The transcript is an ordered log of exchanged messages: read once when the
//! store is opened, rewritten in full after every mutation, removed entirely
//! by `clear`. Modeling persistence as a trait keeps the core testable
//! without any ambient storage.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// One transcript entry. Never mutated after creation; ordering is arrival
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Persistence collaborator for the transcript log.
pub trait TranscriptStore: Send + Sync {
    /// The full log, in arrival order.
    fn load(&self) -> Result<Vec<ChatMessage>>;

    /// Append one message and persist the updated log.
    fn append(&self, message: ChatMessage) -> Result<()>;

    /// Drop the log entirely, including its persisted form.
    fn clear(&self) -> Result<()>;
}

/// JSON-file store: the whole log lives under one fixed file, read once at
/// open and rewritten after every append.
pub struct JsonFileStore {
    path: PathBuf,
    messages: Mutex<Vec<ChatMessage>>,
}

impl JsonFileStore {
    /// Open the store, reading any existing log from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let messages = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read transcript at {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse transcript at {}", path.display()))?
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            messages: Mutex::new(messages),
        })
    }

    fn persist(&self, messages: &[ChatMessage]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create transcript directory")?;
            }
        }
        let raw = serde_json::to_string_pretty(messages)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write transcript at {}", self.path.display()))?;
        Ok(())
    }
}

impl TranscriptStore for JsonFileStore {
    fn load(&self) -> Result<Vec<ChatMessage>> {
        let messages = self
            .messages
            .lock()
            .map_err(|_| anyhow::anyhow!("transcript lock poisoned"))?;
        Ok(messages.clone())
    }

    fn append(&self, message: ChatMessage) -> Result<()> {
        let mut messages = self
            .messages
            .lock()
            .map_err(|_| anyhow::anyhow!("transcript lock poisoned"))?;
        messages.push(message);
        self.persist(&messages)
    }

    fn clear(&self) -> Result<()> {
        let mut messages = self
            .messages
            .lock()
            .map_err(|_| anyhow::anyhow!("transcript lock poisoned"))?;
        messages.clear();
        if self.path.exists() {
            fs::remove_file(&self.path).with_context(|| {
                format!("Failed to remove transcript at {}", self.path.display())
            })?;
        }
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    messages: Mutex<Vec<ChatMessage>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TranscriptStore for MemoryStore {
    fn load(&self) -> Result<Vec<ChatMessage>> {
        let messages = self
            .messages
            .lock()
            .map_err(|_| anyhow::anyhow!("transcript lock poisoned"))?;
        Ok(messages.clone())
    }

    fn append(&self, message: ChatMessage) -> Result<()> {
        let mut messages = self
            .messages
            .lock()
            .map_err(|_| anyhow::anyhow!("transcript lock poisoned"))?;
        messages.push(message);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut messages = self
            .messages
            .lock()
            .map_err(|_| anyhow::anyhow!("transcript lock poisoned"))?;
        messages.clear();
        Ok(())
    }
}
