use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::MemorySettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Ordered history of one conversation. A system message, if any, is always first
/// and there is at most one.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    messages: Vec<ChatMessage>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Adds the system prompt only to a brand-new conversation. Returns whether it was added.
    pub fn seed_system(&mut self, prompt: &str) -> bool {
        if !self.is_empty() {
            return false;
        }
        self.messages.push(ChatMessage::new(Role::System, prompt));
        true
    }

    pub fn record_turn(&mut self, prompt: impl Into<String>, reply: impl Into<String>) {
        self.messages.push(ChatMessage::new(Role::User, prompt));
        self.messages.push(ChatMessage::new(Role::Assistant, reply));
    }
}

pub type SharedMemory = Arc<Mutex<ConversationMemory>>;

struct Slot {
    memory: SharedMemory,
    last_used: Instant,
}

/// Conversation histories keyed by caller-supplied id, bounded by an LRU
/// capacity and an optional idle TTL.
pub struct ConversationStore {
    slots: Mutex<LruCache<String, Slot>>,
    idle_ttl: Option<Duration>,
}

impl ConversationStore {
    pub fn new(settings: &MemorySettings) -> Self {
        let capacity = NonZeroUsize::new(settings.max_conversations).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Mutex::new(LruCache::new(capacity)),
            idle_ttl: settings.idle_ttl,
        }
    }

    fn expired(&self, slot: &Slot, now: Instant) -> bool {
        self.idle_ttl
            .is_some_and(|ttl| now.duration_since(slot.last_used) > ttl)
    }

    /// Returns the memory for `id`, creating an empty one when it is missing or stale.
    pub async fn get_or_create(&self, id: &str) -> SharedMemory {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;

        if let Some(slot) = slots.get_mut(id) {
            if !self.expired(slot, now) {
                slot.last_used = now;
                return slot.memory.clone();
            }
            debug!("Conversation '{}' expired, starting fresh", id);
        }

        let memory: SharedMemory = Arc::new(Mutex::new(ConversationMemory::new()));
        let slot = Slot {
            memory: memory.clone(),
            last_used: now,
        };
        if let Some((evicted, _)) = slots.push(id.to_string(), slot) {
            if evicted != id {
                info!("Conversation store full, evicted '{}'", evicted);
            }
        }
        memory
    }

    /// Drops the conversation. Returns false when there was nothing to drop.
    pub async fn clear(&self, id: &str) -> bool {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;
        match slots.pop(id) {
            Some(slot) => !self.expired(&slot, now),
            None => false,
        }
    }

    /// Number of live conversations. Expired ones are purged on the way.
    pub async fn count(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;

        let stale: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| self.expired(slot, now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in stale {
            slots.pop(&id);
        }
        slots.len()
    }
}
