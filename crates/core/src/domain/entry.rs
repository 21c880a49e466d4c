// Entry Domain Model

use serde::{Deserialize, Serialize};

/// Ticket sequence number (first ticket is 1)
pub type Sequence = u64;

/// Entry identifier, unique among queued entries
pub type EntryId = String;

/// Service class of a queued participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceClass {
    Priority,
    Normal,
}

impl ServiceClass {
    pub fn from_flag(is_priority: bool) -> Self {
        if is_priority {
            ServiceClass::Priority
        } else {
            ServiceClass::Normal
        }
    }
}

impl std::fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceClass::Priority => write!(f, "PRIORITY"),
            ServiceClass::Normal => write!(f, "NORMAL"),
        }
    }
}

/// A single queued participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub sequence: Sequence,
    pub display_name: String,
    pub is_priority: bool,
    pub enqueued_at: i64, // epoch ms
}

impl Entry {
    /// Create a new Entry
    ///
    /// # Arguments
    ///
    /// * `id` - Unique entry ID (derived by the queue, not by the caller)
    /// * `sequence` - Ticket number
    /// * `display_name` - Name as supplied
    /// * `is_priority` - Priority flag, fixed for the entry's lifetime
    /// * `enqueued_at` - Timestamp in epoch ms (injected, not system time)
    pub fn new(
        id: impl Into<String>,
        sequence: Sequence,
        display_name: impl Into<String>,
        is_priority: bool,
        enqueued_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            sequence,
            display_name: display_name.into(),
            is_priority,
            enqueued_at,
        }
    }

    pub fn class(&self) -> ServiceClass {
        ServiceClass::from_flag(self.is_priority)
    }

    /// Milliseconds spent waiting, clamped at zero
    pub fn waited_ms(&self, now_millis: i64) -> i64 {
        (now_millis - self.enqueued_at).max(0)
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}
