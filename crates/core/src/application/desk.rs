// Service Desk - serialized access to the ticket queue
//
// Every call takes the single queue lock once, so presentation layers that
// share a desk never observe a half-applied mutation.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{Entry, EntryId, PriorityOrderedQueue, Sequence};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, SystemTimeProvider, TicketIdProvider, TimeProvider};

/// Registration receipt handed back to the customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub sequence: Sequence,
    pub id: EntryId,
    pub display_name: String,
    pub is_priority: bool,
    /// 1-based position right after registration
    pub position: usize,
    pub queue_len: usize,
    /// Priority entries served before this one
    pub priority_ahead: usize,
}

/// Point-in-time copy of the queue for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub entries: Vec<Entry>,
    pub priority_count: usize,
    pub normal_count: usize,
    pub next_sequence: Sequence,
    pub taken_at: i64, // epoch ms
}

impl QueueSnapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn front(&self) -> Option<&Entry> {
        self.entries.first()
    }

    /// 1-based position of an entry in this snapshot
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id).map(|i| i + 1)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Service desk (use cases over one `PriorityOrderedQueue`)
pub struct ServiceDesk {
    queue: Mutex<PriorityOrderedQueue>,
    time_provider: Arc<dyn TimeProvider>,
}

impl Default for ServiceDesk {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceDesk {
    /// Desk with the production ID scheme and system clock
    pub fn new() -> Self {
        Self::with_providers(Arc::new(TicketIdProvider), Arc::new(SystemTimeProvider))
    }

    pub fn with_providers(
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            queue: Mutex::new(PriorityOrderedQueue::with_providers(
                id_provider,
                time_provider.clone(),
            )),
            time_provider,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, PriorityOrderedQueue>> {
        self.queue
            .lock()
            .map_err(|e| AppError::Internal(format!("queue lock poisoned: {}", e)))
    }

    /// Register a customer and report where they landed
    pub fn register(&self, display_name: &str, is_priority: bool) -> Result<Ticket> {
        let mut queue = self.lock()?;
        let (sequence, id) = queue.enqueue(display_name, is_priority)?;

        let mut position = 0;
        let mut priority_ahead = 0;
        for (i, entry) in queue.iter().enumerate() {
            if entry.id == id {
                position = i + 1;
                break;
            }
            if entry.is_priority {
                priority_ahead += 1;
            }
        }
        let queue_len = queue.len();

        info!(
            id = %id,
            sequence,
            is_priority,
            position,
            queue_len,
            "Customer registered"
        );

        Ok(Ticket {
            sequence,
            id,
            display_name: display_name.to_string(),
            is_priority,
            position,
            queue_len,
            priority_ahead,
        })
    }

    /// Call the next customer to the counter
    pub fn call_next(&self) -> Result<Option<Entry>> {
        let mut queue = self.lock()?;
        let called = queue.dequeue();
        match &called {
            Some(entry) => info!(
                id = %entry.id,
                waited_ms = entry.waited_ms(self.time_provider.now_millis()),
                remaining = queue.len(),
                "Customer called"
            ),
            None => debug!("Call requested on empty queue"),
        }
        Ok(called)
    }

    /// Remove a customer by ID; `false` when not queued
    pub fn remove(&self, id: &str) -> Result<bool> {
        let mut queue = self.lock()?;
        let removed = queue.remove_by_id(id);
        if removed {
            info!(id = %id, remaining = queue.len(), "Customer removed");
        } else {
            warn!(id = %id, "Remove requested for unknown entry");
        }
        Ok(removed)
    }

    /// Next customer to be served
    pub fn front(&self) -> Result<Option<Entry>> {
        let queue = self.lock()?;
        Ok(queue.peek_front().cloned())
    }

    /// 1-based position of a customer
    pub fn position_of(&self, id: &str) -> Result<Option<usize>> {
        let queue = self.lock()?;
        Ok(queue.position_of(id))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    pub fn snapshot(&self) -> Result<QueueSnapshot> {
        let queue = self.lock()?;
        let entries = queue.to_ordered_list();
        let priority_count = queue.priority_len();
        debug!(len = entries.len(), priority_count, "Queue snapshot taken");

        Ok(QueueSnapshot {
            normal_count: entries.len() - priority_count,
            priority_count,
            next_sequence: queue.next_sequence(),
            taken_at: self.time_provider.now_millis(),
            entries,
        })
    }

    /// Empty the queue; returns how many customers were discarded
    pub fn clear(&self) -> Result<usize> {
        let mut queue = self.lock()?;
        let discarded = queue.len();
        queue.clear();
        info!(discarded, next_sequence = queue.next_sequence(), "Queue cleared");
        Ok(discarded)
    }

    /// Verify the queue structure (diagnostics)
    pub fn check(&self) -> Result<()> {
        let queue = self.lock()?;
        queue.check_invariants().map_err(AppError::from)
    }
}
