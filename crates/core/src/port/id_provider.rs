// ID Provider Port (for deterministic testing)

use crate::domain::{EntryId, Sequence};

/// ID provider interface (derives an entry ID from its ticket and name)
///
/// Implementations are not required to be collision-free; the queue keeps
/// drawing fresh sequence numbers until the derived ID is unused.
pub trait IdProvider: Send + Sync {
    /// Derive the ID for a new entry
    fn derive_id(&self, sequence: Sequence, display_name: &str) -> EntryId;
}

/// `"{sequence}:{name}"` provider (production)
pub struct TicketIdProvider;

impl IdProvider for TicketIdProvider {
    fn derive_id(&self, sequence: Sequence, display_name: &str) -> EntryId {
        format!("{}:{}", sequence, display_name)
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns the name as the ID for the first `collisions` calls, then
    /// falls back to the ticket scheme. Lets tests force duplicate IDs.
    pub struct CollidingIdProvider {
        remaining: AtomicUsize,
    }

    impl CollidingIdProvider {
        pub fn new(collisions: usize) -> Self {
            Self {
                remaining: AtomicUsize::new(collisions),
            }
        }
    }

    impl IdProvider for CollidingIdProvider {
        fn derive_id(&self, sequence: Sequence, display_name: &str) -> EntryId {
            let left = self.remaining.load(Ordering::SeqCst);
            if left > 0 {
                self.remaining.store(left - 1, Ordering::SeqCst);
                display_name.to_string()
            } else {
                TicketIdProvider.derive_id(sequence, display_name)
            }
        }
    }

    /// Always derives the same ID regardless of input
    pub struct ConstantIdProvider(pub String);

    impl IdProvider for ConstantIdProvider {
        fn derive_id(&self, _sequence: Sequence, _display_name: &str) -> EntryId {
            self.0.clone()
        }
    }
}
