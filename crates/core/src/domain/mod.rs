// Domain Layer - Pure queue logic and entities

pub mod entry;
pub mod error;
pub mod queue;

// Re-exports
pub use entry::{Entry, EntryId, Sequence, ServiceClass};
pub use error::DomainError;
pub use queue::{Iter, PriorityOrderedQueue};
