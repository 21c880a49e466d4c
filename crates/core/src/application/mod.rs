// Application Layer - Use Cases consumed by presentation layers

pub mod constants;
pub mod desk;

// Re-exports
pub use desk::{QueueSnapshot, ServiceDesk, Ticket};
