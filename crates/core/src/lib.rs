// ticketq Core - Domain Logic & Ports
// NO terminal or filesystem dependencies (presentation lives in ticketq-cli)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
