// Service desk constants (No magic values)

/// How many times a custom `IdProvider` may collide before the queue falls
/// back to the `"{sequence}:{name}"` scheme for that enqueue
pub const MAX_ID_DERIVATION_ATTEMPTS: usize = 8;

/// Default `tracing` filter when `RUST_LOG` is not set.
/// Kept at `warn` so interactive screens are not interleaved with logs.
pub const DEFAULT_LOG_FILTER: &str = "ticketq=warn";

/// Priority flag values accepted from the console
pub const PRIORITY_FLAG_NORMAL: i32 = 0;
pub const PRIORITY_FLAG_PRIORITY: i32 = 1;
