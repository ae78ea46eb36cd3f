use std::time::Duration;

/// Scheduler reconciliation tick.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Bounded retry count for establishing a worker connection.
pub const CONNECT_RETRY_LIMIT: u32 = 3;

/// Base backoff between connection attempts; doubles per attempt.
pub const CONNECT_BACKOFF: Duration = Duration::from_millis(250);

pub const DEFAULT_PACING: Duration = Duration::from_secs(1);
pub const DEFAULT_GRACEFUL_RAMPDOWN: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
