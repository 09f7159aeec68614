//! Deadline and heartbeat policy.
//!
//! These values are shared with peers running the same protocol and must not
//! drift. The ping period is derived from the pong wait so that at least one
//! ping is always sent before the peer's read deadline can expire.

use std::time::Duration;

/// Deadline applied to every outbound write (payload, ping or close frame).
pub const WRITE_DEADLINE: Duration = Duration::from_secs(10);

/// Deadline applied to the opening handshake, before the liveness window
/// takes over.
pub const READ_DEADLINE: Duration = WRITE_DEADLINE;

/// Liveness window: a pong must arrive within this long after the read
/// deadline was last armed.
pub const PONG_WAIT: Duration = Duration::from_secs(60);

/// Interval between heartbeat pings.
pub const PING_PERIOD: Duration = ping_period_for(PONG_WAIT);

/// Maximum accepted size of one inbound message, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 4096;

/// Read buffer size handed to the WebSocket layer, in bytes.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Write buffer size handed to the WebSocket layer, in bytes.
pub const WRITE_BUFFER_SIZE: usize = 1024;

/// How long the outbound pump lingers after sending a close frame on
/// process interrupt.
pub const INTERRUPT_GRACE_PERIOD: Duration = Duration::from_secs(4);

/// WebSocket close code for a normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Ping period for a given pong wait (9/10 of it, saturating at
/// `u64::MAX` milliseconds).
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_lossless)]
pub const fn ping_period_for(pong_wait: Duration) -> Duration {
    let millis = pong_wait.as_millis() * 9 / 10;
    if millis > u64::MAX as u128 {
        Duration::from_millis(u64::MAX)
    } else {
        Duration::from_millis(millis as u64)
    }
}
