//! Metric names shared across crates.
//!
//! Recording goes through the `metrics` facade; the hosting binary decides
//! which recorder (if any) is installed.

/// Sessions started (counter).
pub const SESSIONS_STARTED_TOTAL: &str = "comms_sessions_started_total";
/// Sessions torn down (counter, labels: reason).
pub const SESSIONS_CLOSED_TOTAL: &str = "comms_sessions_closed_total";
/// Currently active sessions (gauge).
pub const SESSIONS_ACTIVE: &str = "comms_sessions_active";
/// Session lifetime from start to teardown (histogram).
pub const SESSION_DURATION_SECONDS: &str = "comms_session_duration_seconds";
/// Payload frames received and decoded (counter).
pub const FRAMES_RECEIVED_TOTAL: &str = "comms_frames_received_total";
/// Payload frames transmitted (counter).
pub const FRAMES_SENT_TOTAL: &str = "comms_frames_sent_total";
/// Heartbeat pings transmitted (counter).
pub const PINGS_SENT_TOTAL: &str = "comms_pings_sent_total";
/// Pongs received (counter).
pub const PONGS_RECEIVED_TOTAL: &str = "comms_pongs_received_total";
/// Registered messenger recipients (gauge).
pub const RECIPIENTS_REGISTERED: &str = "comms_recipients_registered";
/// Messenger deliveries (counter, labels: outcome).
pub const DELIVERIES_TOTAL: &str = "comms_deliveries_total";
