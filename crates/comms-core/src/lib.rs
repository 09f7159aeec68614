//! # comms-core
//!
//! Shared vocabulary for the comms crates.
//!
//! - **Timing policy**: write/read deadlines, pong wait, ping period, frame
//!   and buffer sizes, interrupt grace period ([`constants`])
//! - **Branded IDs**: [`RecipientId`] and [`SessionId`] as UUID newtypes
//! - **Logging**: `tracing` subscriber initialization ([`logging`])
//! - **Metrics**: metric name constants shared by every crate ([`metrics`])
//! - **Routines**: the queue-consumer helper ([`routine`])

#![deny(unsafe_code)]

pub mod constants;
pub mod ids;
pub mod logging;
pub mod metrics;
pub mod routine;

pub use ids::{RecipientId, SessionId};
