//! # comms-node
//!
//! A relay node built from the comms crates.
//!
//! - `/ws`: every accepted session becomes a messenger recipient; inbound
//!   [`envelope::Envelope::Message`]s are routed by recipient ID and bounced
//!   back as undeliverable when nobody is registered under the target
//! - `/health`: liveness and connection counters
//! - `/metrics`: Prometheus text exposition
//! - [`bridge`]: pipes a dialed session to JSON lines on stdin/stdout

#![deny(unsafe_code)]

pub mod bridge;
pub mod envelope;
pub mod health;
pub mod metrics;
pub mod relay;
pub mod server;

pub use envelope::Envelope;
pub use server::{AppState, NodeServer, RunningNode};
