//! # comms-messenger
//!
//! Routes payloads to locally registered recipients by [`RecipientId`].
//!
//! One control loop owns the registry; callers talk to it over one bounded
//! channel per operation and await a one-shot reply. Each registered
//! recipient gets a mailbox task that hands payloads to its endpoint in the
//! order the loop processed them.

#![deny(unsafe_code)]

pub mod error;
pub mod instance;
mod mailbox;
pub mod messenger;

pub use comms_core::RecipientId;
pub use error::{MessengerError, Result};
pub use instance::Instance;
pub use messenger::Messenger;
