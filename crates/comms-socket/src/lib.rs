//! # comms-socket
//!
//! Typed duplex sessions over a WebSocket connection.
//!
//! - [`Session`]: one connection plus its inbound and outbound pumps, with a
//!   sliding pong-driven read deadline and periodic heartbeat pings
//! - [`Bootstrap`]: dial a URL or accept an inbound upgrade, yielding an
//!   idle session
//! - [`transport`]: the frame-level connection abstraction, with adapters for
//!   `tokio-tungstenite` and `axum` and an in-memory duplex pair
//! - [`ShutdownCoordinator`]: one process-level interrupt fanned out to every
//!   session

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod error;
pub mod policy;
mod pump;
pub mod session;
pub mod shutdown;
pub mod transport;

pub use bootstrap::Bootstrap;
pub use error::{SessionError, TransportError};
pub use policy::SocketPolicy;
pub use session::{CloseReason, Session, SessionState};
pub use shutdown::ShutdownCoordinator;
pub use transport::{CloseFrame, Connection, Frame};
