//! Connection establishment: dial, raw accept, and axum upgrade.
//!
//! Every path applies the policy's buffer and message sizes to the WebSocket
//! layer and yields an idle [`Session`].

use std::future::Future;

use axum::extract::ws::WebSocketUpgrade;
use axum::response::Response;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::policy::SocketPolicy;
use crate::session::Session;
use crate::transport::Connection;

/// Builds sessions that share one policy and one interrupt token.
#[derive(Clone, Debug)]
pub struct Bootstrap {
    policy: SocketPolicy,
    interrupt: CancellationToken,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new(SocketPolicy::default())
    }
}

impl Bootstrap {
    /// Create a bootstrap with its own, never-fired interrupt token.
    pub fn new(policy: SocketPolicy) -> Self {
        Self {
            policy,
            interrupt: CancellationToken::new(),
        }
    }

    /// Use a shared interrupt token (typically
    /// [`crate::ShutdownCoordinator::token`]).
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: CancellationToken) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Policy applied to every session.
    pub fn policy(&self) -> &SocketPolicy {
        &self.policy
    }

    /// Wrap an already-established connection.
    pub fn session<In, Out>(&self, connection: Connection) -> Session<In, Out>
    where
        In: DeserializeOwned + Send + 'static,
        Out: Serialize + Send + 'static,
    {
        Session::new(connection, self.policy.clone(), self.interrupt.clone())
    }

    /// Dial `url` and complete the client handshake within the read deadline.
    pub async fn dial<In, Out>(&self, url: &str) -> Result<Session<In, Out>, TransportError>
    where
        In: DeserializeOwned + Send + 'static,
        Out: Serialize + Send + 'static,
    {
        let deadline = self.policy.read_deadline;
        let connect = tokio_tungstenite::connect_async_with_config(url, Some(self.ws_config()), false);
        let (ws, response) = tokio::time::timeout(deadline, connect)
            .await
            .map_err(|_| TransportError::HandshakeTimeout(deadline))?
            .map_err(|source| TransportError::Dial {
                url: url.to_owned(),
                source,
            })?;
        info!(url, status = %response.status(), "dialed");
        Ok(self.session(Connection::from_tungstenite(ws, url)))
    }

    /// Perform the server handshake on an accepted TCP stream.
    pub async fn accept<In, Out>(&self, stream: TcpStream) -> Result<Session<In, Out>, TransportError>
    where
        In: DeserializeOwned + Send + 'static,
        Out: Serialize + Send + 'static,
    {
        let peer = stream.peer_addr()?.to_string();
        let deadline = self.policy.read_deadline;
        let handshake = tokio_tungstenite::accept_async_with_config(stream, Some(self.ws_config()));
        let ws = tokio::time::timeout(deadline, handshake)
            .await
            .map_err(|_| TransportError::HandshakeTimeout(deadline))?
            .map_err(TransportError::Upgrade)?;
        debug!(%peer, "accepted");
        Ok(self.session(Connection::from_tungstenite(ws, peer)))
    }

    /// Upgrade an axum request and hand the idle session to `on_session`.
    pub fn accept_upgrade<In, Out, F, Fut>(
        &self,
        upgrade: WebSocketUpgrade,
        peer: impl Into<String>,
        on_session: F,
    ) -> Response
    where
        In: DeserializeOwned + Send + 'static,
        Out: Serialize + Send + 'static,
        F: FnOnce(Session<In, Out>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let bootstrap = self.clone();
        let peer = peer.into();
        upgrade
            .read_buffer_size(self.policy.read_buffer_size)
            .write_buffer_size(self.policy.write_buffer_size)
            .max_message_size(self.policy.max_message_size)
            .on_upgrade(move |socket| async move {
                debug!(%peer, "upgraded");
                let session = bootstrap.session(Connection::from_axum(socket, peer));
                on_session(session).await;
            })
    }

    fn ws_config(&self) -> WebSocketConfig {
        WebSocketConfig::default()
            .read_buffer_size(self.policy.read_buffer_size)
            .write_buffer_size(self.policy.write_buffer_size)
            .max_message_size(Some(self.policy.max_message_size))
    }
}
