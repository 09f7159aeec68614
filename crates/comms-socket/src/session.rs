//! Connection session: one connection, two pumps, one teardown.
//!
//! A [`Session`] is created idle by [`crate::Bootstrap`] (or directly from a
//! [`Connection`]). [`Session::start`] spawns the inbound pump, which reads
//! and decodes frames under a sliding pong-driven deadline, and the outbound
//! pump, which serializes queued payloads and sends heartbeat pings. Either
//! pump terminating tears the connection down; the other observes the
//! teardown and exits.

use std::fmt;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use metrics::{counter, gauge, histogram};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use comms_core::SessionId;
use comms_core::metrics::{
    SESSION_DURATION_SECONDS, SESSIONS_ACTIVE, SESSIONS_CLOSED_TOTAL, SESSIONS_STARTED_TOTAL,
};

use crate::error::SessionError;
use crate::policy::SocketPolicy;
use crate::pump;
use crate::transport::Connection;

/// Lifecycle state of a session. `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Created, pumps not running.
    Idle,
    /// Both pumps spawned.
    Active,
    /// Connection torn down.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Closed => "closed",
        })
    }
}

/// Why a session was torn down.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer sent a close frame.
    PeerClosed,
    /// No pong arrived within the pong wait.
    LivenessTimeout,
    /// Reading a frame failed.
    ReadFailed(String),
    /// An inbound data frame exceeded the maximum message size.
    MessageTooLarge(usize),
    /// An inbound payload was not valid JSON for the expected type.
    DecodeFailed(String),
    /// Writing a payload, ping or close frame failed.
    WriteFailed(String),
    /// Every outbound sender was dropped.
    OutboundFinished,
    /// [`Session::close`] was called.
    Closed,
    /// The process-level interrupt fired.
    Interrupted,
    /// The inbound queue consumer went away.
    InboundDropped,
    /// The connection ended without a close frame.
    ConnectionLost,
}

impl CloseReason {
    /// Short stable label, used as a metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PeerClosed => "peer_closed",
            Self::LivenessTimeout => "liveness_timeout",
            Self::ReadFailed(_) => "read_failed",
            Self::MessageTooLarge(_) => "message_too_large",
            Self::DecodeFailed(_) => "decode_failed",
            Self::WriteFailed(_) => "write_failed",
            Self::OutboundFinished => "outbound_finished",
            Self::Closed => "closed",
            Self::Interrupted => "interrupted",
            Self::InboundDropped => "inbound_dropped",
            Self::ConnectionLost => "connection_lost",
        }
    }

    /// Whether the session ended through a cooperative path.
    pub fn is_graceful(&self) -> bool {
        matches!(
            self,
            Self::PeerClosed | Self::OutboundFinished | Self::Closed | Self::Interrupted
        )
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed(e) => write!(f, "read failed: {e}"),
            Self::MessageTooLarge(size) => write!(f, "message too large: {size} bytes"),
            Self::DecodeFailed(e) => write!(f, "decode failed: {e}"),
            Self::WriteFailed(e) => write!(f, "write failed: {e}"),
            other => f.write_str(other.label()),
        }
    }
}

const IDLE: u8 = 0;
const ACTIVE: u8 = 1;
const CLOSED: u8 = 2;

/// State shared by the session handle and both pumps.
pub(crate) struct Lifecycle {
    session_id: SessionId,
    state: AtomicU8,
    close_requested: AtomicBool,
    /// Fired by [`Session::close`]; observed by the outbound pump.
    pub(crate) close_signal: CancellationToken,
    /// Fired exactly once when the connection is torn down.
    pub(crate) torn_down: CancellationToken,
    reason: Mutex<Option<CloseReason>>,
    started_at: OnceLock<Instant>,
}

impl Lifecycle {
    fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            state: AtomicU8::new(IDLE),
            close_requested: AtomicBool::new(false),
            close_signal: CancellationToken::new(),
            torn_down: CancellationToken::new(),
            reason: Mutex::new(None),
            started_at: OnceLock::new(),
        }
    }

    fn state(&self) -> SessionState {
        match self.state.load(Ordering::Acquire) {
            IDLE => SessionState::Idle,
            ACTIVE => SessionState::Active,
            _ => SessionState::Closed,
        }
    }

    fn activate(&self) -> bool {
        if self
            .state
            .compare_exchange(IDLE, ACTIVE, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let _ = self.started_at.set(Instant::now());
        counter!(SESSIONS_STARTED_TOTAL).increment(1);
        gauge!(SESSIONS_ACTIVE).increment(1.0);
        true
    }

    /// Remember `reason` unless an earlier one was already recorded.
    pub(crate) fn record(&self, reason: CloseReason) {
        let mut slot = self.reason.lock();
        if slot.is_none() {
            *slot = Some(reason);
        }
    }

    /// Replace the recorded reason, unless the session is already torn down.
    pub(crate) fn overrule(&self, reason: CloseReason) {
        let mut slot = self.reason.lock();
        if !self.torn_down.is_cancelled() {
            *slot = Some(reason);
        }
    }

    fn reason(&self) -> Option<CloseReason> {
        self.reason.lock().clone()
    }

    /// Tear the session down. Only the first call has any effect.
    pub(crate) fn finish(&self, reason: CloseReason) {
        self.record(reason);
        let previous = self.state.swap(CLOSED, Ordering::AcqRel);
        if previous == CLOSED {
            return;
        }
        self.torn_down.cancel();

        let reason = self.reason().unwrap_or(CloseReason::ConnectionLost);
        if reason.is_graceful() {
            info!(session_id = %self.session_id, %reason, "session closed");
        } else {
            warn!(session_id = %self.session_id, %reason, "session torn down");
        }
        counter!(SESSIONS_CLOSED_TOTAL, "reason" => reason.label()).increment(1);
        if previous == ACTIVE {
            gauge!(SESSIONS_ACTIVE).decrement(1.0);
            if let Some(started) = self.started_at.get() {
                histogram!(SESSION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
            }
        }
    }
}

struct Pending<In, Out> {
    connection: Connection,
    inbound_tx: mpsc::Sender<In>,
    outbound_rx: mpsc::Receiver<Out>,
}

/// A typed duplex session over one connection.
///
/// `In` is decoded from every inbound data frame; `Out` is serialized for
/// every payload written to [`Session::outbound`]. Dropping the session
/// drops its own outbound sender, so once every other clone is gone the
/// outbound pump sends a close frame and terminates.
pub struct Session<In, Out> {
    id: SessionId,
    peer: String,
    policy: SocketPolicy,
    lifecycle: Arc<Lifecycle>,
    pending: Mutex<Option<Pending<In, Out>>>,
    inbound: Mutex<Option<mpsc::Receiver<In>>>,
    outbound: Mutex<Option<mpsc::Sender<Out>>>,
    interrupt: CancellationToken,
}

impl<In, Out> Session<In, Out>
where
    In: DeserializeOwned + Send + 'static,
    Out: Serialize + Send + 'static,
{
    /// Wrap an established connection in an idle session.
    ///
    /// `interrupt` is the process-level shutdown token; cancelling it makes
    /// the outbound pump close the connection cooperatively.
    pub fn new(connection: Connection, policy: SocketPolicy, interrupt: CancellationToken) -> Self {
        let id = SessionId::new();
        let (inbound_tx, inbound_rx) = mpsc::channel(policy.inbound_capacity.max(1));
        let (outbound_tx, outbound_rx) = mpsc::channel(policy.outbound_capacity.max(1));
        let peer = connection.peer().to_owned();
        debug!(session_id = %id, %peer, "session created");
        Self {
            id,
            peer,
            policy,
            lifecycle: Arc::new(Lifecycle::new(id)),
            pending: Mutex::new(Some(Pending {
                connection,
                inbound_tx,
                outbound_rx,
            })),
            inbound: Mutex::new(Some(inbound_rx)),
            outbound: Mutex::new(Some(outbound_tx)),
            interrupt,
        }
    }

    /// Spawn the inbound and outbound pumps.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<(), SessionError> {
        self.policy.validate()?;

        let Some(pending) = self.pending.lock().take() else {
            return Err(match self.state() {
                SessionState::Closed => SessionError::Closed,
                _ => SessionError::AlreadyStarted,
            });
        };
        if !self.lifecycle.activate() {
            return Err(SessionError::Closed);
        }

        let (sink, stream) = pending.connection.into_parts();
        let span = info_span!("session", session_id = %self.id, peer = %self.peer);

        let _ = tokio::spawn(
            pump::inbound::run(
                stream,
                pending.inbound_tx,
                self.lifecycle.clone(),
                self.policy.pong_wait,
                self.policy.max_message_size,
            )
            .instrument(span.clone()),
        );
        let _ = tokio::spawn(
            pump::outbound::run(
                sink,
                pending.outbound_rx,
                self.lifecycle.clone(),
                pump::outbound::Timing::from(&self.policy),
                self.interrupt.clone(),
            )
            .instrument(span),
        );

        info!(session_id = %self.id, peer = %self.peer, "session started");
        Ok(())
    }

    /// Take the queue of decoded inbound payloads. Only one consumer may
    /// hold it.
    pub fn take_inbound(&self) -> Result<mpsc::Receiver<In>, SessionError> {
        self.inbound.lock().take().ok_or(SessionError::InboundTaken)
    }

    /// A sender for outbound payloads.
    pub fn outbound(&self) -> Result<mpsc::Sender<Out>, SessionError> {
        self.outbound
            .lock()
            .as_ref()
            .cloned()
            .ok_or(SessionError::OutboundClosed)
    }

    /// Drop the session's own outbound sender.
    ///
    /// Once every sender obtained from [`Session::outbound`] is dropped too,
    /// the outbound pump sends a close frame and terminates.
    pub fn close_outbound(&self) {
        drop(self.outbound.lock().take());
    }
}

impl<In, Out> Session<In, Out> {
    /// Request a normal-closure shutdown. Returns `false` if a close was
    /// already requested.
    pub fn close(&self) -> bool {
        if self.lifecycle.close_requested.swap(true, Ordering::AcqRel) {
            return false;
        }
        // Never started: nothing to send, drop the connection right away.
        let pending = self.pending.lock().take();
        if let Some(pending) = pending {
            drop(pending);
            self.lifecycle.finish(CloseReason::Closed);
        } else {
            self.lifecycle.close_signal.cancel();
        }
        true
    }

    /// Unique ID of this session.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Remote address or label of the peer.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Policy the session runs with.
    pub fn policy(&self) -> &SocketPolicy {
        &self.policy
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.lifecycle.state()
    }

    /// Why the session ended, once it has.
    pub fn close_reason(&self) -> Option<CloseReason> {
        if self.lifecycle.torn_down.is_cancelled() {
            self.lifecycle.reason()
        } else {
            None
        }
    }

    /// Wait until the connection is torn down.
    pub async fn closed(&self) -> CloseReason {
        self.lifecycle.torn_down.cancelled().await;
        self.lifecycle.reason().unwrap_or(CloseReason::ConnectionLost)
    }
}

impl<In, Out> fmt::Debug for Session<In, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use futures::{SinkExt, StreamExt};
    use serde::Deserialize;

    use crate::transport::{self, Frame, FrameSink, FrameStream};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Msg {
        n: u32,
    }

    fn fast_policy() -> SocketPolicy {
        SocketPolicy {
            write_deadline: Duration::from_millis(200),
            interrupt_grace: Duration::from_millis(400),
            ..SocketPolicy::default().with_pong_wait(Duration::from_secs(1))
        }
    }

    fn pair(policy: SocketPolicy) -> (Session<Msg, Msg>, FrameSink, FrameStream, CancellationToken) {
        let (local, remote) = transport::duplex(16);
        let interrupt = CancellationToken::new();
        let session = Session::new(local, policy, interrupt.clone());
        let (tx, rx) = remote.into_parts();
        (session, tx, rx, interrupt)
    }

    /// Answer every ping with a pong until the stream ends; forward data and
    /// close frames to the returned queue.
    fn ponging_peer(
        mut tx: FrameSink,
        mut rx: FrameStream,
    ) -> tokio::sync::mpsc::UnboundedReceiver<Frame> {
        let (seen_tx, seen_rx) = tokio::sync::mpsc::unbounded_channel();
        let _ = tokio::spawn(async move {
            while let Some(Ok(frame)) = rx.next().await {
                match frame {
                    Frame::Ping(data) => {
                        if tx.send(Frame::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    other => {
                        let _ = seen_tx.send(other);
                    }
                }
            }
        });
        seen_rx
    }

    #[test]
    fn close_reason_labels_and_grace() {
        assert_eq!(CloseReason::LivenessTimeout.label(), "liveness_timeout");
        assert!(CloseReason::PeerClosed.is_graceful());
        assert!(!CloseReason::WriteFailed("x".into()).is_graceful());
        assert_eq!(
            CloseReason::MessageTooLarge(5000).to_string(),
            "message too large: 5000 bytes"
        );
        assert_eq!(CloseReason::Interrupted.to_string(), "interrupted");
    }

    #[tokio::test]
    async fn new_session_is_idle() {
        let (session, _tx, _rx, _int) = pair(fast_policy());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.close_reason().is_none());
        assert_eq!(session.peer(), "memory:a");
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let (session, _tx, _rx, _int) = pair(fast_policy());
        session.start().unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert_matches!(session.start(), Err(SessionError::AlreadyStarted));
        let _ = session.close();
    }

    #[tokio::test]
    async fn start_with_invalid_policy_fails() {
        let policy = SocketPolicy {
            ping_period: Duration::from_secs(90),
            ..SocketPolicy::default()
        };
        let (session, _tx, _rx, _int) = pair(policy);
        assert_matches!(session.start(), Err(SessionError::InvalidPolicy(_)));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn close_twice_is_noop() {
        let (session, tx, rx, _int) = pair(fast_policy());
        let _seen = ponging_peer(tx, rx);
        session.start().unwrap();
        assert!(session.close());
        assert!(!session.close());
        assert_eq!(session.closed().await, CloseReason::Closed);
        assert!(!session.close());
    }

    #[tokio::test]
    async fn close_idle_session_tears_down_without_start() {
        let (session, _tx, mut rx, _int) = pair(fast_policy());
        assert!(session.close());
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.close_reason(), Some(CloseReason::Closed));
        assert_matches!(session.start(), Err(SessionError::Closed));
        // The connection was dropped, so the peer sees end of stream.
        assert!(rx.next().await.is_none());
    }

    #[tokio::test]
    async fn close_sends_normal_close_frame() {
        let (session, tx, rx, _int) = pair(fast_policy());
        let mut seen = ponging_peer(tx, rx);
        session.start().unwrap();
        let _ = session.close();
        assert_eq!(seen.recv().await, Some(Frame::normal_close()));
    }

    #[tokio::test]
    async fn payloads_queued_before_close_are_transmitted() {
        let (session, tx, rx, _int) = pair(fast_policy());
        let mut seen = ponging_peer(tx, rx);
        let out = session.outbound().unwrap();
        for n in 0..3 {
            out.send(Msg { n }).await.unwrap();
        }
        session.start().unwrap();
        let _ = session.close();

        let mut texts = Vec::new();
        while let Some(frame) = seen.recv().await {
            match frame {
                Frame::Text(text) => texts.push(text),
                Frame::Close(_) => break,
                other => panic!("unexpected frame {other:?}"),
            }
        }
        assert_eq!(texts, [r#"{"n":0}"#, r#"{"n":1}"#, r#"{"n":2}"#]);
        assert_eq!(session.closed().await, CloseReason::Closed);
    }

    #[tokio::test]
    async fn inbound_payloads_are_decoded() {
        let (session, mut tx, _peer_rx, _int) = pair(fast_policy());
        let mut inbound = session.take_inbound().unwrap();
        assert_matches!(session.take_inbound(), Err(SessionError::InboundTaken));
        session.start().unwrap();

        tx.send(Frame::Text(r#"{"n":7}"#.into())).await.unwrap();
        tx.send(Frame::Binary(br#"{"n":8}"#.to_vec())).await.unwrap();
        assert_eq!(inbound.recv().await, Some(Msg { n: 7 }));
        assert_eq!(inbound.recv().await, Some(Msg { n: 8 }));
        let _ = session.close();
    }

    #[tokio::test]
    async fn decode_error_tears_session_down() {
        let (session, mut tx, _rx, _int) = pair(fast_policy());
        session.start().unwrap();
        tx.send(Frame::Text("not json".into())).await.unwrap();
        assert_matches!(session.closed().await, CloseReason::DecodeFailed(_));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn oversize_frame_tears_session_down() {
        let policy = SocketPolicy {
            max_message_size: 16,
            ..fast_policy()
        };
        let (session, mut tx, _rx, _int) = pair(policy);
        session.start().unwrap();
        let big = format!(r#"{{"n":1,"pad":"{}"}}"#, "x".repeat(64));
        let len = big.len();
        tx.send(Frame::Text(big)).await.unwrap();
        assert_eq!(session.closed().await, CloseReason::MessageTooLarge(len));
    }

    #[tokio::test]
    async fn peer_close_frame_ends_session() {
        let (session, mut tx, _rx, _int) = pair(fast_policy());
        session.start().unwrap();
        tx.send(Frame::normal_close()).await.unwrap();
        assert_eq!(session.closed().await, CloseReason::PeerClosed);
    }

    #[tokio::test]
    async fn peer_disconnect_ends_session() {
        let (session, tx, rx, _int) = pair(fast_policy());
        session.start().unwrap();
        drop(tx);
        drop(rx);
        assert_eq!(session.closed().await, CloseReason::ConnectionLost);
    }

    #[tokio::test]
    async fn dropped_inbound_consumer_ends_session() {
        let (session, mut tx, _rx, _int) = pair(fast_policy());
        drop(session.take_inbound().unwrap());
        session.start().unwrap();
        tx.send(Frame::Text(r#"{"n":1}"#.into())).await.unwrap();
        assert_eq!(session.closed().await, CloseReason::InboundDropped);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_expires_within_pong_wait() {
        let (session, _tx, _rx, _int) = pair(fast_policy());
        let started = Instant::now();
        session.start().unwrap();

        let reason = tokio::time::timeout(Duration::from_millis(1100), session.closed())
            .await
            .expect("session should expire");
        assert_eq!(reason, CloseReason::LivenessTimeout);
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn pongs_keep_session_alive() {
        let (session, tx, rx, _int) = pair(fast_policy());
        let _seen = ponging_peer(tx, rx);
        session.start().unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(session.state(), SessionState::Active);
        assert!(session.close());
        assert_eq!(session.closed().await, CloseReason::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_pings_are_sent() {
        let (session, tx, mut rx, _int) = pair(fast_policy());
        session.start().unwrap();

        let first = rx.next().await.unwrap().unwrap();
        assert_eq!(first, Frame::Ping(Vec::new()));
        drop(tx);
        let _ = session.close();
    }

    #[tokio::test]
    async fn outbound_half_close_sends_close_frame() {
        let (session, tx, rx, _int) = pair(fast_policy());
        let mut seen = ponging_peer(tx, rx);
        session.start().unwrap();

        let out = session.outbound().unwrap();
        session.close_outbound();
        assert_matches!(session.outbound(), Err(SessionError::OutboundClosed));
        out.send(Msg { n: 1 }).await.unwrap();
        drop(out);

        assert_eq!(seen.recv().await, Some(Frame::Text(r#"{"n":1}"#.into())));
        assert_matches!(seen.recv().await, Some(Frame::Close(_)));
        assert_eq!(session.closed().await, CloseReason::OutboundFinished);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_closes_then_lingers_for_grace() {
        let (session, tx, rx, interrupt) = pair(fast_policy());
        let mut seen = ponging_peer(tx, rx);
        session.start().unwrap();

        let started = Instant::now();
        interrupt.cancel();
        assert_eq!(seen.recv().await, Some(Frame::normal_close()));
        assert_eq!(session.closed().await, CloseReason::Interrupted);
        assert!(started.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn interrupt_ends_early_when_peer_answers_close() {
        let (session, mut tx, mut rx, interrupt) = pair(SocketPolicy {
            interrupt_grace: Duration::from_secs(30),
            ..fast_policy()
        });
        session.start().unwrap();
        interrupt.cancel();

        let frame = rx.next().await.unwrap().unwrap();
        assert_eq!(frame, Frame::normal_close());
        tx.send(Frame::normal_close()).await.unwrap();

        let reason = tokio::time::timeout(Duration::from_secs(5), session.closed())
            .await
            .unwrap();
        assert_eq!(reason, CloseReason::Interrupted);
    }

    #[tokio::test]
    async fn interrupt_with_unwritable_peer_reports_write_failure() {
        let (session, _tx, rx, interrupt) = pair(fast_policy());
        session.start().unwrap();
        drop(rx);
        interrupt.cancel();

        let reason = tokio::time::timeout(Duration::from_secs(5), session.closed())
            .await
            .unwrap();
        assert_matches!(reason, CloseReason::WriteFailed(_));
        assert!(!reason.is_graceful());
        assert_eq!(session.close_reason(), Some(reason));
    }

    /// Outbound payload that may move between threads but not be shared.
    #[derive(Serialize)]
    struct Tally {
        n: u32,
        #[serde(skip)]
        _seen: std::cell::Cell<u8>,
    }

    #[tokio::test]
    async fn outbound_payload_need_not_be_sync() {
        let (local, remote) = transport::duplex(16);
        let session: Session<Msg, Tally> =
            Session::new(local, fast_policy(), CancellationToken::new());
        let (tx, rx) = remote.into_parts();
        let mut seen = ponging_peer(tx, rx);
        session.start().unwrap();

        let out = session.outbound().unwrap();
        out.send(Tally {
            n: 7,
            _seen: std::cell::Cell::new(0),
        })
        .await
        .unwrap();
        assert_eq!(seen.recv().await, Some(Frame::Text(r#"{"n":7}"#.into())));
        let _ = session.close();
    }

    #[tokio::test]
    async fn debug_shows_state() {
        let (session, _tx, _rx, _int) = pair(fast_policy());
        let rendered = format!("{session:?}");
        assert!(rendered.contains("Idle"));
    }
}
