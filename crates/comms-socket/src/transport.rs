//! Frame-level connection abstraction.
//!
//! A [`Connection`] is a pair of boxed halves speaking [`Frame`]s. Sessions
//! never see the concrete WebSocket type, so the same pumps run over
//! `tokio-tungstenite` streams (dialed or accepted on a raw TCP stream),
//! `axum` upgrades, and the in-memory [`duplex`] pair used by tests.

use std::fmt;
use std::pin::Pin;

use axum::extract::ws as axum_ws;
use futures::channel::mpsc;
use futures::{Sink, SinkExt, Stream, StreamExt, future};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as WsCloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use comms_core::constants::CLOSE_NORMAL;

use crate::error::TransportError;

/// Outbound half of a connection.
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = TransportError> + Send>>;

/// Inbound half of a connection.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;

/// One WebSocket message or control frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 data frame.
    Text(String),
    /// Binary data frame.
    Binary(Vec<u8>),
    /// Ping control frame.
    Ping(Vec<u8>),
    /// Pong control frame.
    Pong(Vec<u8>),
    /// Close control frame, optionally carrying a status.
    Close(Option<CloseFrame>),
}

impl Frame {
    /// Close frame with the normal-closure status.
    pub fn normal_close() -> Self {
        Self::Close(Some(CloseFrame {
            code: CLOSE_NORMAL,
            reason: String::new(),
        }))
    }

    /// Size of the frame's data payload in bytes.
    pub fn payload_len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) | Self::Ping(data) | Self::Pong(data) => data.len(),
            Self::Close(frame) => frame.as_ref().map_or(0, |f| f.reason.len() + 2),
        }
    }
}

/// Status carried by a close frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseFrame {
    /// WebSocket close code.
    pub code: u16,
    /// Human-readable reason.
    pub reason: String,
}

/// An established duplex connection, exclusively owned by one session.
pub struct Connection {
    sink: FrameSink,
    stream: FrameStream,
    peer: String,
}

impl Connection {
    /// Assemble a connection from already-adapted halves.
    pub fn new(sink: FrameSink, stream: FrameStream, peer: impl Into<String>) -> Self {
        Self {
            sink,
            stream,
            peer: peer.into(),
        }
    }

    /// Adapt a `tokio-tungstenite` stream (dialed or accepted).
    pub fn from_tungstenite<S>(ws: WebSocketStream<S>, peer: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, stream) = ws.split();
        let sink = sink
            .with(|frame: Frame| future::ready(Ok::<_, tokio_tungstenite::tungstenite::Error>(to_tungstenite(frame))))
            .sink_map_err(TransportError::from);
        let stream = stream.filter_map(|item| {
            future::ready(match item {
                Ok(msg) => from_tungstenite(msg).map(Ok),
                Err(e) => Some(Err(TransportError::from(e))),
            })
        });
        Self::new(Box::pin(sink), Box::pin(stream), peer)
    }

    /// Adapt an upgraded `axum` WebSocket.
    pub fn from_axum(ws: axum_ws::WebSocket, peer: impl Into<String>) -> Self {
        let (sink, stream) = ws.split();
        let sink = sink
            .with(|frame: Frame| future::ready(Ok::<_, axum::Error>(to_axum(frame))))
            .sink_map_err(TransportError::from);
        let stream = stream.map(|item| item.map(from_axum).map_err(TransportError::from));
        Self::new(Box::pin(sink), Box::pin(stream), peer)
    }

    /// Remote address or label of the peer.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Split into the outbound and inbound halves.
    pub fn into_parts(self) -> (FrameSink, FrameStream) {
        (self.sink, self.stream)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

/// Two in-memory connections wired to each other.
///
/// Frames written to one end are read from the other. Dropping an end's sink
/// ends the other end's stream. No control frames are answered automatically.
pub fn duplex(capacity: usize) -> (Connection, Connection) {
    let (a_tx, b_rx) = mpsc::channel::<Frame>(capacity);
    let (b_tx, a_rx) = mpsc::channel::<Frame>(capacity);
    (
        memory_end(a_tx, a_rx, "memory:a"),
        memory_end(b_tx, b_rx, "memory:b"),
    )
}

fn memory_end(tx: mpsc::Sender<Frame>, rx: mpsc::Receiver<Frame>, peer: &str) -> Connection {
    let sink = tx.sink_map_err(|_| TransportError::Disconnected);
    let stream = rx.map(Ok::<Frame, TransportError>);
    Connection::new(Box::pin(sink), Box::pin(stream), peer)
}

// ── tokio-tungstenite ───────────────────────────────────────────────────────

fn to_tungstenite(frame: Frame) -> WsMessage {
    match frame {
        Frame::Text(text) => WsMessage::Text(text.into()),
        Frame::Binary(data) => WsMessage::Binary(data.into()),
        Frame::Ping(data) => WsMessage::Ping(data.into()),
        Frame::Pong(data) => WsMessage::Pong(data.into()),
        Frame::Close(close) => WsMessage::Close(close.map(|c| WsCloseFrame {
            code: CloseCode::from(c.code),
            reason: c.reason.into(),
        })),
    }
}

fn from_tungstenite(msg: WsMessage) -> Option<Frame> {
    match msg {
        WsMessage::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
        WsMessage::Binary(data) => Some(Frame::Binary(data.to_vec())),
        WsMessage::Ping(data) => Some(Frame::Ping(data.to_vec())),
        WsMessage::Pong(data) => Some(Frame::Pong(data.to_vec())),
        WsMessage::Close(close) => Some(Frame::Close(close.map(|c| CloseFrame {
            code: u16::from(c.code),
            reason: c.reason.as_str().to_owned(),
        }))),
        // Raw frames only surface when writing; never yielded by reads.
        WsMessage::Frame(_) => None,
    }
}

// ── axum ────────────────────────────────────────────────────────────────────

fn to_axum(frame: Frame) -> axum_ws::Message {
    match frame {
        Frame::Text(text) => axum_ws::Message::Text(text.into()),
        Frame::Binary(data) => axum_ws::Message::Binary(data.into()),
        Frame::Ping(data) => axum_ws::Message::Ping(data.into()),
        Frame::Pong(data) => axum_ws::Message::Pong(data.into()),
        Frame::Close(close) => axum_ws::Message::Close(close.map(|c| axum_ws::CloseFrame {
            code: c.code,
            reason: c.reason.into(),
        })),
    }
}

fn from_axum(msg: axum_ws::Message) -> Frame {
    match msg {
        axum_ws::Message::Text(text) => Frame::Text(text.as_str().to_owned()),
        axum_ws::Message::Binary(data) => Frame::Binary(data.to_vec()),
        axum_ws::Message::Ping(data) => Frame::Ping(data.to_vec()),
        axum_ws::Message::Pong(data) => Frame::Pong(data.to_vec()),
        axum_ws::Message::Close(close) => Frame::Close(close.map(|c| CloseFrame {
            code: c.code,
            reason: c.reason.as_str().to_owned(),
        })),
    }
}
