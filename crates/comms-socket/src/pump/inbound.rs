//! Inbound pump: read, decode, enqueue.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use metrics::counter;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

use comms_core::metrics::{FRAMES_RECEIVED_TOTAL, PONGS_RECEIVED_TOTAL};

use crate::session::{CloseReason, Lifecycle};
use crate::transport::{Frame, FrameStream};

/// Read frames until the connection fails, the peer closes, or the liveness
/// window lapses without a pong.
pub(crate) async fn run<In>(
    mut stream: FrameStream,
    inbound: mpsc::Sender<In>,
    lifecycle: Arc<Lifecycle>,
    pong_wait: Duration,
    max_message_size: usize,
) where
    In: DeserializeOwned + Send + 'static,
{
    let mut deadline = Instant::now() + pong_wait;

    let reason = loop {
        let next = tokio::select! {
            () = lifecycle.torn_down.cancelled() => return,
            next = time::timeout_at(deadline, stream.next()) => next,
        };

        let frame = match next {
            Err(_) => break CloseReason::LivenessTimeout,
            Ok(None) => break CloseReason::ConnectionLost,
            Ok(Some(Err(e))) => break CloseReason::ReadFailed(e.to_string()),
            Ok(Some(Ok(frame))) => frame,
        };

        let payload = match frame {
            Frame::Pong(_) => {
                deadline = Instant::now() + pong_wait;
                counter!(PONGS_RECEIVED_TOTAL).increment(1);
                trace!("pong received");
                continue;
            }
            Frame::Ping(_) => {
                trace!("ping received");
                continue;
            }
            Frame::Close(close) => {
                debug!(code = ?close.map(|c| c.code), "peer sent close frame");
                break CloseReason::PeerClosed;
            }
            Frame::Text(text) => decode::<In>(text.as_bytes(), max_message_size),
            Frame::Binary(data) => decode::<In>(&data, max_message_size),
        };
        let payload = match payload {
            Ok(payload) => payload,
            Err(reason) => break reason,
        };
        counter!(FRAMES_RECEIVED_TOTAL).increment(1);

        tokio::select! {
            () = lifecycle.torn_down.cancelled() => return,
            sent = inbound.send(payload) => {
                if sent.is_err() {
                    break CloseReason::InboundDropped;
                }
            }
        }
    };

    lifecycle.finish(reason);
}

fn decode<In: DeserializeOwned>(bytes: &[u8], limit: usize) -> Result<In, CloseReason> {
    if bytes.len() > limit {
        return Err(CloseReason::MessageTooLarge(bytes.len()));
    }
    serde_json::from_slice(bytes).map_err(|e| CloseReason::DecodeFailed(e.to_string()))
}
