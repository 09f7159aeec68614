//! Outbound pump: payloads, heartbeats, and the two close paths.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use comms_core::metrics::{FRAMES_SENT_TOTAL, PINGS_SENT_TOTAL};

use super::write;
use crate::policy::SocketPolicy;
use crate::session::{CloseReason, Lifecycle};
use crate::transport::{Frame, FrameSink};

/// Timing values the outbound pump needs.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Timing {
    pub(crate) write_deadline: Duration,
    pub(crate) ping_period: Duration,
    pub(crate) interrupt_grace: Duration,
}

impl From<&SocketPolicy> for Timing {
    fn from(policy: &SocketPolicy) -> Self {
        Self {
            write_deadline: policy.write_deadline,
            ping_period: policy.ping_period,
            interrupt_grace: policy.interrupt_grace,
        }
    }
}

/// Serialize queued payloads and send heartbeats until a close path or a
/// write failure ends the session.
pub(crate) async fn run<Out>(
    mut sink: FrameSink,
    mut outbound: mpsc::Receiver<Out>,
    lifecycle: Arc<Lifecycle>,
    timing: Timing,
    interrupt: CancellationToken,
) where
    Out: Serialize + Send + 'static,
{
    let mut ticker = time::interval_at(Instant::now() + timing.ping_period, timing.ping_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let reason = loop {
        tokio::select! {
            () = lifecycle.torn_down.cancelled() => return,
            () = interrupt.cancelled() => {
                break on_interrupt(&mut sink, &lifecycle, timing).await;
            }
            () = lifecycle.close_signal.cancelled() => {
                break on_close(&mut sink, &mut outbound, timing.write_deadline).await;
            }
            next = outbound.recv() => match next {
                Some(payload) => {
                    if let Err(reason) = send_payload(&mut sink, payload, timing.write_deadline).await {
                        break reason;
                    }
                }
                None => {
                    if let Err(e) = write(&mut sink, Frame::normal_close(), timing.write_deadline).await {
                        debug!(error = %e, "close frame not delivered");
                    }
                    break CloseReason::OutboundFinished;
                }
            },
            _ = ticker.tick() => {
                if let Err(e) = write(&mut sink, Frame::Ping(Vec::new()), timing.write_deadline).await {
                    break CloseReason::WriteFailed(e);
                }
                counter!(PINGS_SENT_TOTAL).increment(1);
                trace!("ping sent");
            }
        }
    };

    lifecycle.finish(reason);
}

async fn send_payload<Out: Serialize>(
    sink: &mut FrameSink,
    payload: Out,
    deadline: Duration,
) -> Result<(), CloseReason> {
    let text = serde_json::to_string(&payload)
        .map_err(|e| CloseReason::WriteFailed(format!("encode: {e}")))?;
    write(sink, Frame::Text(text), deadline)
        .await
        .map_err(CloseReason::WriteFailed)?;
    counter!(FRAMES_SENT_TOTAL).increment(1);
    Ok(())
}

/// Flush what is already queued, then send a normal-closure frame.
async fn on_close<Out: Serialize>(
    sink: &mut FrameSink,
    outbound: &mut mpsc::Receiver<Out>,
    deadline: Duration,
) -> CloseReason {
    while let Ok(payload) = outbound.try_recv() {
        if let Err(reason) = send_payload(sink, payload, deadline).await {
            return reason;
        }
    }
    if let Err(e) = write(sink, Frame::normal_close(), deadline).await {
        debug!(error = %e, "close frame not delivered");
    }
    CloseReason::Closed
}

/// Send a normal-closure frame, then give the peer up to the grace period to
/// answer before the connection is dropped.
async fn on_interrupt(sink: &mut FrameSink, lifecycle: &Lifecycle, timing: Timing) -> CloseReason {
    lifecycle.record(CloseReason::Interrupted);
    info!("interrupt received, closing session");

    if let Err(e) = write(sink, Frame::normal_close(), timing.write_deadline).await {
        let reason = CloseReason::WriteFailed(e);
        lifecycle.overrule(reason.clone());
        return reason;
    }
    tokio::select! {
        () = time::sleep(timing.interrupt_grace) => {}
        () = lifecycle.torn_down.cancelled() => {}
    }
    CloseReason::Interrupted
}
