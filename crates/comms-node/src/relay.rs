//! Per-session relay loop.

use ::metrics::counter;
use tracing::{debug, info, warn};

use comms_messenger::Messenger;
use comms_socket::Session;

use crate::envelope::Envelope;
use crate::metrics::UNDELIVERABLE_TOTAL;

/// Register `session` as a recipient and route its messages until it closes.
///
/// The session's outbound sender doubles as the recipient endpoint, so
/// envelopes routed to this recipient go straight out on the wire.
pub async fn serve_session(session: Session<Envelope, Envelope>, messenger: Messenger<Envelope>) {
    let (Ok(mut inbound), Ok(outbound)) = (session.take_inbound(), session.outbound()) else {
        let _ = session.close();
        return;
    };

    let instance = Messenger::create_instance(outbound.clone());
    let me = instance.id();
    if messenger.register(instance.clone()).await.is_err() {
        warn!(session_id = %session.id(), "messenger stopped, refusing session");
        let _ = session.close();
        return;
    }
    if let Err(e) = session.start() {
        warn!(session_id = %session.id(), error = %e, "session failed to start");
        let _ = messenger.unregister(&instance).await;
        return;
    }
    info!(session_id = %session.id(), recipient = %me, peer = session.peer(), "relay session registered");
    let _ = outbound.send(Envelope::welcome(me)).await;

    while let Some(envelope) = inbound.recv().await {
        let (to, body) = match envelope {
            Envelope::Message { to, body, .. } => (to, body),
            other => {
                debug!(kind = other.kind(), "ignoring envelope from client");
                continue;
            }
        };
        let forwarded = Envelope::Message {
            to,
            from: Some(me),
            body: body.clone(),
            at: chrono::Utc::now(),
        };
        match messenger.send(&to, forwarded).await {
            Ok(true) => {}
            Ok(false) => {
                counter!(UNDELIVERABLE_TOTAL).increment(1);
                debug!(recipient = %to, "no such recipient, bouncing");
                if outbound.send(Envelope::undeliverable(to, body)).await.is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }

    let _ = messenger.unregister(&instance).await;
    drop(outbound);
    let reason = session.closed().await;
    info!(session_id = %session.id(), recipient = %me, %reason, "relay session ended");
}
