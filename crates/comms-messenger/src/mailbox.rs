//! Per-recipient FIFO handoff task.

use metrics::counter;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span};

use comms_core::RecipientId;
use comms_core::metrics::DELIVERIES_TOTAL;

/// One payload waiting to be handed to a recipient's endpoint.
pub(crate) struct Handoff<T> {
    pub(crate) payload: T,
    pub(crate) ack: oneshot::Sender<bool>,
}

/// Sending side of a recipient's mailbox. Dropping it lets the task drain
/// what is queued and exit.
pub(crate) type Mailbox<T> = mpsc::UnboundedSender<Handoff<T>>;

/// Spawn the mailbox task for `id`.
///
/// Handoffs run one at a time in arrival order, so a slow endpoint only
/// stalls its own recipient. Each ack reports whether the endpoint accepted
/// the payload.
pub(crate) fn spawn<T: Send + 'static>(
    id: RecipientId,
    endpoint: mpsc::Sender<T>,
) -> (Mailbox<T>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Handoff<T>>();
    let handle = tokio::spawn(
        async move {
            while let Some(Handoff { payload, ack }) = rx.recv().await {
                let delivered = endpoint.send(payload).await.is_ok();
                let outcome = if delivered { "handed_off" } else { "endpoint_closed" };
                counter!(DELIVERIES_TOTAL, "outcome" => outcome).increment(1);
                let _ = ack.send(delivered);
            }
            debug!("mailbox drained");
        }
        .instrument(info_span!("mailbox", recipient = %id)),
    );
    (tx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hands_off_in_order() {
        let (endpoint, mut rx) = mpsc::channel(8);
        let (mailbox, handle) = spawn(RecipientId::new(), endpoint);

        let mut acks = Vec::new();
        for n in 0..3 {
            let (ack, ack_rx) = oneshot::channel();
            mailbox.send(Handoff { payload: n, ack }).unwrap();
            acks.push(ack_rx);
        }
        for ack in acks {
            assert!(ack.await.unwrap());
        }
        assert_eq!(rx.recv().await, Some(0));
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));

        drop(mailbox);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn closed_endpoint_acks_false() {
        let (endpoint, rx) = mpsc::channel::<u8>(1);
        drop(rx);
        let (mailbox, _handle) = spawn(RecipientId::new(), endpoint);
        let (ack, ack_rx) = oneshot::channel();
        mailbox.send(Handoff { payload: 1, ack }).unwrap();
        assert!(!ack_rx.await.unwrap());
    }

    #[tokio::test]
    async fn dropping_mailbox_drains_then_exits() {
        let (endpoint, mut rx) = mpsc::channel(4);
        let (mailbox, handle) = spawn(RecipientId::new(), endpoint);
        let (ack, ack_rx) = oneshot::channel();
        mailbox.send(Handoff { payload: "last", ack }).unwrap();
        drop(mailbox);

        handle.await.unwrap();
        assert!(ack_rx.await.unwrap());
        assert_eq!(rx.recv().await, Some("last"));
    }
}
