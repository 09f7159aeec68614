//! The registry actor.
//!
//! All registry mutation happens on one task. Callers hold a cheap
//! [`Messenger`] handle and communicate over four bounded channels, one per
//! operation kind; every request carries a one-shot reply so the caller
//! resumes only after the loop processed it.

use std::collections::HashMap;

use metrics::{counter, gauge};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, trace};

use comms_core::RecipientId;
use comms_core::metrics::{DELIVERIES_TOTAL, RECIPIENTS_REGISTERED};
use comms_settings::MessengerSettings;

use crate::error::{MessengerError, Result};
use crate::instance::Instance;
use crate::mailbox::{self, Handoff, Mailbox};

/// A request to the control loop and the slot for its reply.
struct Request<P, R> {
    payload: P,
    reply: oneshot::Sender<R>,
}

/// One payload addressed to one recipient.
struct Delivery<T> {
    to: RecipientId,
    payload: T,
}

/// Handle to the registry actor. Clones share the same loop.
///
/// The loop stops when its shutdown token is cancelled or every handle is
/// dropped; after that every operation returns [`MessengerError::Stopped`].
pub struct Messenger<T> {
    register_tx: mpsc::Sender<Request<Instance<T>, ()>>,
    unregister_tx: mpsc::Sender<Request<Instance<T>, bool>>,
    unregister_id_tx: mpsc::Sender<Request<RecipientId, bool>>,
    deliver_tx: mpsc::Sender<Request<Delivery<T>, bool>>,
}

impl<T> Clone for Messenger<T> {
    fn clone(&self) -> Self {
        Self {
            register_tx: self.register_tx.clone(),
            unregister_tx: self.unregister_tx.clone(),
            unregister_id_tx: self.unregister_id_tx.clone(),
            deliver_tx: self.deliver_tx.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Messenger<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messenger")
            .field("stopped", &self.deliver_tx.is_closed())
            .finish()
    }
}

impl<T: Send + 'static> Messenger<T> {
    /// Spawn the control loop with the configured channel capacity.
    pub fn spawn(settings: &MessengerSettings, shutdown: CancellationToken) -> (Self, JoinHandle<()>) {
        Self::spawn_with_capacity(settings.command_capacity, shutdown)
    }

    /// Spawn the control loop with `capacity` slots per command channel.
    pub fn spawn_with_capacity(capacity: usize, shutdown: CancellationToken) -> (Self, JoinHandle<()>) {
        let capacity = capacity.max(1);
        let (register_tx, register_rx) = mpsc::channel(capacity);
        let (unregister_tx, unregister_rx) = mpsc::channel(capacity);
        let (unregister_id_tx, unregister_id_rx) = mpsc::channel(capacity);
        let (deliver_tx, deliver_rx) = mpsc::channel(capacity);

        let control = ControlLoop {
            register_rx,
            unregister_rx,
            unregister_id_rx,
            deliver_rx,
            shutdown,
            registry: HashMap::new(),
        };
        let handle = tokio::spawn(control.run().instrument(info_span!("messenger")));

        let messenger = Self {
            register_tx,
            unregister_tx,
            unregister_id_tx,
            deliver_tx,
        };
        (messenger, handle)
    }

    /// Mint a new, unregistered recipient around `endpoint`.
    pub fn create_instance(endpoint: mpsc::Sender<T>) -> Instance<T> {
        Instance::new(endpoint)
    }

    /// Add `instance` to the registry. Returns once the loop has applied it.
    pub async fn register(&self, instance: Instance<T>) -> Result<()> {
        request(&self.register_tx, instance).await
    }

    /// Remove the entry for `instance`. Returns whether one was present.
    pub async fn unregister(&self, instance: &Instance<T>) -> Result<bool> {
        request(&self.unregister_tx, instance.clone()).await
    }

    /// Remove the entry for `id`. Returns whether one was present.
    pub async fn unregister_id(&self, id: &RecipientId) -> Result<bool> {
        request(&self.unregister_id_tx, *id).await
    }

    /// Hand `payload` to the recipient registered as `to`.
    ///
    /// `Ok(true)` means the payload reached the recipient's endpoint queue;
    /// `Ok(false)` means nobody was registered under `to` (or the endpoint
    /// was already closed). Neither implies the recipient consumed it.
    pub async fn send(&self, to: &RecipientId, payload: T) -> Result<bool> {
        request(&self.deliver_tx, Delivery { to: *to, payload }).await
    }

    /// Whether the control loop has stopped.
    pub fn is_stopped(&self) -> bool {
        self.deliver_tx.is_closed()
    }
}

async fn request<P, R>(tx: &mpsc::Sender<Request<P, R>>, payload: P) -> Result<R> {
    let (reply, rx) = oneshot::channel();
    tx.send(Request { payload, reply })
        .await
        .map_err(|_| MessengerError::Stopped)?;
    rx.await.map_err(|_| MessengerError::Stopped)
}

enum Command<T> {
    Register(Request<Instance<T>, ()>),
    Unregister(Request<Instance<T>, bool>),
    UnregisterId(Request<RecipientId, bool>),
    Deliver(Request<Delivery<T>, bool>),
}

struct ControlLoop<T> {
    register_rx: mpsc::Receiver<Request<Instance<T>, ()>>,
    unregister_rx: mpsc::Receiver<Request<Instance<T>, bool>>,
    unregister_id_rx: mpsc::Receiver<Request<RecipientId, bool>>,
    deliver_rx: mpsc::Receiver<Request<Delivery<T>, bool>>,
    shutdown: CancellationToken,
    registry: HashMap<RecipientId, Mailbox<T>>,
}

impl<T: Send + 'static> ControlLoop<T> {
    async fn run(mut self) {
        info!("messenger started");
        loop {
            // Handles carry all four senders, so one closed channel means
            // every handle is gone.
            let command = tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!("messenger shutting down");
                    break;
                }
                req = self.register_rx.recv() => req.map(Command::Register),
                req = self.unregister_rx.recv() => req.map(Command::Unregister),
                req = self.unregister_id_rx.recv() => req.map(Command::UnregisterId),
                req = self.deliver_rx.recv() => req.map(Command::Deliver),
            };
            let Some(command) = command else {
                debug!("every messenger handle dropped");
                break;
            };
            self.handle(command);
        }
        // Dropping the registry closes every mailbox; queued handoffs still
        // complete.
        let remaining = self.registry.len();
        self.registry.clear();
        gauge!(RECIPIENTS_REGISTERED).set(0.0);
        info!(remaining, "messenger stopped");
    }

    fn handle(&mut self, command: Command<T>) {
        match command {
            Command::Register(req) => {
                self.register(req.payload);
                let _ = req.reply.send(());
            }
            Command::Unregister(req) => {
                let removed = self.remove(&req.payload.id());
                let _ = req.reply.send(removed);
            }
            Command::UnregisterId(req) => {
                let removed = self.remove(&req.payload);
                let _ = req.reply.send(removed);
            }
            Command::Deliver(req) => self.deliver(req.payload, req.reply),
        }
    }

    fn register(&mut self, instance: Instance<T>) {
        let id = instance.id();
        let (sender, _task) = mailbox::spawn(id, instance.into_endpoint());
        if self.registry.insert(id, sender).is_some() {
            debug!(recipient = %id, "recipient re-registered, previous mailbox retired");
        } else {
            debug!(recipient = %id, "recipient registered");
        }
        self.update_gauge();
    }

    fn remove(&mut self, id: &RecipientId) -> bool {
        let removed = self.registry.remove(id).is_some();
        if removed {
            debug!(recipient = %id, "recipient unregistered");
            self.update_gauge();
        }
        removed
    }

    fn deliver(&mut self, delivery: Delivery<T>, reply: oneshot::Sender<bool>) {
        let Delivery { to, payload } = delivery;
        let Some(sender) = self.registry.get(&to) else {
            trace!(recipient = %to, "no recipient registered");
            counter!(DELIVERIES_TOTAL, "outcome" => "not_found").increment(1);
            let _ = reply.send(false);
            return;
        };
        if let Err(mpsc::error::SendError(handoff)) = sender.send(Handoff { payload, ack: reply }) {
            // Mailbox task is gone; treat like a closed endpoint.
            let _ = handoff.ack.send(false);
            let _ = self.registry.remove(&to);
            self.update_gauge();
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn update_gauge(&self) {
        gauge!(RECIPIENTS_REGISTERED).set(self.registry.len() as f64);
    }
}
