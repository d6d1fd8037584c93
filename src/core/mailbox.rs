//! # Actor-loop scaffolding
//!
//! Components whose state is touched by many producers (new connections,
//! completion notices, peer messages) run a dedicated task that owns all of
//! that state and multiplexes over one or more bounded queues, handling one
//! event per cycle. External callers never see the state; they only place
//! [`Envelope`]s on the mailbox through a [`MailboxReference`] and, for
//! `request`, wait on a oneshot reply.
//!
//! **Ordering**: per-mailbox FIFO. If the owning task also drains other event
//! queues there is no cross-queue total order.
//!
//! **Backpressure**: the mailbox is a small bounded channel. When it is full,
//! enqueueing blocks the caller until a slot frees, which is the admission
//! control for the whole component.

use crate::core::error::CoreError;
use crate::core::types::{ComponentPath, ComponentReference};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// A message delivered into an actor loop, paired with the slot for the reply
/// (empty for fire-and-forget deliveries).
pub struct Envelope<M> {
    pub message: M,
    pub reply: ReplySlot<M>,
}

/// The reply side of one request. Dropping an unfilled slot surfaces as
/// [`CoreError::ReplyDropped`] at the caller, so an actor loop that forgets
/// to answer fails loudly rather than hanging its callers.
pub struct ReplySlot<M>(Option<oneshot::Sender<Result<Option<M>, CoreError>>>);

impl<M> ReplySlot<M> {
    /// Sends the reply. A no-op for fire-and-forget envelopes and for callers
    /// that stopped waiting.
    pub fn send(self, result: Result<Option<M>, CoreError>) {
        if let Some(reply) = self.0 {
            let _ = reply.send(result);
        }
    }
}

/// The receiving half of a component mailbox, owned by the actor task.
pub struct Mailbox<M> {
    receiver: mpsc::Receiver<Envelope<M>>,
}

impl<M: Send + 'static> Mailbox<M> {
    /// Creates a bounded mailbox and the reference used to fill it.
    ///
    /// `capacity` should be on the order of the expected number of concurrent
    /// producers; once full, senders block until the loop catches up.
    pub fn new(path: ComponentPath, capacity: usize) -> (Self, MailboxReference<M>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { receiver }, MailboxReference { path, sender })
    }

    /// Receives the next envelope, suspending the actor task until one is
    /// available. Returns `None` once every reference has been dropped.
    pub async fn recv(&mut self) -> Option<Envelope<M>> {
        self.receiver.recv().await
    }
}

/// A reference delivering messages into a [`Mailbox`]. Cheap to clone; clones
/// feed the same mailbox.
pub struct MailboxReference<M> {
    path: ComponentPath,
    sender: mpsc::Sender<Envelope<M>>,
}

impl<M> Clone for MailboxReference<M> {
    fn clone(&self) -> Self {
        Self {
            path: self.path,
            sender: self.sender.clone(),
        }
    }
}

#[async_trait]
impl<M: Send + 'static> ComponentReference<M> for MailboxReference<M> {
    async fn request(
        &self,
        scope: &CancellationToken,
        message: M,
    ) -> Result<Option<M>, CoreError> {
        if scope.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        let (tx, rx) = oneshot::channel();
        let envelope = Envelope {
            message,
            reply: ReplySlot(Some(tx)),
        };
        tokio::select! {
            _ = scope.cancelled() => return Err(CoreError::Cancelled),
            sent = self.sender.send(envelope) => {
                sent.map_err(|_| CoreError::MailboxClosed(self.path))?;
            }
        }
        tokio::select! {
            _ = scope.cancelled() => Err(CoreError::Cancelled),
            reply = rx => reply.map_err(|_| CoreError::ReplyDropped(self.path))?,
        }
    }

    async fn request_async(&self, scope: &CancellationToken, message: M) {
        if scope.is_cancelled() {
            return;
        }
        let envelope = Envelope {
            message,
            reply: ReplySlot(None),
        };
        tokio::select! {
            _ = scope.cancelled() => {}
            _ = self.sender.send(envelope) => {}
        }
    }
}
