//! # Lock-guarded handler scaffolding
//!
//! For components whose logic is simple enough to run inline on the caller's
//! own task: one mutex wraps the entire handler, so concurrent callers
//! mutate shared maps and sets one at a time. No internal task is spawned,
//! and `request_async` degenerates to `request` with the result discarded.
//!
//! A request abandons the wait for the lock if its scope fires, but a handler
//! that has already started runs to completion: aborting mid-handler would
//! leave the guarded state half-mutated. Handlers receive the scope and
//! should honor it for any blocking work of their own.

use crate::core::base::closed_token;
use crate::core::error::CoreError;
use crate::core::types::{Component, ComponentRef, ComponentReference};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// The message-handling body of a lock-guarded component.
#[async_trait]
pub trait RequestHandler<M>: Send + 'static {
    /// Handles one message with exclusive access to the component's state.
    /// Returns the unrecognized-message error for kinds outside the
    /// component's contract.
    async fn handle(
        &mut self,
        scope: &CancellationToken,
        message: M,
    ) -> Result<Option<M>, CoreError>;
}

/// A running component whose requests are served by a mutex-guarded
/// [`RequestHandler`]. Its completion signal is already closed: all of its
/// work happens on callers' tasks, so there is nothing to wait for at
/// shutdown.
pub struct HandlerComponent<H> {
    handler: Arc<Mutex<H>>,
}

impl<H> HandlerComponent<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(Mutex::new(handler)),
        }
    }
}

impl<M, H> Component<M> for HandlerComponent<H>
where
    M: Send + 'static,
    H: RequestHandler<M>,
{
    fn new_reference(&self) -> ComponentRef<M> {
        Arc::new(HandlerReference {
            handler: self.handler.clone(),
        })
    }

    fn done(&self) -> CancellationToken {
        closed_token()
    }
}

/// Reference to a lock-guarded component. Every `request` takes the lock for
/// the duration of handling.
pub struct HandlerReference<H> {
    handler: Arc<Mutex<H>>,
}

#[async_trait]
impl<M, H> ComponentReference<M> for HandlerReference<H>
where
    M: Send + 'static,
    H: RequestHandler<M>,
{
    async fn request(
        &self,
        scope: &CancellationToken,
        message: M,
    ) -> Result<Option<M>, CoreError> {
        if scope.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        let mut handler = tokio::select! {
            _ = scope.cancelled() => return Err(CoreError::Cancelled),
            guard = self.handler.lock() => guard,
        };
        handler.handle(scope, message).await
    }

    async fn request_async(&self, scope: &CancellationToken, message: M) {
        let _ = self.request(scope, message).await;
    }
}
