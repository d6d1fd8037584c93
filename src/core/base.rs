//! Default capability for components that do not accept messages.

use crate::core::error::CoreError;
use crate::core::types::{Component, ComponentRef, ComponentReference};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Returns a completion token that has already fired, for components and
/// sub-resources with no independent lifecycle.
pub fn closed_token() -> CancellationToken {
    let token = CancellationToken::new();
    token.cancel();
    token
}

/// An empty component implementing the [`Component`] contract with safe
/// defaults: its reference accepts no requests, and its completion signal is
/// already closed. Useful as the returned instance for components whose only
/// work happens in their factory.
pub struct BaseComponent;

impl<M: Send + 'static> Component<M> for BaseComponent {
    fn new_reference(&self) -> ComponentRef<M> {
        Arc::new(BaseReference)
    }

    fn done(&self) -> CancellationToken {
        closed_token()
    }
}

/// A reference that fails every request with a descriptive error and silently
/// discards fire-and-forget messages.
pub struct BaseReference;

#[async_trait]
impl<M: Send + 'static> ComponentReference<M> for BaseReference {
    async fn request(
        &self,
        _scope: &CancellationToken,
        _message: M,
    ) -> Result<Option<M>, CoreError> {
        Err(CoreError::RequestsNotAccepted)
    }

    async fn request_async(&self, _scope: &CancellationToken, _message: M) {}
}
