//! Test double for the reference contract.
//!
//! `RecordingReference` stands in for a real component in tests: it records
//! every message it receives and answers every request with `Ok(None)`. Use
//! it wherever a component under test expects a reference to a collaborator,
//! e.g. as the `deliver` capability handed to the users component.

use crate::core::error::CoreError;
use crate::core::types::ComponentReference;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// A reference that accepts everything and remembers what it saw.
pub struct RecordingReference<M> {
    messages: Arc<Mutex<Vec<M>>>,
}

impl<M> Default for RecordingReference<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> RecordingReference<M> {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Takes all messages recorded so far, leaving the reference empty.
    pub fn taken(&self) -> Vec<M> {
        std::mem::take(&mut *self.messages.lock().expect("recording lock poisoned"))
    }

    /// Number of messages recorded so far.
    pub fn len(&self) -> usize {
        self.messages.lock().expect("recording lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, message: M) {
        self.messages
            .lock()
            .expect("recording lock poisoned")
            .push(message);
    }
}

#[async_trait]
impl<M: Send + 'static> ComponentReference<M> for RecordingReference<M> {
    async fn request(
        &self,
        _scope: &CancellationToken,
        message: M,
    ) -> Result<Option<M>, CoreError> {
        self.record(message);
        Ok(None)
    }

    async fn request_async(&self, _scope: &CancellationToken, message: M) {
        self.record(message);
    }
}
