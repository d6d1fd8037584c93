//! Process-wide logging component (`comp/logger.Main`).
//!
//! On [`AppMessage::Output`] it records the line through the process's
//! tracing subscriber and responds with no payload.

use crate::comp::AppMessage;
use crate::core::{
    closed_token, Component, ComponentImpl, ComponentPath, ComponentRef, ComponentReference,
    CoreError, Dependencies, Orchestrator,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const PATH: ComponentPath = ComponentPath::new("comp/logger.Main");

/// Descriptor for this package's component.
pub fn descriptor() -> Box<dyn ComponentImpl<AppMessage>> {
    Box::new(LoggerImpl)
}

struct LoggerImpl;

#[async_trait]
impl ComponentImpl<AppMessage> for LoggerImpl {
    fn path(&self) -> ComponentPath {
        PATH
    }

    fn dependencies(&self) -> Vec<ComponentPath> {
        Vec::new()
    }

    async fn start(
        &self,
        _orch: &Orchestrator<AppMessage>,
        _scope: CancellationToken,
        _deps: Dependencies<AppMessage>,
    ) -> Box<dyn Component<AppMessage>> {
        Box::new(Logger)
    }
}

struct Logger;

impl Component<AppMessage> for Logger {
    fn new_reference(&self) -> ComponentRef<AppMessage> {
        Arc::new(LoggerReference)
    }

    fn done(&self) -> CancellationToken {
        closed_token()
    }
}

struct LoggerReference;

#[async_trait]
impl ComponentReference<AppMessage> for LoggerReference {
    async fn request(
        &self,
        _scope: &CancellationToken,
        message: AppMessage,
    ) -> Result<Option<AppMessage>, CoreError> {
        match message {
            AppMessage::Output(line) => {
                info!(component = %PATH, "{line}");
                Ok(None)
            }
            _ => Err(CoreError::UnrecognizedMessage(PATH)),
        }
    }

    async fn request_async(&self, scope: &CancellationToken, message: AppMessage) {
        let _ = self.request(scope, message).await;
    }
}

/// Typed convenience wrapper around the logger reference, for components that
/// declare `comp/logger.Main` as a dependency.
#[derive(Clone)]
pub struct LoggerHandle {
    wrapped: ComponentRef<AppMessage>,
}

impl LoggerHandle {
    /// Pulls the logger reference out of a resolved dependency map.
    pub fn wrap(deps: &Dependencies<AppMessage>) -> Self {
        Self {
            wrapped: deps
                .get(&PATH)
                .cloned()
                .expect("comp/logger.Main must be a declared dependency"),
        }
    }

    /// Records one line, ignoring delivery failures.
    pub async fn output(&self, line: impl Into<String>) {
        let scope = CancellationToken::new();
        let _ = self
            .wrapped
            .request(&scope, AppMessage::Output(line.into()))
            .await;
    }
}
