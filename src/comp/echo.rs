//! Echo component (`comp/echo.Main`).
//!
//! Accepts [`AppMessage::Connection`] to begin echoing on the given
//! connection. Responds immediately and echoes until EOF.

use crate::comp::{logger, AppMessage};
use crate::core::{
    closed_token, Component, ComponentImpl, ComponentPath, ComponentRef, ComponentReference,
    CoreError, Dependencies, Orchestrator,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const PATH: ComponentPath = ComponentPath::new("comp/echo.Main");

/// Descriptor for this package's component.
pub fn descriptor() -> Box<dyn ComponentImpl<AppMessage>> {
    Box::new(EchoImpl)
}

struct EchoImpl;

#[async_trait]
impl ComponentImpl<AppMessage> for EchoImpl {
    fn path(&self) -> ComponentPath {
        PATH
    }

    fn dependencies(&self) -> Vec<ComponentPath> {
        vec![logger::PATH]
    }

    async fn start(
        &self,
        _orch: &Orchestrator<AppMessage>,
        _scope: CancellationToken,
        deps: Dependencies<AppMessage>,
    ) -> Box<dyn Component<AppMessage>> {
        Box::new(Echo {
            reference: EchoReference {
                logger: deps
                    .get(&logger::PATH)
                    .cloned()
                    .expect("comp/logger.Main must be a declared dependency"),
            },
        })
    }
}

struct Echo {
    reference: EchoReference,
}

impl Component<AppMessage> for Echo {
    fn new_reference(&self) -> ComponentRef<AppMessage> {
        Arc::new(self.reference.clone())
    }

    fn done(&self) -> CancellationToken {
        closed_token()
    }
}

#[derive(Clone)]
struct EchoReference {
    logger: ComponentRef<AppMessage>,
}

#[async_trait]
impl ComponentReference<AppMessage> for EchoReference {
    async fn request(
        &self,
        scope: &CancellationToken,
        message: AppMessage,
    ) -> Result<Option<AppMessage>, CoreError> {
        match message {
            AppMessage::Connection(socket) => {
                let logger = self.logger.clone();
                let scope = scope.clone();
                tokio::spawn(async move {
                    let peer = socket.peer_addr().ok();
                    let _ = logger
                        .request(&scope, AppMessage::Output(format!("echoing for {peer:?}")))
                        .await;
                    let (mut read_half, mut write_half) = socket.into_split();
                    let _ = tokio::io::copy(&mut read_half, &mut write_half).await;
                    let _ = logger
                        .request(
                            &scope,
                            AppMessage::Output(format!("done echoing for {peer:?}")),
                        )
                        .await;
                });
                Ok(None)
            }
            _ => Err(CoreError::UnrecognizedMessage(PATH)),
        }
    }

    async fn request_async(&self, scope: &CancellationToken, message: AppMessage) {
        let _ = self.request(scope, message).await;
    }
}
