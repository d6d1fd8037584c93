//! TCP listener component (`comp/listen.Main`).
//!
//! On [`AppMessage::Run`] it accepts connections on its fixed bind address
//! and hands each one to `comp/conns.Main`, blocking the requesting task
//! until listening stops. A `request_async(Run)` spawns the loop instead.

use crate::comp::{conns, debug, logger, AppMessage};
use crate::core::{
    closed_token, Component, ComponentImpl, ComponentPath, ComponentRef, ComponentReference,
    CoreError, Dependencies, Orchestrator,
};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub const PATH: ComponentPath = ComponentPath::new("comp/listen.Main");

/// Descriptor for this package's component, listening on `addr` once told to
/// run. The dependency on the debug orchestrator page pulls the debug surface
/// into the graph of any process rooted here.
pub fn descriptor(addr: SocketAddr) -> Box<dyn ComponentImpl<AppMessage>> {
    Box::new(ListenImpl { addr })
}

struct ListenImpl {
    addr: SocketAddr,
}

#[async_trait]
impl ComponentImpl<AppMessage> for ListenImpl {
    fn path(&self) -> ComponentPath {
        PATH
    }

    fn dependencies(&self) -> Vec<ComponentPath> {
        vec![logger::PATH, conns::PATH, debug::ORCHESTRATOR_PATH]
    }

    async fn start(
        &self,
        _orch: &Orchestrator<AppMessage>,
        scope: CancellationToken,
        deps: Dependencies<AppMessage>,
    ) -> Box<dyn Component<AppMessage>> {
        Box::new(Listen {
            reference: ListenReference {
                addr: self.addr,
                logger: deps
                    .get(&logger::PATH)
                    .cloned()
                    .expect("comp/logger.Main must be a declared dependency"),
                conns: deps
                    .get(&conns::PATH)
                    .cloned()
                    .expect("comp/conns.Main must be a declared dependency"),
                lifetime: scope,
            },
        })
    }
}

struct Listen {
    reference: ListenReference,
}

impl Component<AppMessage> for Listen {
    fn new_reference(&self) -> ComponentRef<AppMessage> {
        Arc::new(self.reference.clone())
    }

    fn done(&self) -> CancellationToken {
        closed_token()
    }
}

#[derive(Clone)]
struct ListenReference {
    addr: SocketAddr,
    logger: ComponentRef<AppMessage>,
    conns: ComponentRef<AppMessage>,
    lifetime: CancellationToken,
}

#[async_trait]
impl ComponentReference<AppMessage> for ListenReference {
    async fn request(
        &self,
        scope: &CancellationToken,
        message: AppMessage,
    ) -> Result<Option<AppMessage>, CoreError> {
        match message {
            AppMessage::Run => self.run(scope).await.map(|()| None),
            _ => Err(CoreError::UnrecognizedMessage(PATH)),
        }
    }

    async fn request_async(&self, scope: &CancellationToken, message: AppMessage) {
        let this = self.clone();
        let scope = scope.clone();
        tokio::spawn(async move {
            let _ = this.request(&scope, message).await;
        });
    }
}

impl ListenReference {
    async fn run(&self, scope: &CancellationToken) -> Result<(), CoreError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| CoreError::Component(Box::new(e)))?;
        let _ = self
            .logger
            .request(
                scope,
                AppMessage::Output(format!("listening on {}", self.addr)),
            )
            .await;

        loop {
            tokio::select! {
                _ = scope.cancelled() => return Err(CoreError::Cancelled),
                _ = self.lifetime.cancelled() => return Ok(()),
                accepted = listener.accept() => {
                    let (socket, _) = accepted.map_err(|e| CoreError::Component(Box::new(e)))?;
                    self.conns
                        .request(scope, AppMessage::Connection(socket))
                        .await?;
                }
            }
        }
    }
}
