//! Chat-room component (`comp/users.Main`).
//!
//! Accepts [`AppMessage::NewUser`], [`AppMessage::UserGone`], and
//! [`AppMessage::UserMessage`]. Users join rooms with `/join <room>`;
//! anything else they send is broadcast to the rest of their room as
//! `<cid>: <line>`. Lines travel back to users through the `deliver`
//! capability carried by `NewUser`.
//!
//! This component uses the lock-guarded pattern: the whole handler runs under
//! one mutex on the caller's task, so concurrent callers mutate the user
//! table one at a time.

use crate::comp::logger::LoggerHandle;
use crate::comp::{logger, AppMessage};
use crate::core::{
    Component, ComponentImpl, ComponentPath, ComponentRef, ComponentReference, CoreError,
    Dependencies, HandlerComponent, Orchestrator, RequestHandler,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

pub const PATH: ComponentPath = ComponentPath::new("comp/users.Main");

/// Descriptor for this package's component.
pub fn descriptor() -> Box<dyn ComponentImpl<AppMessage>> {
    Box::new(UsersImpl)
}

struct UsersImpl;

#[async_trait]
impl ComponentImpl<AppMessage> for UsersImpl {
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
        Box::new(HandlerComponent::new(Users {
            logger: LoggerHandle::wrap(&deps),
            users: HashMap::new(),
        }))
    }
}

struct User {
    room: Option<String>,
    deliver: ComponentRef<AppMessage>,
}

struct Users {
    logger: LoggerHandle,
    users: HashMap<u64, User>,
}

#[async_trait]
impl RequestHandler<AppMessage> for Users {
    async fn handle(
        &mut self,
        scope: &CancellationToken,
        message: AppMessage,
    ) -> Result<Option<AppMessage>, CoreError> {
        match message {
            AppMessage::NewUser { cid, deliver } => {
                self.users.insert(cid, User {
                    room: None,
                    deliver,
                });
                self.deliver(scope, cid, "welcome!".to_string()).await;
                Ok(None)
            }
            AppMessage::UserGone { cid } => {
                self.users.remove(&cid);
                Ok(None)
            }
            AppMessage::UserMessage { cid, line } => {
                self.user_message(scope, cid, line).await;
                Ok(None)
            }
            _ => Err(CoreError::UnrecognizedMessage(PATH)),
        }
    }
}

impl Users {
    async fn user_message(&mut self, scope: &CancellationToken, cid: u64, line: String) {
        if !self.users.contains_key(&cid) {
            return;
        }
        if let Some(room) = line.strip_prefix("/join ") {
            let room = room.trim().to_string();
            let previous = self
                .users
                .get_mut(&cid)
                .and_then(|user| user.room.replace(room.clone()));
            if let Some(previous) = previous {
                if previous != room {
                    self.send_to_room(scope, None, &previous, &format!("{cid} has left {previous}"))
                        .await;
                }
            }
            self.send_to_room(scope, None, &room, &format!("{cid} has joined {room}"))
                .await;
            self.logger.output(format!("{cid} has joined {room}")).await;
        } else {
            let room = self.users.get(&cid).and_then(|user| user.room.clone());
            match room {
                None => {
                    self.deliver(scope, cid, "join a room first (/join)".to_string())
                        .await
                }
                Some(room) => {
                    self.send_to_room(scope, Some(cid), &room, &format!("{cid}: {line}"))
                        .await
                }
            }
        }
    }

    /// Sends a line to every user in `room`, except `sender` if given.
    async fn send_to_room(
        &self,
        scope: &CancellationToken,
        sender: Option<u64>,
        room: &str,
        line: &str,
    ) {
        for (cid, user) in &self.users {
            if Some(*cid) != sender && user.room.as_deref() == Some(room) {
                user.deliver
                    .request_async(
                        scope,
                        AppMessage::Deliver {
                            cid: *cid,
                            line: line.to_string(),
                        },
                    )
                    .await;
            }
        }
    }

    async fn deliver(&self, scope: &CancellationToken, cid: u64, line: String) {
        if let Some(user) = self.users.get(&cid) {
            user.deliver
                .request_async(scope, AppMessage::Deliver { cid, line })
                .await;
        }
    }
}
