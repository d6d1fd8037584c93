//! Connection-multiplexing component (`comp/conns.Main`).
//!
//! Accepts [`AppMessage::Connection`] to begin servicing a TCP connection
//! (responding immediately, then handling the stream until EOF) and
//! [`AppMessage::Deliver`] to send a line to one of its connections. The
//! protocol is newline-delimited UTF-8 text, one message per line.
//!
//! This component uses the actor-loop pattern: a single task owns the
//! connection table and multiplexes over its mailbox and an internal
//! connection-event queue. Per-connection read and write tasks never touch
//! that table; they talk to the loop through the event queue and a bounded
//! outgoing-line channel. Write failures are treated as end of stream.
//!
//! Each user is registered with a per-connection deliver capability that
//! writes straight into that connection's outgoing channel, so chat traffic
//! back to a socket never passes through the mailbox and a room broadcast
//! cannot fill it while the loop is busy.

use crate::comp::logger::LoggerHandle;
use crate::comp::{logger, users, AppMessage};
use crate::core::{
    Component, ComponentImpl, ComponentPath, ComponentRef, ComponentReference, CoreError,
    Dependencies, Envelope, Mailbox, MailboxReference, Orchestrator,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const PATH: ComponentPath = ComponentPath::new("comp/conns.Main");

/// Mailbox and per-connection queue capacity.
const QUEUE_CAPACITY: usize = 5;

/// Descriptor for this package's component.
pub fn descriptor() -> Box<dyn ComponentImpl<AppMessage>> {
    Box::new(ConnsImpl)
}

struct ConnsImpl;

#[async_trait]
impl ComponentImpl<AppMessage> for ConnsImpl {
    fn path(&self) -> ComponentPath {
        PATH
    }

    fn dependencies(&self) -> Vec<ComponentPath> {
        vec![logger::PATH, users::PATH]
    }

    async fn start(
        &self,
        _orch: &Orchestrator<AppMessage>,
        scope: CancellationToken,
        deps: Dependencies<AppMessage>,
    ) -> Box<dyn Component<AppMessage>> {
        let (mailbox, reference) = Mailbox::new(PATH, QUEUE_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(QUEUE_CAPACITY);
        let done = CancellationToken::new();

        let state = ConnsState {
            events_tx,
            users: deps
                .get(&users::PATH)
                .cloned()
                .expect("comp/users.Main must be a declared dependency"),
            logger: LoggerHandle::wrap(&deps),
            scope,
            next_cid: 1,
            conns: HashMap::new(),
        };
        tokio::spawn({
            let done = done.clone();
            async move {
                run(mailbox, events_rx, state).await;
                done.cancel();
            }
        });

        Box::new(Conns { reference, done })
    }
}

struct Conns {
    reference: MailboxReference<AppMessage>,
    done: CancellationToken,
}

impl Component<AppMessage> for Conns {
    fn new_reference(&self) -> ComponentRef<AppMessage> {
        Arc::new(self.reference.clone())
    }

    fn done(&self) -> CancellationToken {
        self.done.clone()
    }
}

/// The deliver capability handed to the users component for one connection:
/// `Deliver` lines go straight into that connection's outgoing channel,
/// bypassing the mailbox. A full outgoing channel blocks the caller, not the
/// actor loop.
struct DeliverReference {
    outgoing: mpsc::Sender<String>,
}

#[async_trait]
impl ComponentReference<AppMessage> for DeliverReference {
    async fn request(
        &self,
        scope: &CancellationToken,
        message: AppMessage,
    ) -> Result<Option<AppMessage>, CoreError> {
        match message {
            AppMessage::Deliver { line, .. } => {
                tokio::select! {
                    _ = scope.cancelled() => Err(CoreError::Cancelled),
                    sent = self.outgoing.send(line) => {
                        sent.map_err(|_| CoreError::MailboxClosed(PATH)).map(|()| None)
                    }
                }
            }
            _ => Err(CoreError::UnrecognizedMessage(PATH)),
        }
    }

    async fn request_async(&self, scope: &CancellationToken, message: AppMessage) {
        let _ = self.request(scope, message).await;
    }
}

/// An event from one connection's read task.
enum ConnEvent {
    /// One line arrived (without the newline).
    Line { cid: u64, line: String },
    /// The connection reached end of stream.
    Closed { cid: u64 },
}

struct ConnsState {
    events_tx: mpsc::Sender<ConnEvent>,
    users: ComponentRef<AppMessage>,
    logger: LoggerHandle,
    scope: CancellationToken,
    next_cid: u64,
    /// Outgoing-line channel per active connection.
    conns: HashMap<u64, mpsc::Sender<String>>,
}

async fn run(
    mut mailbox: Mailbox<AppMessage>,
    mut events_rx: mpsc::Receiver<ConnEvent>,
    mut state: ConnsState,
) {
    let scope = state.scope.clone();
    loop {
        tokio::select! {
            _ = scope.cancelled() => return,
            envelope = mailbox.recv() => {
                let Some(envelope) = envelope else { return };
                state.handle_envelope(envelope).await;
            }
            event = events_rx.recv() => {
                let Some(event) = event else { return };
                state.handle_event(event).await;
            }
        }
    }
}

impl ConnsState {
    async fn handle_envelope(&mut self, envelope: Envelope<AppMessage>) {
        let Envelope { message, reply } = envelope;
        match message {
            AppMessage::Connection(socket) => {
                // Respond as soon as the connection is adopted; servicing it
                // continues until EOF.
                reply.send(Ok(None));
                let cid = self.next_cid;
                self.next_cid += 1;
                let (outgoing_tx, outgoing_rx) = mpsc::channel(QUEUE_CAPACITY);
                let deliver: ComponentRef<AppMessage> = Arc::new(DeliverReference {
                    outgoing: outgoing_tx.clone(),
                });
                self.conns.insert(cid, outgoing_tx);
                tokio::spawn(run_connection(
                    socket,
                    cid,
                    self.events_tx.clone(),
                    outgoing_rx,
                ));
                self.users
                    .request_async(&self.scope, AppMessage::NewUser { cid, deliver })
                    .await;
            }
            AppMessage::Deliver { cid, line } => {
                if let Some(outgoing) = self.conns.get(&cid) {
                    let _ = outgoing.send(line).await;
                }
                reply.send(Ok(None));
            }
            _ => reply.send(Err(CoreError::UnrecognizedMessage(PATH))),
        }
    }

    async fn handle_event(&mut self, event: ConnEvent) {
        match event {
            ConnEvent::Line { cid, line } => {
                self.logger
                    .output(format!("got message {line:?} from {cid}"))
                    .await;
                self.users
                    .request_async(&self.scope, AppMessage::UserMessage { cid, line })
                    .await;
            }
            ConnEvent::Closed { cid } => {
                self.logger.output(format!("got close from {cid}")).await;
                self.users
                    .request_async(&self.scope, AppMessage::UserGone { cid })
                    .await;
                self.conns.remove(&cid);
            }
        }
    }
}

/// Services one connection: a writer task drains the outgoing-line channel
/// into the socket, while this task reads lines and forwards them to the
/// actor loop. Any I/O error counts as end of stream.
async fn run_connection(
    socket: TcpStream,
    cid: u64,
    events: mpsc::Sender<ConnEvent>,
    mut outgoing: mpsc::Receiver<String>,
) {
    let (read_half, mut write_half) = socket.into_split();

    tokio::spawn(async move {
        while let Some(line) = outgoing.recv().await {
            if write_half.write_all(line.as_bytes()).await.is_err()
                || write_half.write_all(b"\n").await.is_err()
            {
                return;
            }
        }
    });

    let mut lines = BufReader::new(read_half).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if events.send(ConnEvent::Line { cid, line }).await.is_err() {
            return;
        }
    }
    let _ = events.send(ConnEvent::Closed { cid }).await;
}
