//! # Sample components
//!
//! The components wired by the `comps` binary: a TCP listener feeding a
//! connection multiplexer, a chat-room manager, a logger, an echo server, and
//! an HTTP debug surface.
//!
//! They all exchange [`AppMessage`], the application's closed message set.
//! Each component documents the variants it accepts and answers anything else
//! with an unrecognized-message error, so the full messaging surface of the
//! process is enumerable by reading this one enum.

pub mod conns;
pub mod debug;
pub mod echo;
pub mod listen;
pub mod logger;
pub mod users;

use crate::core::ComponentRef;
use axum::routing::MethodRouter;
use axum::Router;
use tokio::net::TcpStream;

/// Every message kind exchanged between the sample components.
#[derive(Debug)]
pub enum AppMessage {
    /// Tells `comp/listen.Main` to begin accepting connections. Blocks the
    /// requesting task until listening stops; the terminal error is the
    /// response.
    Run,

    /// Hands a duplex byte stream to a connection-accepting component
    /// (`comp/conns.Main` or `comp/echo.Main`) to service until end of
    /// stream.
    Connection(TcpStream),

    /// Sends one line to the given connection. Accepted by `comp/conns.Main`
    /// and by the per-connection deliver capability it hands out.
    Deliver { cid: u64, line: String },

    /// Tells `comp/users.Main` that a user has connected. `deliver` is the
    /// capability to call to send lines back to that user.
    NewUser {
        cid: u64,
        deliver: ComponentRef<AppMessage>,
    },

    /// Tells `comp/users.Main` that a user has disconnected.
    UserGone { cid: u64 },

    /// Carries one line from a user to `comp/users.Main` (without trailing
    /// newline).
    UserMessage { cid: u64, line: String },

    /// Tells `comp/logger.Main` to record one line.
    Output(String),

    /// Mounts a handler on `core/comp/debug.Main`'s router. `name` appears in
    /// the table of contents; an empty name stays out of it.
    RegisterHandler {
        name: String,
        pattern: String,
        handler: MethodRouter,
    },

    /// Tells `core/comp/debug.Main` to start serving its router on the given
    /// port.
    Serve { port: u16 },

    /// Requests the current debug router; answered with
    /// [`AppMessage::Handler`].
    HandlerRequest,

    /// Response to [`AppMessage::HandlerRequest`].
    Handler(Router),
}
