//! The `comps` chat server.
//!
//! Wires a fixed descriptor set: a TCP listener rooted at `comp/listen.Main`
//! feeding the connection multiplexer and chat-room components, plus the HTTP
//! debug surface. Runs for a fixed interval, then shuts the graph down with a
//! fixed deadline.

use comps::comp::{self, AppMessage};
use comps::core::{ComponentReference, Orchestrator};
use comps::tracing::setup_tracing;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const CHAT_ADDR: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
    9000,
);
const DEBUG_PORT: u16 = 9001;
const RUN_FOR: Duration = Duration::from_secs(60);
const STOP_DEADLINE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> ExitCode {
    setup_tracing();

    let orch = Orchestrator::new(vec![
        comp::listen::descriptor(CHAT_ADDR),
        comp::logger::descriptor(),
        comp::conns::descriptor(),
        comp::users::descriptor(),
        comp::debug::main_descriptor(),
        comp::debug::orchestrator_descriptor(),
    ]);

    let root = match orch.start().await {
        Ok(root) => root,
        Err(e) => {
            error!(error = %e, "failed to start");
            return ExitCode::FAILURE;
        }
    };

    let scope = CancellationToken::new();
    root.request_async(&scope, AppMessage::Run).await;

    match orch.reference(comp::debug::MAIN_PATH).await {
        Ok(debug) => {
            debug
                .request_async(&scope, AppMessage::Serve { port: DEBUG_PORT })
                .await;
        }
        Err(e) => error!(error = %e, "debug surface unavailable"),
    }

    info!(addr = %CHAT_ADDR, debug_port = DEBUG_PORT, "running");
    tokio::time::sleep(RUN_FOR).await;

    if let Err(e) = orch.stop(STOP_DEADLINE).await {
        error!(error = %e, "shutdown failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
