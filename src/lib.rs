//! # Comps
//!
//! A minimal component-orchestration and actor-messaging substrate.
//!
//! A process is assembled from **components**: independently running units
//! that are registered as descriptors ([`core::ComponentImpl`]), lazily
//! instantiated as a dependency graph by the [`core::Orchestrator`], and shut
//! down in dependents-before-dependencies order. Components never share
//! fields; they communicate only through [`core::ComponentReference`], which
//! offers synchronous request/response and fire-and-forget messaging.
//!
//! ## Architecture Overview
//!
//! The crate separates concerns into two layers:
//!
//! 1. **Core** ([`core`]) — the orchestration and messaging contract, generic
//!    over the application's message enum. It also provides scaffolding for
//!    the two concurrency patterns a component may pick:
//!    - an **actor loop** ([`core::Mailbox`]): one task owns all state and
//!      serializes access by draining bounded mailboxes;
//!    - a **lock-guarded handler** ([`core::HandlerComponent`]): state behind a
//!      mutex, the handler runs inline on the caller's task.
//! 2. **Components** ([`comp`]) — the sample application: a TCP listener, a
//!    connection multiplexer, a chat-room manager, an echo server, a logger,
//!    and an HTTP debug surface, all speaking [`comp::AppMessage`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use comps::comp::{self, AppMessage};
//! use comps::core::{ComponentReference, Orchestrator};
//! use std::net::SocketAddr;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let addr = SocketAddr::from(([127, 0, 0, 1], 9000));
//!     let orch = Orchestrator::new(vec![
//!         comp::listen::descriptor(addr),
//!         comp::logger::descriptor(),
//!         comp::conns::descriptor(),
//!         comp::users::descriptor(),
//!         comp::debug::main_descriptor(),
//!         comp::debug::orchestrator_descriptor(),
//!     ]);
//!     let root = orch.start().await?;
//!     let scope = CancellationToken::new();
//!     root.request_async(&scope, AppMessage::Run).await;
//!     // ... run for a while ...
//!     orch.stop(Duration::from_secs(5)).await?;
//!     Ok(())
//! }
//! ```

pub mod comp;
pub mod core;
pub mod tracing;
