//! # Core orchestration and messaging contract
//!
//! This module defines everything a component must satisfy to be managed by
//! the [`Orchestrator`]:
//!
//! - [`ComponentImpl`] — an immutable descriptor: identity, dependency
//!   identities, and a factory invoked on demand.
//! - [`Component`] — a running instance: hands out references and exposes a
//!   completion signal.
//! - [`ComponentReference`] — the only handle other code ever holds; blocking
//!   request/response plus fire-and-forget.
//!
//! The whole core is generic over the application's message type `M`. An
//! application defines a single closed enum of message kinds, and each
//! component documents (and matches) the subset it accepts, answering
//! everything else with [`CoreError::UnrecognizedMessage`]. This keeps the
//! accepted-message set of every component statically enumerable while the
//! core itself stays component-agnostic.
//!
//! Two pieces of scaffolding cover the concurrency patterns components use to
//! honor the messaging contract without sharing state:
//!
//! - [`Mailbox`] / [`MailboxReference`] for components whose state is owned by
//!   a dedicated actor task;
//! - [`RequestHandler`] / [`HandlerComponent`] for components simple enough to
//!   run inline on the caller's task, one caller at a time.

pub mod base;
pub mod error;
pub mod handler;
pub mod mailbox;
pub mod mock;
pub mod orchestrator;
pub mod types;

pub use base::{closed_token, BaseComponent, BaseReference};
pub use error::CoreError;
pub use handler::{HandlerComponent, HandlerReference, RequestHandler};
pub use mailbox::{Envelope, Mailbox, MailboxReference, ReplySlot};
pub use mock::RecordingReference;
pub use orchestrator::Orchestrator;
pub use types::{
    Component, ComponentImpl, ComponentPath, ComponentRef, ComponentReference, ComponentState,
    ComponentStatus, Dependencies,
};
