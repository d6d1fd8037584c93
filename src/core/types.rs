//! Core contract types.
//!
//! # Architecture Note
//! These traits are the seam between the orchestrator and every component.
//! The orchestrator only ever sees trait objects: a `Box<dyn ComponentImpl>`
//! before a component exists, a `Box<dyn Component>` once it runs, and
//! `Arc<dyn ComponentReference>` handles for everyone else. How a component
//! processes requests internally (actor loop, lock-guarded handler, direct
//! implementation) is invisible through this seam.

use crate::core::error::CoreError;
use crate::core::orchestrator::Orchestrator;
use async_trait::async_trait;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Identifies a component.
///
/// Format is `<package path>.Component`, e.g. `comp/logger.Main`. Equality is
/// exact string equality; a path never changes once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentPath(&'static str);

impl ComponentPath {
    pub const fn new(path: &'static str) -> Self {
        Self(path)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ComponentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for ComponentPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

/// A shared handle to a running component's reference.
pub type ComponentRef<M> = Arc<dyn ComponentReference<M>>;

/// The resolved dependencies handed to a factory: one entry per path named by
/// [`ComponentImpl::dependencies`].
pub type Dependencies<M> = HashMap<ComponentPath, ComponentRef<M>>;

/// A component implementation: an immutable descriptor defining how to start
/// a component on demand.
#[async_trait]
pub trait ComponentImpl<M>: Send + Sync {
    /// The component path for this implementation. This value never changes.
    fn path(&self) -> ComponentPath;

    /// The component paths on which this component relies, in declared order.
    /// This value never changes.
    fn dependencies(&self) -> Vec<ComponentPath>;

    /// Starts an instance of the component. Called on demand, when the
    /// component is first needed. `deps` contains an entry for every path
    /// returned by [`ComponentImpl::dependencies`]; `scope` is cancelled when
    /// the orchestrator stops this component.
    ///
    /// The orchestrator's registry lock is held while factories run, so a
    /// factory may message its dependencies and store the `orch` handle for
    /// later, but must not call [`Orchestrator::status`] or
    /// [`Orchestrator::stop`] before returning.
    async fn start(
        &self,
        orch: &Orchestrator<M>,
        scope: CancellationToken,
        deps: Dependencies<M>,
    ) -> Box<dyn Component<M>>;
}

/// A running instance of a component implementation.
pub trait Component<M>: Send + Sync {
    /// Returns a reference others can use to message this component.
    fn new_reference(&self) -> ComponentRef<M>;

    /// Returns a token that is cancelled once the component has fully
    /// stopped. Components with no independent lifecycle return an
    /// already-cancelled token (see [`crate::core::closed_token`]).
    fn done(&self) -> CancellationToken;
}

/// A reference to another component, used to communicate with it. The set of
/// message kinds a component accepts is part of that component's contract.
#[async_trait]
pub trait ComponentReference<M>: Send + Sync {
    /// Sends a message and waits for the response message. May block the
    /// caller while the receiver processes, but returns
    /// [`CoreError::Cancelled`] if `scope` fires first. `Ok(None)` means the
    /// request was accepted and there is no payload to return.
    async fn request(&self, scope: &CancellationToken, message: M)
        -> Result<Option<M>, CoreError>;

    /// Sends a message without waiting for a response. May block the caller
    /// until the message is enqueued, but not until it is fully handled.
    async fn request_async(&self, scope: &CancellationToken, message: M);
}

impl<M> fmt::Debug for dyn ComponentReference<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ComponentReference")
    }
}

/// Lifecycle state of an active component. Transitions are one-directional:
/// `Running` → `Stopping` → `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentState::Running => f.write_str("running"),
            ComponentState::Stopping => f.write_str("stopping"),
            ComponentState::Stopped => f.write_str("stopped"),
        }
    }
}

/// Introspection snapshot for one active component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentStatus {
    /// Declared dependencies, in declared order.
    pub dependencies: Vec<ComponentPath>,
    /// Current lifecycle state.
    pub state: ComponentState,
}
