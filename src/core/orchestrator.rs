//! # Orchestrator
//!
//! The orchestrator owns the descriptor registry, lazily materializes the
//! dependency subgraph reachable from the root descriptor, and drives ordered
//! shutdown.
//!
//! **Concurrency model**: all bookkeeping (registry, active-instance table)
//! lives behind one async mutex, so resolution cannot race with itself and a
//! status snapshot never observes a half-built graph. Components themselves
//! run outside this lock; only their construction happens under it.
//!
//! **Lifecycle**: single-shot. An orchestrator is started once, stopped once.
//! Stopping walks the active graph dependents-first, cancelling each
//! component's scope and waiting for its completion signal before touching
//! anything that component depends on.

use crate::core::error::CoreError;
use crate::core::types::{
    Component, ComponentImpl, ComponentPath, ComponentRef, ComponentState, ComponentStatus,
    Dependencies,
};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Orchestrates multiple components.
///
/// Cheap to clone: clones share the same registry and active-instance table,
/// so a component factory may store the handle it receives (the debug
/// introspection component does exactly that).
pub struct Orchestrator<M> {
    inner: Arc<Mutex<Inner<M>>>,
}

impl<M> Clone for Orchestrator<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<M> {
    /// All registered component implementations (passed to the constructor).
    registered: HashMap<ComponentPath, Box<dyn ComponentImpl<M>>>,
    /// All active components (those in the dependency graph of the root).
    active: HashMap<ComponentPath, ActiveComponent<M>>,
    /// Path of the root component (the first registered descriptor).
    root_path: Option<ComponentPath>,
    /// Reference to the root component, set once `start` succeeds.
    root: Option<ComponentRef<M>>,
}

struct ActiveComponent<M> {
    component: Box<dyn Component<M>>,
    /// Cancelling this token asks the component to stop.
    stop: CancellationToken,
    state: ComponentState,
}

impl<M: Send + 'static> Orchestrator<M> {
    /// Creates a new orchestrator containing the given component
    /// implementations. The first descriptor is the root: only components it
    /// depends on, directly or indirectly, will ever be instantiated.
    ///
    /// Construction is pure bookkeeping; no component is started here.
    pub fn new(impls: Vec<Box<dyn ComponentImpl<M>>>) -> Self {
        let root_path = impls.first().map(|ci| ci.path());
        let mut registered = HashMap::with_capacity(impls.len());
        for ci in impls {
            registered.insert(ci.path(), ci);
        }
        Self {
            inner: Arc::new(Mutex::new(Inner {
                registered,
                active: HashMap::new(),
                root_path,
                root: None,
            })),
        }
    }

    /// Starts the orchestrator by starting the root component and all of its
    /// transitive dependencies, and returns a reference to the root.
    /// Typically the next step is to send the root a start message such as
    /// `Run`.
    ///
    /// Each dependency is instantiated exactly once, strictly before any
    /// component that depends on it. Resolution fails fast on unknown paths
    /// and on dependency cycles; a failure leaves no entry for the failing
    /// component or anything that was waiting on it.
    #[tracing::instrument(skip_all)]
    pub async fn start(&self) -> Result<ComponentRef<M>, CoreError> {
        let mut inner = self.inner.lock().await;
        if inner.root.is_some() {
            return Err(CoreError::AlreadyStarted);
        }
        let root_path = inner.root_path.ok_or(CoreError::NoRootComponent)?;

        let mut pending = Vec::new();
        let root = self.resolve(&mut inner, &mut pending, root_path).await?;
        inner.root = Some(root.clone());
        info!(root = %root_path, active = inner.active.len(), "orchestrator started");
        Ok(root)
    }

    /// Loads the given component, if it is not already active, and returns a
    /// reference to it. Assumes the registry lock is held by the caller.
    fn resolve<'a>(
        &'a self,
        inner: &'a mut Inner<M>,
        pending: &'a mut Vec<ComponentPath>,
        path: ComponentPath,
    ) -> Pin<Box<dyn Future<Output = Result<ComponentRef<M>, CoreError>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(acomp) = inner.active.get(&path) {
                return Ok(acomp.component.new_reference());
            }
            if pending.contains(&path) {
                return Err(CoreError::DependencyCycle(path));
            }

            let dep_paths = match inner.registered.get(&path) {
                Some(ci) => ci.dependencies(),
                None => return Err(CoreError::NoSuchComponent(path)),
            };

            pending.push(path);
            let mut deps: Dependencies<M> = HashMap::with_capacity(dep_paths.len());
            for dep in dep_paths {
                let reference = self.resolve(&mut *inner, &mut *pending, dep).await?;
                deps.insert(dep, reference);
            }
            pending.pop();

            let scope = CancellationToken::new();
            let component = match inner.registered.get(&path) {
                Some(ci) => ci.start(self, scope.clone(), deps).await,
                None => return Err(CoreError::NoSuchComponent(path)),
            };
            debug!(%path, "component started");

            let reference = component.new_reference();
            inner.active.insert(
                path,
                ActiveComponent {
                    component,
                    stop: scope,
                    state: ComponentState::Running,
                },
            );
            Ok(reference)
        })
    }

    /// Stops a running orchestrator, in an orderly fashion. A component is
    /// stopped only after everything depending on it has stopped. Blocks
    /// until every component has signalled completion or `timeout` expires,
    /// whichever comes first.
    ///
    /// On a deadline breach the method returns
    /// [`CoreError::DeadlineExceeded`]: components processed so far stay
    /// stopped, components not yet reached stay running. Stopping is strictly
    /// sequential, so a component's stop-wait never overlaps a dependency's
    /// cancellation.
    #[tracing::instrument(skip_all)]
    pub async fn stop(&self, timeout: Duration) -> Result<(), CoreError> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().await;
        let root_path = match (inner.root.as_ref(), inner.root_path) {
            (Some(_), Some(path)) => path,
            // Never started: nothing is active.
            _ => return Ok(()),
        };

        let order = shutdown_order(&inner.registered, root_path);
        for path in order {
            let done = {
                let Some(acomp) = inner.active.get_mut(&path) else {
                    continue;
                };
                acomp.state = ComponentState::Stopping;
                acomp.stop.cancel();
                acomp.component.done()
            };
            debug!(%path, "stopping component");
            if timeout_at(deadline, done.cancelled()).await.is_err() {
                warn!(%path, "shutdown deadline exceeded");
                return Err(CoreError::DeadlineExceeded(path));
            }
            if let Some(acomp) = inner.active.get_mut(&path) {
                acomp.state = ComponentState::Stopped;
            }
            info!(%path, "component stopped");
        }
        Ok(())
    }

    /// Returns the status of the orchestrator: for each active component, its
    /// declared dependencies and current lifecycle state. Never mutates
    /// anything.
    pub async fn status(&self) -> HashMap<ComponentPath, ComponentStatus> {
        let inner = self.inner.lock().await;
        let mut status = HashMap::with_capacity(inner.active.len());
        for (path, acomp) in &inner.active {
            let dependencies = inner
                .registered
                .get(path)
                .map(|ci| ci.dependencies())
                .unwrap_or_default();
            status.insert(
                *path,
                ComponentStatus {
                    dependencies,
                    state: acomp.state,
                },
            );
        }
        status
    }

    /// Returns a reference to the root component, if `start` has succeeded.
    pub async fn root(&self) -> Option<ComponentRef<M>> {
        self.inner.lock().await.root.clone()
    }

    /// Returns a fresh reference to an already-active component. Unlike
    /// `start`, this never instantiates anything.
    pub async fn reference(&self, path: ComponentPath) -> Result<ComponentRef<M>, CoreError> {
        let inner = self.inner.lock().await;
        inner
            .active
            .get(&path)
            .map(|acomp| acomp.component.new_reference())
            .ok_or(CoreError::NoSuchComponent(path))
    }
}

/// Computes the shutdown order: one depth-first traversal from the root,
/// visiting dependencies post-order and reversing, which yields a valid
/// dependents-before-dependencies sequence. A dependency shared by several
/// dependents sorts after all of them, regardless of which dependent reaches
/// it first.
fn shutdown_order<M>(
    registered: &HashMap<ComponentPath, Box<dyn ComponentImpl<M>>>,
    root: ComponentPath,
) -> Vec<ComponentPath> {
    fn visit<M>(
        registered: &HashMap<ComponentPath, Box<dyn ComponentImpl<M>>>,
        seen: &mut HashSet<ComponentPath>,
        order: &mut Vec<ComponentPath>,
        path: ComponentPath,
    ) {
        if !seen.insert(path) {
            return;
        }
        if let Some(ci) = registered.get(&path) {
            for dep in ci.dependencies() {
                visit(registered, seen, order, dep);
            }
        }
        order.push(path);
    }

    let mut seen = HashSet::new();
    let mut order = Vec::new();
    visit(registered, &mut seen, &mut order, root);
    order.reverse();
    order
}
