//! Lifecycle tests for the orchestrator: lazy resolution order, single
//! instantiation of shared dependencies, ordered shutdown, and the failure
//! modes of `start` and `stop`.

use async_trait::async_trait;
use comps::core::{
    BaseComponent, BaseReference, Component, ComponentImpl, ComponentPath, ComponentRef,
    ComponentReference, ComponentState, CoreError, Dependencies, Envelope, Mailbox,
    MailboxReference, Orchestrator,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const A: ComponentPath = ComponentPath::new("test/a.Main");
const B: ComponentPath = ComponentPath::new("test/b.Main");
const C: ComponentPath = ComponentPath::new("test/c.Main");
const X: ComponentPath = ComponentPath::new("test/x.Main");
const Y: ComponentPath = ComponentPath::new("test/y.Main");
const STUCK: ComponentPath = ComponentPath::new("test/stuck.Main");

type EventLog = Arc<Mutex<Vec<String>>>;

fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// A component that logs its start, then waits for its scope, logs its stop,
/// and signals completion.
struct ProbeImpl {
    path: ComponentPath,
    deps: Vec<ComponentPath>,
    log: EventLog,
}

fn probe(
    log: &EventLog,
    path: ComponentPath,
    deps: &[ComponentPath],
) -> Box<dyn ComponentImpl<()>> {
    Box::new(ProbeImpl {
        path,
        deps: deps.to_vec(),
        log: log.clone(),
    })
}

#[async_trait]
impl ComponentImpl<()> for ProbeImpl {
    fn path(&self) -> ComponentPath {
        self.path
    }

    fn dependencies(&self) -> Vec<ComponentPath> {
        self.deps.clone()
    }

    async fn start(
        &self,
        _orch: &Orchestrator<()>,
        scope: CancellationToken,
        _deps: Dependencies<()>,
    ) -> Box<dyn Component<()>> {
        self.log.lock().unwrap().push(format!("start {}", self.path));
        let done = CancellationToken::new();
        tokio::spawn({
            let log = self.log.clone();
            let path = self.path;
            let done = done.clone();
            async move {
                scope.cancelled().await;
                log.lock().unwrap().push(format!("stop {path}"));
                done.cancel();
            }
        });
        Box::new(Probe { done })
    }
}

struct Probe {
    done: CancellationToken,
}

impl Component<()> for Probe {
    fn new_reference(&self) -> ComponentRef<()> {
        Arc::new(BaseReference)
    }

    fn done(&self) -> CancellationToken {
        self.done.clone()
    }
}

#[tokio::test]
async fn starts_dependencies_before_dependents() {
    let log = EventLog::default();
    let orch = Orchestrator::new(vec![
        probe(&log, C, &[B]),
        probe(&log, B, &[A]),
        probe(&log, A, &[]),
    ]);
    orch.start().await.unwrap();
    assert_eq!(
        events(&log),
        ["start test/a.Main", "start test/b.Main", "start test/c.Main"]
    );
}

#[tokio::test]
async fn shared_dependency_starts_once() {
    let log = EventLog::default();
    let orch = Orchestrator::new(vec![
        probe(&log, C, &[X, Y]),
        probe(&log, X, &[A]),
        probe(&log, Y, &[A]),
        probe(&log, A, &[]),
    ]);
    orch.start().await.unwrap();
    assert_eq!(
        events(&log),
        [
            "start test/a.Main",
            "start test/x.Main",
            "start test/y.Main",
            "start test/c.Main"
        ]
    );
}

#[tokio::test]
async fn stops_dependents_before_dependencies() {
    let log = EventLog::default();
    let orch = Orchestrator::new(vec![
        probe(&log, C, &[B]),
        probe(&log, B, &[A]),
        probe(&log, A, &[]),
    ]);
    orch.start().await.unwrap();
    orch.stop(Duration::from_secs(1)).await.unwrap();
    assert_eq!(
        events(&log)[3..],
        ["stop test/c.Main", "stop test/b.Main", "stop test/a.Main"]
    );
    let status = orch.status().await;
    assert!(status
        .values()
        .all(|component| component.state == ComponentState::Stopped));
}

#[tokio::test]
async fn shared_dependency_stops_after_all_dependents() {
    let log = EventLog::default();
    let orch = Orchestrator::new(vec![
        probe(&log, C, &[X, Y]),
        probe(&log, X, &[A]),
        probe(&log, Y, &[A]),
        probe(&log, A, &[]),
    ]);
    orch.start().await.unwrap();
    orch.stop(Duration::from_secs(1)).await.unwrap();

    let stops: Vec<String> = events(&log)
        .into_iter()
        .filter(|event| event.starts_with("stop "))
        .collect();
    assert_eq!(stops.len(), 4);
    assert_eq!(stops[0], "stop test/c.Main");
    assert_eq!(stops[3], "stop test/a.Main");
}

#[tokio::test]
async fn start_fails_on_unknown_dependency() {
    let log = EventLog::default();
    let orch = Orchestrator::new(vec![probe(&log, C, &[B])]);
    let err = orch.start().await.unwrap_err();
    assert!(matches!(err, CoreError::NoSuchComponent(path) if path == B));
    // Nothing was instantiated, not even the root.
    assert!(events(&log).is_empty());
    assert!(orch.status().await.is_empty());
}

#[tokio::test]
async fn start_fails_on_empty_registry() {
    let orch = Orchestrator::<()>::new(Vec::new());
    let err = orch.start().await.unwrap_err();
    assert!(matches!(err, CoreError::NoRootComponent));
}

#[tokio::test]
async fn start_fails_on_dependency_cycle() {
    let log = EventLog::default();
    let orch = Orchestrator::new(vec![probe(&log, A, &[B]), probe(&log, B, &[A])]);
    let err = orch.start().await.unwrap_err();
    assert!(matches!(err, CoreError::DependencyCycle(path) if path == A));
    assert!(events(&log).is_empty());
}

#[tokio::test]
async fn second_start_fails() {
    let log = EventLog::default();
    let orch = Orchestrator::new(vec![probe(&log, A, &[])]);
    orch.start().await.unwrap();
    let err = orch.start().await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyStarted));
    // The first graph is untouched.
    assert_eq!(events(&log), ["start test/a.Main"]);
}

#[tokio::test]
async fn stop_before_start_is_a_noop() {
    let log = EventLog::default();
    let orch = Orchestrator::new(vec![probe(&log, A, &[])]);
    orch.stop(Duration::from_secs(1)).await.unwrap();
    assert!(events(&log).is_empty());
}

#[tokio::test]
async fn root_reference_appears_after_start() {
    let log = EventLog::default();
    let orch = Orchestrator::new(vec![probe(&log, A, &[])]);
    assert!(orch.root().await.is_none());
    orch.start().await.unwrap();
    assert!(orch.root().await.is_some());
    assert!(orch.reference(A).await.is_ok());
    let err = orch.reference(B).await.unwrap_err();
    assert!(matches!(err, CoreError::NoSuchComponent(path) if path == B));
}

#[tokio::test]
async fn status_reports_declared_dependencies() {
    let log = EventLog::default();
    let orch = Orchestrator::new(vec![
        probe(&log, C, &[B]),
        probe(&log, B, &[A]),
        probe(&log, A, &[]),
    ]);
    orch.start().await.unwrap();
    let status = orch.status().await;
    assert_eq!(status[&C].dependencies, [B]);
    assert_eq!(status[&B].dependencies, [A]);
    assert!(status[&A].dependencies.is_empty());
    assert!(status
        .values()
        .all(|component| component.state == ComponentState::Running));
}

/// A component whose completion signal never fires.
struct StuckImpl;

#[async_trait]
impl ComponentImpl<()> for StuckImpl {
    fn path(&self) -> ComponentPath {
        STUCK
    }

    fn dependencies(&self) -> Vec<ComponentPath> {
        vec![A]
    }

    async fn start(
        &self,
        _orch: &Orchestrator<()>,
        _scope: CancellationToken,
        _deps: Dependencies<()>,
    ) -> Box<dyn Component<()>> {
        Box::new(Stuck)
    }
}

struct Stuck;

impl Component<()> for Stuck {
    fn new_reference(&self) -> ComponentRef<()> {
        Arc::new(BaseReference)
    }

    fn done(&self) -> CancellationToken {
        CancellationToken::new()
    }
}

#[tokio::test]
async fn stop_reports_deadline_breach_and_leaves_the_rest_running() {
    let log = EventLog::default();
    let orch = Orchestrator::new(vec![Box::new(StuckImpl) as Box<dyn ComponentImpl<()>>, probe(&log, A, &[])]);
    orch.start().await.unwrap();

    let err = orch.stop(Duration::from_millis(50)).await.unwrap_err();
    assert!(matches!(err, CoreError::DeadlineExceeded(path) if path == STUCK));

    let status = orch.status().await;
    assert_eq!(status[&STUCK].state, ComponentState::Stopping);
    assert_eq!(status[&A].state, ComponentState::Running);
}

// Shared-state check: two dependents increment one counter during their
// factories; if the counter were instantiated twice, each would see its own.

const COUNTER: ComponentPath = ComponentPath::new("test/counter.Main");
const FRONT_A: ComponentPath = ComponentPath::new("test/front_a.Main");
const FRONT_B: ComponentPath = ComponentPath::new("test/front_b.Main");
const TOP: ComponentPath = ComponentPath::new("test/top.Main");

enum CounterMsg {
    Incr,
    Get,
    Count(u64),
}

struct CounterImpl;

#[async_trait]
impl ComponentImpl<CounterMsg> for CounterImpl {
    fn path(&self) -> ComponentPath {
        COUNTER
    }

    fn dependencies(&self) -> Vec<ComponentPath> {
        Vec::new()
    }

    async fn start(
        &self,
        _orch: &Orchestrator<CounterMsg>,
        scope: CancellationToken,
        _deps: Dependencies<CounterMsg>,
    ) -> Box<dyn Component<CounterMsg>> {
        let (mut mailbox, reference) = Mailbox::new(COUNTER, 5);
        let done = CancellationToken::new();
        tokio::spawn({
            let done = done.clone();
            async move {
                let mut count: u64 = 0;
                loop {
                    tokio::select! {
                        _ = scope.cancelled() => break,
                        envelope = mailbox.recv() => {
                            let Some(Envelope { message, reply }) = envelope else { break };
                            match message {
                                CounterMsg::Incr => {
                                    count += 1;
                                    reply.send(Ok(None));
                                }
                                CounterMsg::Get => reply.send(Ok(Some(CounterMsg::Count(count)))),
                                CounterMsg::Count(_) => {
                                    reply.send(Err(CoreError::UnrecognizedMessage(COUNTER)))
                                }
                            }
                        }
                    }
                }
                done.cancel();
            }
        });
        Box::new(Counter { reference, done })
    }
}

struct Counter {
    reference: MailboxReference<CounterMsg>,
    done: CancellationToken,
}

impl Component<CounterMsg> for Counter {
    fn new_reference(&self) -> ComponentRef<CounterMsg> {
        Arc::new(self.reference.clone())
    }

    fn done(&self) -> CancellationToken {
        self.done.clone()
    }
}

/// Sends one `Incr` to its counter dependency while starting.
struct IncrementerImpl {
    path: ComponentPath,
}

#[async_trait]
impl ComponentImpl<CounterMsg> for IncrementerImpl {
    fn path(&self) -> ComponentPath {
        self.path
    }

    fn dependencies(&self) -> Vec<ComponentPath> {
        vec![COUNTER]
    }

    async fn start(
        &self,
        _orch: &Orchestrator<CounterMsg>,
        _scope: CancellationToken,
        deps: Dependencies<CounterMsg>,
    ) -> Box<dyn Component<CounterMsg>> {
        let counter = deps.get(&COUNTER).cloned().unwrap();
        counter
            .request(&CancellationToken::new(), CounterMsg::Incr)
            .await
            .unwrap();
        Box::new(BaseComponent)
    }
}

struct TopImpl;

#[async_trait]
impl ComponentImpl<CounterMsg> for TopImpl {
    fn path(&self) -> ComponentPath {
        TOP
    }

    fn dependencies(&self) -> Vec<ComponentPath> {
        vec![FRONT_A, FRONT_B]
    }

    async fn start(
        &self,
        _orch: &Orchestrator<CounterMsg>,
        _scope: CancellationToken,
        _deps: Dependencies<CounterMsg>,
    ) -> Box<dyn Component<CounterMsg>> {
        Box::new(BaseComponent)
    }
}

#[tokio::test]
async fn dependents_observe_one_shared_instance() {
    let orch = Orchestrator::new(vec![
        Box::new(TopImpl) as Box<dyn ComponentImpl<CounterMsg>>,
        Box::new(IncrementerImpl { path: FRONT_A }),
        Box::new(IncrementerImpl { path: FRONT_B }),
        Box::new(CounterImpl),
    ]);
    orch.start().await.unwrap();

    let counter = orch.reference(COUNTER).await.unwrap();
    let reply = counter
        .request(&CancellationToken::new(), CounterMsg::Get)
        .await
        .unwrap();
    let Some(CounterMsg::Count(count)) = reply else {
        panic!("expected a count reply");
    };
    assert_eq!(count, 2);
}
