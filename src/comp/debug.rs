//! HTTP debug-introspection components.
//!
//! `core/comp/debug.Main` manages an [`axum::Router`] of debug pages. Other
//! components mount handlers on it with [`AppMessage::RegisterHandler`]; a
//! caller either retrieves the router with [`AppMessage::HandlerRequest`] and
//! serves it itself, or asks this component to serve with
//! [`AppMessage::Serve`]. The root page renders a table of contents of the
//! registered handlers.
//!
//! `core/comp/debug.Orchestrator` registers the orchestrator introspection
//! pages: the dependency graph and per-component lifecycle state, as plain
//! text at `/orchestrator` and as JSON at `/orchestrator.json`.

use crate::comp::AppMessage;
use crate::core::{
    BaseComponent, Component, ComponentImpl, ComponentPath, ComponentReference, CoreError,
    Dependencies, HandlerComponent, Orchestrator, RequestHandler,
};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower::{service_fn, ServiceExt};
use tracing::{error, info};

pub const MAIN_PATH: ComponentPath = ComponentPath::new("core/comp/debug.Main");
pub const ORCHESTRATOR_PATH: ComponentPath = ComponentPath::new("core/comp/debug.Orchestrator");

/// Descriptor for the debug router component.
pub fn main_descriptor() -> Box<dyn ComponentImpl<AppMessage>> {
    Box::new(DebugMainImpl)
}

/// Descriptor for the orchestrator introspection pages.
pub fn orchestrator_descriptor() -> Box<dyn ComponentImpl<AppMessage>> {
    Box::new(DebugOrchestratorImpl)
}

struct DebugMainImpl;

#[async_trait]
impl ComponentImpl<AppMessage> for DebugMainImpl {
    fn path(&self) -> ComponentPath {
        MAIN_PATH
    }

    fn dependencies(&self) -> Vec<ComponentPath> {
        Vec::new()
    }

    async fn start(
        &self,
        _orch: &Orchestrator<AppMessage>,
        scope: CancellationToken,
        _deps: Dependencies<AppMessage>,
    ) -> Box<dyn Component<AppMessage>> {
        let toc: Toc = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new().route(
            "/",
            get({
                let toc = toc.clone();
                move || render_toc(toc.clone())
            }),
        );
        Box::new(HandlerComponent::new(DebugMain {
            router: Arc::new(Mutex::new(router)),
            toc,
            lifetime: scope,
        }))
    }
}

/// Registered (name, pattern) pairs, shared with the root page handler so the
/// table of contents reflects late registrations.
type Toc = Arc<Mutex<Vec<(String, String)>>>;

/// The current router, shared with any running server so that handlers
/// registered after `Serve` remain routable.
type SharedRouter = Arc<Mutex<Router>>;

struct DebugMain {
    router: SharedRouter,
    toc: Toc,
    lifetime: CancellationToken,
}

#[async_trait]
impl RequestHandler<AppMessage> for DebugMain {
    async fn handle(
        &mut self,
        _scope: &CancellationToken,
        message: AppMessage,
    ) -> Result<Option<AppMessage>, CoreError> {
        match message {
            AppMessage::RegisterHandler {
                name,
                pattern,
                handler,
            } => {
                {
                    let mut router = self.router.lock().await;
                    *router = router.clone().route(&pattern, handler);
                }
                if !name.is_empty() {
                    self.toc.lock().await.push((name, pattern));
                }
                Ok(None)
            }
            AppMessage::HandlerRequest => {
                Ok(Some(AppMessage::Handler(self.router.lock().await.clone())))
            }
            AppMessage::Serve { port } => {
                self.serve(port);
                Ok(None)
            }
            _ => Err(CoreError::UnrecognizedMessage(MAIN_PATH)),
        }
    }
}

impl DebugMain {
    /// Serves in the background, shutting down gracefully when the
    /// component's lifetime ends. Every request is dispatched against the
    /// router as it is at that moment, so later registrations are picked up.
    fn serve(&self, port: u16) {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let router = self.router.clone();
        let shutdown = self.lifetime.clone();
        tokio::spawn(async move {
            let listener = match TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    error!(component = %MAIN_PATH, %addr, error = %e, "debug server failed to bind");
                    return;
                }
            };
            info!(component = %MAIN_PATH, %addr, "debug server started");
            let dispatch = service_fn(move |request: Request<Body>| {
                let router = router.clone();
                async move {
                    let current = router.lock().await.clone();
                    current.oneshot(request).await
                }
            });
            let app = Router::new().fallback_service(dispatch);
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
            {
                error!(component = %MAIN_PATH, error = %e, "debug server failed");
            }
        });
    }
}

async fn render_toc(toc: Toc) -> Html<String> {
    let entries = toc.lock().await;
    let mut page = String::from(
        "<html>\n<head><title>Comps Debug</title></head>\n<body>\n<h1>Comps Debug</h1>\n<ul>\n",
    );
    for (name, pattern) in entries.iter() {
        page.push_str(&format!("  <li><a href=\"{pattern}\">{name}</a></li>\n"));
    }
    page.push_str("</ul>\n</body>\n</html>\n");
    Html(page)
}

struct DebugOrchestratorImpl;

#[async_trait]
impl ComponentImpl<AppMessage> for DebugOrchestratorImpl {
    fn path(&self) -> ComponentPath {
        ORCHESTRATOR_PATH
    }

    fn dependencies(&self) -> Vec<ComponentPath> {
        vec![MAIN_PATH]
    }

    async fn start(
        &self,
        orch: &Orchestrator<AppMessage>,
        scope: CancellationToken,
        deps: Dependencies<AppMessage>,
    ) -> Box<dyn Component<AppMessage>> {
        let main = deps
            .get(&MAIN_PATH)
            .cloned()
            .expect("core/comp/debug.Main must be a declared dependency");

        let text = {
            let orch = orch.clone();
            get(move || {
                let orch = orch.clone();
                async move { render_status(orch).await }
            })
        };
        main.request_async(
            &scope,
            AppMessage::RegisterHandler {
                name: "orchestrator".to_string(),
                pattern: "/orchestrator".to_string(),
                handler: text,
            },
        )
        .await;

        let json = {
            let orch = orch.clone();
            get(move || {
                let orch = orch.clone();
                async move { Json(orch.status().await) }
            })
        };
        main.request_async(
            &scope,
            AppMessage::RegisterHandler {
                name: "orchestrator (json)".to_string(),
                pattern: "/orchestrator.json".to_string(),
                handler: json,
            },
        )
        .await;

        Box::new(BaseComponent)
    }
}

async fn render_status(orch: Orchestrator<AppMessage>) -> String {
    let status = orch.status().await;
    let mut out = String::new();
    for (path, component) in &status {
        out.push_str(&format!("{path}: {}\n", component.state));
        out.push_str("  Depends on:\n");
        for dep in &component.dependencies {
            out.push_str(&format!("    {dep}\n"));
        }
    }
    out
}
