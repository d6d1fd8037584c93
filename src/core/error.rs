//! Core error types.
//!
//! Centralizing the error definitions keeps error handling consistent across
//! the orchestrator, the scaffolding, and every component reference.

use crate::core::types::ComponentPath;

/// Errors surfaced by the orchestration core and the messaging contract.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Resolution failed because no descriptor is registered for the path.
    #[error("no component with path {0}")]
    NoSuchComponent(ComponentPath),

    /// Resolution re-entered a path that is still being constructed.
    #[error("dependency cycle involving {0}")]
    DependencyCycle(ComponentPath),

    /// The orchestrator was constructed with an empty descriptor list.
    #[error("no components were registered")]
    NoRootComponent,

    /// `start` was called on an orchestrator that has already started.
    #[error("orchestrator has already been started")]
    AlreadyStarted,

    /// The request's cancellation scope fired before the request completed.
    #[error("request cancelled")]
    Cancelled,

    /// The shutdown deadline expired while waiting for the named component.
    #[error("shutdown deadline exceeded while stopping {0}")]
    DeadlineExceeded(ComponentPath),

    /// The receiver does not accept requests at all.
    #[error("component does not accept requests")]
    RequestsNotAccepted,

    /// The receiver does not understand this message kind.
    #[error("unrecognized message type for {0}")]
    UnrecognizedMessage(ComponentPath),

    /// The receiver's mailbox has been closed (the component stopped).
    #[error("{0} mailbox closed")]
    MailboxClosed(ComponentPath),

    /// The receiver dropped the reply channel without answering.
    #[error("{0} dropped the reply channel")]
    ReplyDropped(ComponentPath),

    /// A component-level failure (e.g. a bind error from a listener).
    #[error("component error: {0}")]
    Component(Box<dyn std::error::Error + Send + Sync>),
}
