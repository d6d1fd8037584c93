//! Observability setup.
//!
//! Structured logging via the `tracing` crate: environment-based filtering
//! through `RUST_LOG`, compact output with the module-path target suppressed
//! (log lines carry component paths as structured fields instead).

/// Initializes the tracing subscriber for the whole process. Call once from
/// `main`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
