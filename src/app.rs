use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::{
    config::Config,
    domain::{
        ports::{Notifier, RecordStore},
        ApprovalWorkflow, TerminalRecordPolicy,
    },
    routes,
};

/// Shared handles given to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub workflow: ApprovalWorkflow,
    pub policy: TerminalRecordPolicy,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
        config: &Config,
    ) -> Self {
        let workflow = ApprovalWorkflow::new(store.clone(), notifier)
            .with_retry(config.approval_retry)
            .with_policy(config.terminal_record_policy);
        Self {
            store,
            workflow,
            policy: config.terminal_record_policy,
        }
    }
}

pub fn router(state: AppState) -> Router {
    routes::router(state).layer(TraceLayer::new_for_http())
}

/// Binds `config.listen_address()` and serves until `shutdown` resolves.
pub async fn serve<F>(state: AppState, config: &Config, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to address {address}"))?;

    tracing::info!(%address, "flip lead desk is up and running");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("error running axum server")
}
