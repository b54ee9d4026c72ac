use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use flip_lead_desk::{
    app::{self, AppState},
    config::{Config, LogFormat},
    infra::{notifier::WebhookNotifier, store::JsonStore},
    util::version::{version_label, APP_NAME},
};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "flip_lead_desk=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("expected to be able to generate config")?;
    init_tracing(config.log_format);

    tracing::info!(app = APP_NAME, version = %version_label(), "initialized config");

    let store = match &config.data_file {
        Some(path) => JsonStore::open(path.clone())
            .with_context(|| format!("could not open record store at {}", path.display()))?,
        None => {
            tracing::warn!("no data directory available, records are kept in memory only");
            JsonStore::in_memory()
        }
    };

    let notifier = WebhookNotifier::with_timeout(
        &config.notification_webhook_url,
        config.notification_timeout,
    )
    .context("could not build notification client")?;
    tracing::info!(endpoint = %notifier.endpoint(), "initialized notification client");

    let state = AppState::new(Arc::new(store), Arc::new(notifier), &config);
    app::serve(state, &config, shutdown_signal()).await
}
