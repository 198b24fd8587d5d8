use std::sync::Arc;

use anyhow::Context;

use stockroom_infra::config::AppConfig;
use stockroom_infra::notifications::{LogNotifier, NotificationWorker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::load().context("loading configuration")?;
    stockroom_observability::init_with(&cfg.logging);

    if cfg.uses_dev_secret() {
        tracing::warn!("no JWT secret configured; using insecure dev default");
    }

    let services = stockroom_api::app::services::build_services(&cfg)
        .await
        .context("initialising store")?;

    let notifications =
        NotificationWorker::spawn(services.bus().clone(), None, Arc::new(LogNotifier))
            .context("starting notification worker")?;

    let app = stockroom_api::app::build_router(services, cfg.auth.jwt_secret.as_bytes());

    let addr = cfg.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("serving http")?;

    notifications.shutdown();
    Ok(())
}
