use std::sync::Arc;
use std::time::Duration;

use stockroom_events::InMemoryEventBus;
use stockroom_infra::config::AppConfig;
use stockroom_infra::services::Services;
use stockroom_infra::store::{InMemoryStore, PostgresStore, SharedStore, StoreError};

/// Build the service layer: Postgres when a database URL is configured,
/// otherwise the in-memory store.
pub async fn build_services(cfg: &AppConfig) -> Result<Services, StoreError> {
    let store: SharedStore = match cfg.database_url() {
        Some(url) => {
            let store = PostgresStore::connect(
                url,
                cfg.database.max_connections,
                Duration::from_secs(cfg.database.acquire_timeout_seconds),
            )
            .await?;
            store.migrate().await?;
            tracing::info!("using postgres store");
            Arc::new(store)
        }
        None => {
            tracing::info!("no database configured; using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    Ok(Services::new(
        store,
        Arc::new(InMemoryEventBus::new()),
        cfg.retry_policy(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults_to_in_memory() {
        let cfg = AppConfig::default();
        assert!(build_services(&cfg).await.is_ok());
    }
}
