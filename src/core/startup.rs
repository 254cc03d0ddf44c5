use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::api::client::HttpStore;
use crate::api::store::RemoteStore;
use crate::core::config::{Config, StoreBackend};
use crate::dashboard::orchestrator::Dashboard;
use crate::repository::user_repository::UserRepository;
use crate::stores::memory_store::MemoryStore;

/// Build the store client selected in the configuration
pub fn build_store(config: &Config) -> Result<Arc<dyn RemoteStore>> {
    match config.store.backend {
        StoreBackend::Http => {
            let store = HttpStore::new(config.store.endpoint.clone(), config.store.api_key.clone())
                .context("Failed to create store client")?;
            info!(endpoint = %config.store.endpoint, "Using HTTP document store");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            info!("Using in-memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Wire store, repository and dashboard together
pub fn build_dashboard(config: &Config) -> Result<Dashboard> {
    let store = build_store(config)?;
    let repository = UserRepository::new(store, config.store.collection.clone())
        .with_search_limit(config.dashboard.search_limit);

    Ok(Dashboard::new(repository, config.dashboard.settings()))
}

/// First load of the user list. A failure is logged and the dashboard
/// stays in its loading state until a later refresh succeeds.
pub async fn initial_load(dashboard: &Dashboard) {
    match dashboard.refresh().await {
        Ok(count) => info!(users = count, "Initial user list loaded"),
        Err(e) => error!(
            error = %e,
            "Failed to load users from the store, continuing with an empty dashboard"
        ),
    }
}

/// Spawn a background task that periodically reloads the user list
pub fn spawn_auto_refresh(dashboard: Dashboard, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        // The first tick completes immediately; the initial load already ran
        interval.tick().await;

        loop {
            interval.tick().await;

            debug!("Running periodic refresh");
            if let Err(e) = dashboard.refresh().await {
                debug!(error = %e, "Periodic refresh failed");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_memory_dashboard() {
        let config = Config::parse(
            r#"
[server]
port = 8080

[store]
backend = "memory"

[logging]
"#,
        )
        .unwrap();

        assert!(build_dashboard(&config).is_ok());
    }

    #[tokio::test]
    async fn test_initial_load_marks_ready() {
        let config = Config::parse(
            r#"
[server]
port = 8080

[store]
backend = "memory"

[logging]
"#,
        )
        .unwrap();

        let dashboard = build_dashboard(&config).unwrap();
        initial_load(&dashboard).await;

        assert_eq!(
            dashboard.load_state().await,
            crate::dashboard::orchestrator::LoadState::Ready
        );
    }
}
