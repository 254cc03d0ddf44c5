// Application state (AppState)

use crate::core::config::Config;
use crate::dashboard::orchestrator::Dashboard;
use std::sync::Arc;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    /// Dashboard orchestrator; clones share one user list
    pub dashboard: Dashboard,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, dashboard: Dashboard) -> Self {
        Self {
            dashboard,
            config: Arc::new(config),
        }
    }
}
