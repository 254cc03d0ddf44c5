use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::dashboard::filter::FilterCriteria;
use crate::dashboard::orchestrator::DashboardView;
use axum::{extract::State, response::Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub users: usize,
}

/// Derived view: filtered list, stats and flags
///
/// GET /view
pub async fn view_handler(State(state): State<Arc<AppState>>) -> Json<DashboardView> {
    Json(state.dashboard.view())
}

/// Reload the list from the store
///
/// POST /refresh
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let users = state.dashboard.refresh().await?;

    Ok(Json(RefreshResponse {
        success: true,
        users,
    }))
}

/// Replace the filter criteria and return the recomputed view
///
/// PUT /filter
pub async fn filter_handler(
    State(state): State<Arc<AppState>>,
    Json(criteria): Json<FilterCriteria>,
) -> Json<DashboardView> {
    info!(
        search_term = %criteria.search_term,
        status = ?criteria.status,
        "Filter changed"
    );

    state.dashboard.set_criteria(criteria).await;

    Json(state.dashboard.view())
}
