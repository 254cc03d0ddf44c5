use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::models::user::{CreateUserData, User, UserPatch};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

/// Authoritative list, unfiltered
///
/// GET /users
pub async fn list_users_handler(State(state): State<Arc<AppState>>) -> Json<Vec<User>> {
    Json(state.dashboard.users().await)
}

/// GET /users/{id}
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    state
        .dashboard
        .get_user(&id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

/// Name-prefix search against the store
///
/// GET /users/search?q=<prefix>
pub async fn search_users_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    if params.q.is_empty() {
        return Err(ApiError::InvalidParameter("q must not be empty".to_string()));
    }

    Ok(Json(state.dashboard.search(&params.q).await?))
}

/// POST /users
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    Json(data): Json<CreateUserData>,
) -> Result<Response, ApiError> {
    let user = state.dashboard.create_user(data).await?;

    Ok((StatusCode::CREATED, Json(user)).into_response())
}

/// PATCH /users/{id}
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.dashboard.update_user(&id, patch).await?))
}

/// DELETE /users/{id}
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.dashboard.delete_user(&id).await?;

    Ok(Json(SuccessResponse {
        success: true,
        message: "User deleted successfully".to_string(),
    }))
}
