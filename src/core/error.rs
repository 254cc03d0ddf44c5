// Centralized error handling for the dashboard

use crate::api::store::StoreError;
use crate::validation::user_input::ValidationErrors;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Failures of the user repository, one kind per direction of traffic
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(#[source] StoreError),

    #[error("Remote write failed: {0}")]
    RemoteWriteFailed(#[source] StoreError),
}

/// Errors returned by dashboard operations.
///
/// By the time a caller sees one of these it has already been logged and,
/// for remote failures, announced as a notification.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Validation failed: {0}")]
    ValidationFailed(ValidationErrors),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl DashboardError {
    pub fn is_validation(&self) -> bool {
        matches!(self, DashboardError::ValidationFailed(_))
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

/// Errors surfaced by the HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error(transparent)]
    Dashboard(#[from] DashboardError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, fields) = match &self {
            ApiError::NotFound(_) | ApiError::UnknownEndpoint(_) => (StatusCode::NOT_FOUND, None),
            ApiError::InvalidParameter(_) => (StatusCode::BAD_REQUEST, None),
            ApiError::Dashboard(DashboardError::ValidationFailed(errors)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Some(errors.clone()))
            }
            ApiError::Dashboard(DashboardError::Repository(RepositoryError::RemoteUnavailable(_))) => {
                (StatusCode::SERVICE_UNAVAILABLE, None)
            }
            ApiError::Dashboard(DashboardError::Repository(RepositoryError::RemoteWriteFailed(_))) => {
                (StatusCode::BAD_GATEWAY, None)
            }
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                error: self.to_string(),
                fields,
            }),
        )
            .into_response()
    }
}
