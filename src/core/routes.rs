// HTTP routes configuration

use crate::core::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::handlers::health::health_handler))

        // Derived view and filter criteria
        .route("/view", get(crate::handlers::view::view_handler))
        .route("/filter", put(crate::handlers::view::filter_handler))
        .route("/refresh", post(crate::handlers::view::refresh_handler))
        .route(
            "/notifications",
            get(crate::handlers::notifications::notifications_handler),
        )

        // User CRUD
        .route(
            "/users",
            get(crate::handlers::users::list_users_handler)
                .post(crate::handlers::users::create_user_handler),
        )
        .route("/users/search", get(crate::handlers::users::search_users_handler))
        .route(
            "/users/{id}",
            get(crate::handlers::users::get_user_handler)
                .patch(crate::handlers::users::update_user_handler)
                .delete(crate::handlers::users::delete_user_handler),
        )

        // 404 fallback for all unmatched routes
        .fallback(crate::handlers::fallback::fallback_handler)

        .with_state(state)
}
