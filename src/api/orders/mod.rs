//! Orders API 模块

mod handler;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/checkout", post(handler::checkout))
        .route("/guest-checkout", post(handler::guest_checkout))
        .route("/my", get(handler::list_my))
        .route("/my/stats", get(handler::my_stats))
        // Admin surface - upstream gateway enforces the role
        .route("/", get(handler::list_all))
        .route("/stats", get(handler::stats))
        // Static segment before /{id} to avoid path conflicts
        .route("/number/{order_number}", get(handler::get_by_number))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", patch(handler::update_status))
        .route("/{id}/cancel", patch(handler::cancel))
}
