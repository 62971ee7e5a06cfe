//! Payments API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/payments", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/stripe/create", post(handler::create_stripe))
        .route("/stripe/confirm", post(handler::confirm_stripe))
        .route("/paypal/create", post(handler::create_paypal))
        .route("/paypal/confirm", post(handler::confirm_paypal))
        // Raw-body route, signature verified against the exact bytes
        .route("/webhook/stripe", post(handler::stripe_webhook))
        .route("/my", get(handler::list_my))
        .route("/order/{order_id}", get(handler::list_by_order))
        // Admin surface - upstream gateway enforces the role
        .route("/{id}/refund", post(handler::refund))
}
