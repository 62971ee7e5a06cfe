//! Cart API 模块

mod handler;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/cart", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::get_cart))
        .route("/add", post(handler::add_item))
        .route(
            "/items/{product_id}",
            patch(handler::update_item).delete(handler::remove_item),
        )
        .route("/clear", delete(handler::clear))
        .route("/count", get(handler::count))
}
