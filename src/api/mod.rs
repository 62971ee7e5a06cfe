//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`cart`] - 用户购物车接口
//! - [`guest_cart`] - 游客购物车接口 (X-Guest-ID)
//! - [`orders`] - 结算与订单接口
//! - [`payments`] - 支付接口 (Stripe / PayPal)
//! - [`identity`] - 身份抽取器

pub mod identity;

pub mod cart;
pub mod guest_cart;
pub mod health;
pub mod orders;
pub mod payments;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(cart::router())
        .merge(guest_cart::router())
        .merge(orders::router())
        .merge(payments::router())
        // Health API - public route
        .merge(health::router())
}

/// Build the fully configured application with middleware and state
pub fn build_app(state: ServerState) -> Router {
    build_router()
        // CORS - Handle cross-origin requests
        .layer(CorsLayer::permissive())
        // Trace - Request tracing (logs at INFO level)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
