//! Orders API Handlers
//!
//! 结算、订单查询与状态管理。管理端接口的权限由上游网关保证，
//! 本服务只做数据层校验。

use axum::{
    Json,
    extract::{Path, Query, State},
};
use validator::Validate;

use crate::api::identity::{CurrentUser, RequiredGuestId};
use crate::core::ServerState;
use crate::db::models::{
    CheckoutRequest, GuestCheckoutRequest, Order, OrderPage, OrderStats, QueryOrdersRequest,
    UpdateOrderStatusRequest,
};
use crate::utils::AppResult;

/// POST /api/orders/checkout - 用户结算
pub async fn checkout(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<Order>> {
    payload.validate()?;
    Ok(Json(state.checkout.checkout(&user.id, payload).await?))
}

/// POST /api/orders/guest-checkout - 游客结算
///
/// 缺失 X-Guest-ID 直接 400，不凭空铸造令牌。
pub async fn guest_checkout(
    State(state): State<ServerState>,
    RequiredGuestId(guest_id): RequiredGuestId,
    Json(payload): Json<GuestCheckoutRequest>,
) -> AppResult<Json<Order>> {
    payload.validate()?;
    Ok(Json(state.checkout.guest_checkout(&guest_id, payload).await?))
}

/// GET /api/orders/my - 当前用户订单分页
pub async fn list_my(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<QueryOrdersRequest>,
) -> AppResult<Json<OrderPage>> {
    Ok(Json(state.orders.list_by_owner(&user.id, &query).await?))
}

/// GET /api/orders/my/stats - 当前用户的订单统计
pub async fn my_stats(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<OrderStats>> {
    Ok(Json(state.orders.stats(Some(user.id.as_str())).await?))
}

/// GET /api/orders - 全量订单分页 (管理端)
pub async fn list_all(
    State(state): State<ServerState>,
    Query(query): Query<QueryOrdersRequest>,
) -> AppResult<Json<OrderPage>> {
    Ok(Json(state.orders.list(&query).await?))
}

/// GET /api/orders/stats - 订单统计 (管理端)
pub async fn stats(State(state): State<ServerState>) -> AppResult<Json<OrderStats>> {
    Ok(Json(state.orders.stats(None).await?))
}

/// GET /api/orders/number/:order_number - 按订单号查询
pub async fn get_by_number(
    State(state): State<ServerState>,
    Path(order_number): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.find_by_order_number(&order_number).await?))
}

/// GET /api/orders/:id - 按 id 查询 (仅限本人订单)
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.find_for_owner(&id, &user.id).await?))
}

/// PATCH /api/orders/:id/status - 状态更新 (管理端)
///
/// 非法状态迁移默认拒绝，`force: true` 跳过校验。
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.update_status(&id, payload).await?))
}

/// PATCH /api/orders/:id/cancel - 取消订单 (仅 pending)
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.cancel(&id, &user.id).await?))
}
