//! Guest Cart API Handlers
//!
//! 每个响应都带 X-Guest-ID 头：首次请求在这里铸造令牌，
//! 客户端后续请求带回同一令牌。

use axum::{
    Json,
    extract::{Path, State},
};
use validator::Validate;

use crate::api::identity::{GUEST_ID_HEADER, GuestId};
use crate::core::ServerState;
use crate::db::models::{
    AddToCartRequest, Cart, CartItemCount, MergeCartRequest, UpdateCartItemRequest,
};
use crate::utils::AppResult;

/// 响应体 + 回传的游客令牌头
type GuestReply<T> = ([(&'static str, String); 1], Json<T>);

fn reply<T>(guest: GuestId, data: T) -> GuestReply<T> {
    ([(GUEST_ID_HEADER, guest.id)], Json(data))
}

/// GET /api/guest-cart - 获取游客购物车 (懒创建)
pub async fn get_cart(
    State(state): State<ServerState>,
    guest: GuestId,
) -> AppResult<GuestReply<Cart>> {
    let cart = state.guest_carts.get_or_create(&guest.id).await?;
    Ok(reply(guest, cart))
}

/// POST /api/guest-cart/add - 加入商品
pub async fn add_item(
    State(state): State<ServerState>,
    guest: GuestId,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<GuestReply<Cart>> {
    payload.validate()?;
    let cart = state
        .guest_carts
        .add_item(&guest.id, &payload.product_id, payload.quantity)
        .await?;
    Ok(reply(guest, cart))
}

/// PATCH /api/guest-cart/items/:product_id - 覆盖行数量
pub async fn update_item(
    State(state): State<ServerState>,
    guest: GuestId,
    Path(product_id): Path<String>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<GuestReply<Cart>> {
    payload.validate()?;
    let cart = state
        .guest_carts
        .update_item(&guest.id, &product_id, payload.quantity)
        .await?;
    Ok(reply(guest, cart))
}

/// DELETE /api/guest-cart/items/:product_id - 移除行
pub async fn remove_item(
    State(state): State<ServerState>,
    guest: GuestId,
    Path(product_id): Path<String>,
) -> AppResult<GuestReply<Cart>> {
    let cart = state.guest_carts.remove_item(&guest.id, &product_id).await?;
    Ok(reply(guest, cart))
}

/// DELETE /api/guest-cart/clear - 清空游客购物车
pub async fn clear(
    State(state): State<ServerState>,
    guest: GuestId,
) -> AppResult<GuestReply<Cart>> {
    let cart = state.guest_carts.clear(&guest.id).await?;
    Ok(reply(guest, cart))
}

/// GET /api/guest-cart/count - 商品件数 (无购物车时为 0)
pub async fn count(
    State(state): State<ServerState>,
    guest: GuestId,
) -> AppResult<GuestReply<CartItemCount>> {
    let count = state.guest_carts.item_count(&guest.id).await?;
    Ok(reply(guest, CartItemCount { count }))
}

/// POST /api/guest-cart/merge - 登录后合并进用户购物车
///
/// 合并成功后游客记录已删除，响应不再回传游客令牌。
pub async fn merge(
    State(state): State<ServerState>,
    guest: GuestId,
    Json(payload): Json<MergeCartRequest>,
) -> AppResult<Json<Cart>> {
    payload.validate()?;
    let merged = state
        .guest_carts
        .merge_into_user(&guest.id, &payload.user_id)
        .await?;
    Ok(Json(merged))
}
