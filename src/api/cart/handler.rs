//! Cart API Handlers
//!
//! 全部接口以 X-User-ID 解析出的用户为主体。

use axum::{
    Json,
    extract::{Path, State},
};
use validator::Validate;

use crate::api::identity::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{AddToCartRequest, Cart, CartItemCount, UpdateCartItemRequest};
use crate::utils::AppResult;

/// GET /api/cart - 获取购物车 (懒创建)
pub async fn get_cart(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Cart>> {
    Ok(Json(state.carts.get_or_create(&user.id).await?))
}

/// POST /api/cart/add - 加入商品
pub async fn add_item(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<Cart>> {
    payload.validate()?;
    let cart = state
        .carts
        .add_item(&user.id, &payload.product_id, payload.quantity)
        .await?;
    Ok(Json(cart))
}

/// PATCH /api/cart/items/:product_id - 覆盖行数量
pub async fn update_item(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(product_id): Path<String>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<Cart>> {
    payload.validate()?;
    let cart = state
        .carts
        .update_item(&user.id, &product_id, payload.quantity)
        .await?;
    Ok(Json(cart))
}

/// DELETE /api/cart/items/:product_id - 移除行
pub async fn remove_item(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(product_id): Path<String>,
) -> AppResult<Json<Cart>> {
    Ok(Json(state.carts.remove_item(&user.id, &product_id).await?))
}

/// DELETE /api/cart/clear - 清空购物车
pub async fn clear(State(state): State<ServerState>, user: CurrentUser) -> AppResult<Json<Cart>> {
    Ok(Json(state.carts.clear(&user.id).await?))
}

/// GET /api/cart/count - 商品件数 (无购物车时为 0)
pub async fn count(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<CartItemCount>> {
    let count = state.carts.item_count(&user.id).await?;
    Ok(Json(CartItemCount { count }))
}
