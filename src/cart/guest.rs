//! Guest Cart Service
//!
//! 与用户购物车同一套机制，key 是边界层签发的游客令牌
//! (`guest_<uuid>`，经 X-Guest-ID 响应头往返)。
//! 登录/结算时一次性合并进用户购物车，合并后游客记录删除。

use super::service::{CartScope, CartService};
use crate::catalog::SharedCatalog;
use crate::db::models::Cart;
use crate::money;
use crate::utils::{AppError, AppResult};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use uuid::Uuid;

#[derive(Clone)]
pub struct GuestCartService {
    inner: CartService,
}

impl GuestCartService {
    pub fn new(db: Surreal<Db>, catalog: SharedCatalog) -> Self {
        Self {
            inner: CartService::with_scope(db, catalog, CartScope::Guest),
        }
    }

    /// Mint a fresh guest token
    pub fn generate_guest_id() -> String {
        format!("guest_{}", Uuid::new_v4())
    }

    pub async fn get_or_create(&self, guest_id: &str) -> AppResult<Cart> {
        self.inner.get_or_create(guest_id).await
    }

    pub async fn add_item(&self, guest_id: &str, product_id: &str, quantity: i32) -> AppResult<Cart> {
        self.inner.add_item(guest_id, product_id, quantity).await
    }

    pub async fn update_item(
        &self,
        guest_id: &str,
        product_id: &str,
        quantity: i32,
    ) -> AppResult<Cart> {
        self.inner.update_item(guest_id, product_id, quantity).await
    }

    pub async fn remove_item(&self, guest_id: &str, product_id: &str) -> AppResult<Cart> {
        self.inner.remove_item(guest_id, product_id).await
    }

    pub async fn clear(&self, guest_id: &str) -> AppResult<Cart> {
        self.inner.clear(guest_id).await
    }

    pub async fn item_count(&self, guest_id: &str) -> AppResult<i32> {
        self.inner.item_count(guest_id).await
    }

    /// Merge the guest cart into the user's cart
    ///
    /// - 游客购物车缺失或为空 → 400（二次调用因此安全失败，不会凭空造车）
    /// - 用户已有购物车：按商品合并，数量相加，行总价按**用户车已存单价**重算
    /// - 用户无购物车：直接把游客车改名过户
    /// - 两条路径最后都恰好删除一次游客记录
    pub async fn merge_into_user(&self, guest_id: &str, user_id: &str) -> AppResult<Cart> {
        let repo = self.inner.repo();

        let guest_cart = repo.find_by_owner(guest_id).await?;
        let guest_cart = match guest_cart {
            Some(cart) if !cart.is_empty() => cart,
            _ => return Err(AppError::validation("Guest cart is empty or not found")),
        };

        let Some(mut user_cart) = repo.find_by_owner(user_id).await? else {
            // 过户：游客车成为用户车，记录本身即被"删除"(改名)
            return repo
                .rename_owner(guest_id, user_id)
                .await?
                .ok_or_else(|| AppError::validation("Guest cart is empty or not found"));
        };

        for guest_item in &guest_cart.items {
            match user_cart.find_item(&guest_item.product_id) {
                Some(idx) => {
                    let item = &mut user_cart.items[idx];
                    // 合并求和同样受行数量上限约束
                    money::validate_quantity(item.quantity + guest_item.quantity)?;
                    item.quantity += guest_item.quantity;
                    item.total_price = money::line_total(item.product_price, item.quantity);
                }
                None => user_cart.items.push(guest_item.clone()),
            }
        }
        user_cart.recalculate_totals();

        let merged = repo
            .save(&user_cart)
            .await?
            .ok_or_else(|| AppError::conflict("Cart was modified concurrently"))?;

        repo.delete_by_owner(guest_id).await?;
        Ok(merged)
    }
}
