//! Cart Service
//!
//! 购物车核心规则：
//! - 每个身份至多一个购物车，懒创建
//! - 同一商品至多一行；重复加入累加数量，行总价按**已存单价**重算
//! - 每次变更后 totalAmount/totalItems 重算
//! - 保存走乐观并发，版本冲突时重读重放，有限次后报冲突

use crate::catalog::SharedCatalog;
use crate::db::models::{Cart, CartItem};
use crate::db::repository::{CartRepository, RepoError};
use crate::money;
use crate::utils::{AppError, AppResult};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

/// Bounded retries for optimistic saves and create races
const SAVE_RETRIES: usize = 3;

/// Which identity space a service instance operates on — only the error
/// surface differs (the original API reports missing guest carts as 400)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CartScope {
    User,
    Guest,
}

impl CartScope {
    fn missing_cart(self) -> AppError {
        match self {
            CartScope::User => AppError::not_found("Cart not found"),
            CartScope::Guest => AppError::validation("Guest cart not found"),
        }
    }

    fn missing_item(self) -> AppError {
        match self {
            CartScope::User => AppError::not_found("Product not found in cart"),
            CartScope::Guest => AppError::validation("Product not found in guest cart"),
        }
    }
}

#[derive(Clone)]
pub struct CartService {
    repo: CartRepository,
    catalog: SharedCatalog,
    scope: CartScope,
}

impl CartService {
    pub fn new(db: Surreal<Db>, catalog: SharedCatalog) -> Self {
        Self::with_scope(db, catalog, CartScope::User)
    }

    pub(crate) fn with_scope(db: Surreal<Db>, catalog: SharedCatalog, scope: CartScope) -> Self {
        Self {
            repo: CartRepository::new(db),
            catalog,
            scope,
        }
    }

    pub(crate) fn repo(&self) -> &CartRepository {
        &self.repo
    }

    /// Return the identity's cart, creating an empty one on first access
    pub async fn get_or_create(&self, owner_id: &str) -> AppResult<Cart> {
        for _ in 0..SAVE_RETRIES {
            if let Some(cart) = self.repo.find_by_owner(owner_id).await? {
                return Ok(cart);
            }
            match self.repo.create(Cart::empty(owner_id)).await {
                Ok(cart) => return Ok(cart),
                // 并发首次创建：输掉竞争的一方重读即可
                Err(RepoError::Duplicate(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(AppError::conflict("Cart was modified concurrently"))
    }

    /// Add a product to the cart
    ///
    /// 已存在的行累加数量并按已存单价重算；新行按目录当前价快照。
    pub async fn add_item(&self, owner_id: &str, product_id: &str, quantity: i32) -> AppResult<Cart> {
        money::validate_quantity(quantity)?;

        let product = self.catalog.resolve_product(product_id).await?;
        if !product.is_active {
            return Err(AppError::validation("Product is not available"));
        }
        money::validate_price(product.price)?;

        self.mutate(owner_id, true, |cart| {
            match cart.find_item(product_id) {
                Some(idx) => {
                    let item = &mut cart.items[idx];
                    // 累加后的行数量也要守上限，不能靠多次加入绕过
                    money::validate_quantity(item.quantity + quantity)?;
                    item.quantity += quantity;
                    // 不回读目录价：行总价基于加入时的快照单价
                    item.total_price = money::line_total(item.product_price, item.quantity);
                }
                None => {
                    cart.items.push(CartItem {
                        product_id: product_id.to_string(),
                        product_name: product.name.clone(),
                        product_price: product.price,
                        product_thumbnail: product.thumbnail.clone(),
                        quantity,
                        total_price: money::line_total(product.price, quantity),
                    });
                }
            }
            Ok(())
        })
        .await
    }

    /// Overwrite a line's quantity
    pub async fn update_item(
        &self,
        owner_id: &str,
        product_id: &str,
        quantity: i32,
    ) -> AppResult<Cart> {
        money::validate_quantity(quantity)?;
        let scope = self.scope;

        self.mutate(owner_id, false, move |cart| {
            let idx = cart
                .find_item(product_id)
                .ok_or_else(|| scope.missing_item())?;
            let item = &mut cart.items[idx];
            item.quantity = quantity;
            item.total_price = money::line_total(item.product_price, quantity);
            Ok(())
        })
        .await
    }

    /// Remove a line
    pub async fn remove_item(&self, owner_id: &str, product_id: &str) -> AppResult<Cart> {
        let scope = self.scope;
        self.mutate(owner_id, false, move |cart| {
            let idx = cart
                .find_item(product_id)
                .ok_or_else(|| scope.missing_item())?;
            cart.items.remove(idx);
            Ok(())
        })
        .await
    }

    /// Empty the cart, zeroing totals
    pub async fn clear(&self, owner_id: &str) -> AppResult<Cart> {
        self.mutate(owner_id, false, |cart| {
            cart.items.clear();
            Ok(())
        })
        .await
    }

    /// Item count; 0 when no cart exists (non-failing read)
    pub async fn item_count(&self, owner_id: &str) -> AppResult<i32> {
        Ok(self
            .repo
            .find_by_owner(owner_id)
            .await?
            .map(|c| c.total_items)
            .unwrap_or(0))
    }

    /// Load-mutate-save loop with optimistic retry
    ///
    /// `create_if_missing` 仅对 add 场景为真；其余操作按 scope 报缺失。
    async fn mutate<F>(&self, owner_id: &str, create_if_missing: bool, apply: F) -> AppResult<Cart>
    where
        F: Fn(&mut Cart) -> AppResult<()>,
    {
        for _ in 0..SAVE_RETRIES {
            let existing = self.repo.find_by_owner(owner_id).await?;
            let mut cart = match existing {
                Some(cart) => cart,
                None if create_if_missing => Cart::empty(owner_id),
                None => return Err(self.scope.missing_cart()),
            };

            apply(&mut cart)?;
            cart.recalculate_totals();

            if cart.id.is_none() {
                match self.repo.create(cart).await {
                    Ok(created) => return Ok(created),
                    Err(RepoError::Duplicate(_)) => continue,
                    Err(e) => return Err(e.into()),
                }
            } else if let Some(saved) = self.repo.save(&cart).await? {
                return Ok(saved);
            }
            // 版本冲突：重读后重放变更
            tracing::debug!(owner = %owner_id, "Cart version conflict, retrying");
        }
        Err(AppError::conflict("Cart was modified concurrently"))
    }
}
