//! Checkout / Pricing Engine
//!
//! 把购物车快照转换成订单：
//! 1. subtotal = 购物车 totalAmount
//! 2. 运费：满额免运，否则统一运费
//! 3. 税：固定税率，四舍五入到分
//! 4. 行项深拷贝进订单，订单创建后不可变
//! 5. 订单号唯一索引冲突时重新生成，有限次重试
//! 6. **先落库订单，后清空购物车** — 中途失败不丢购物车

use crate::cart::{CartService, GuestCartService};
use crate::db::models::{Cart, CheckoutRequest, GuestCheckoutRequest, Order, OrderStatus};
use crate::db::repository::{OrderRepository, RepoError};
use crate::money;
use crate::utils::time::{now_millis, now_rfc3339};
use crate::utils::{AppError, AppResult};
use rand::Rng;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

/// Bounded retries for orderNumber collisions
const ORDER_NUMBER_RETRIES: usize = 3;

/// Shipping/tax policy (currency units)
#[derive(Debug, Clone)]
pub struct PricingPolicy {
    /// Orders at or above this subtotal ship free
    pub free_shipping_threshold: f64,
    /// Flat fee below the threshold
    pub flat_shipping_fee: f64,
    /// Flat tax rate applied to the subtotal (not jurisdiction-aware)
    pub tax_rate: f64,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: 100.0,
            flat_shipping_fee: 10.0,
            tax_rate: 0.10,
        }
    }
}

impl PricingPolicy {
    pub fn shipping_cost(&self, subtotal: f64) -> f64 {
        if subtotal >= self.free_shipping_threshold {
            0.0
        } else {
            self.flat_shipping_fee
        }
    }

    pub fn tax(&self, subtotal: f64) -> f64 {
        money::apply_rate(subtotal, self.tax_rate)
    }
}

pub struct CheckoutEngine {
    orders: OrderRepository,
    user_carts: CartService,
    guest_carts: GuestCartService,
    policy: PricingPolicy,
}

impl CheckoutEngine {
    pub fn new(
        db: Surreal<Db>,
        user_carts: CartService,
        guest_carts: GuestCartService,
        policy: PricingPolicy,
    ) -> Self {
        Self {
            orders: OrderRepository::new(db),
            user_carts,
            guest_carts,
            policy,
        }
    }

    /// Checkout for an authenticated user
    pub async fn checkout(&self, user_id: &str, request: CheckoutRequest) -> AppResult<Order> {
        let cart = self.user_carts.get_or_create(user_id).await?;
        let order = self
            .create_order(
                &cart,
                user_id,
                request.shipping_address,
                request.payment_method,
                request.notes,
            )
            .await?;

        // Clear only after the order is durably persisted
        self.user_carts.clear(user_id).await?;
        Ok(order)
    }

    /// Checkout for a guest identity
    ///
    /// 当上游认证协作方解析出 user_id (结算时开户) 时，先把游客车
    /// 合并进用户车，再走用户结算；否则订单归属游客令牌本身。
    pub async fn guest_checkout(
        &self,
        guest_id: &str,
        request: GuestCheckoutRequest,
    ) -> AppResult<Order> {
        if let Some(user_id) = &request.user_id {
            let user_id = user_id.clone();
            self.guest_carts.merge_into_user(guest_id, &user_id).await?;
            return self
                .checkout(
                    &user_id,
                    CheckoutRequest {
                        shipping_address: request.shipping_address,
                        payment_method: request.payment_method,
                        notes: request.notes,
                    },
                )
                .await;
        }

        let cart = self.guest_carts.get_or_create(guest_id).await?;
        let order = self
            .create_order(
                &cart,
                guest_id,
                request.shipping_address,
                request.payment_method,
                request.notes,
            )
            .await?;

        self.guest_carts.clear(guest_id).await?;
        Ok(order)
    }

    /// Price a cart snapshot and persist the order (status = pending)
    async fn create_order(
        &self,
        cart: &Cart,
        owner_id: &str,
        shipping_address: crate::db::models::ShippingAddress,
        payment_method: Option<String>,
        notes: Option<String>,
    ) -> AppResult<Order> {
        self.create_order_with(
            cart,
            owner_id,
            shipping_address,
            payment_method,
            notes,
            generate_order_number,
        )
        .await
    }

    /// Persist loop with a pluggable order-number source
    async fn create_order_with<F>(
        &self,
        cart: &Cart,
        owner_id: &str,
        shipping_address: crate::db::models::ShippingAddress,
        payment_method: Option<String>,
        notes: Option<String>,
        next_number: F,
    ) -> AppResult<Order>
    where
        F: Fn() -> String,
    {
        if cart.is_empty() {
            return Err(AppError::validation(
                "Cart is empty. Cannot proceed with checkout.",
            ));
        }

        let subtotal = cart.total_amount;
        let shipping_cost = self.policy.shipping_cost(subtotal);
        let tax = self.policy.tax(subtotal);
        let total_amount = money::sum([subtotal, shipping_cost, tax]);

        let now = now_rfc3339();
        for attempt in 0..ORDER_NUMBER_RETRIES {
            let order = Order {
                id: None,
                order_number: next_number(),
                owner_id: owner_id.to_string(),
                // Deep copy: the order owns its item snapshot
                items: cart.items.clone(),
                shipping_address: shipping_address.clone(),
                subtotal,
                shipping_cost,
                tax,
                total_amount,
                total_items: cart.total_items,
                status: OrderStatus::Pending,
                payment_method: payment_method.clone().unwrap_or_else(|| "pending".into()),
                payment_status: "pending".to_string(),
                notes: notes.clone(),
                created_at: now.clone(),
                updated_at: now.clone(),
            };

            match self.orders.create(order).await {
                Ok(created) => {
                    tracing::info!(
                        order_number = %created.order_number,
                        owner = %owner_id,
                        total = total_amount,
                        "Order created"
                    );
                    return Ok(created);
                }
                Err(RepoError::Duplicate(_)) => {
                    tracing::warn!(attempt, "Order number collision, regenerating");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(AppError::conflict("Could not allocate a unique order number"))
    }
}

/// `ORD-<unixMillis>-<3-digit-random>` — uniqueness is ultimately enforced by
/// the orderNumber index, this only has to be collision-rare
fn generate_order_number() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1000);
    format!("ORD-{}-{:03}", now_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, ProductSnapshot, SharedCatalog};
    use crate::db::models::ShippingAddress;
    use std::sync::Arc;
    use surrealdb::engine::local::Mem;

    fn address() -> ShippingAddress {
        ShippingAddress {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "+3100000001".into(),
            address: "1 Analytical Way".into(),
            city: "London".into(),
            state: "LDN".into(),
            zip_code: "E1 6AN".into(),
            country: "UK".into(),
        }
    }

    async fn engine() -> (CheckoutEngine, CartService, GuestCartService) {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        crate::db::DbService::from_db(db.clone()).await.unwrap();
        let catalog: SharedCatalog = Arc::new(
            InMemoryCatalog::new()
                .with_product(ProductSnapshot {
                    id: "p1".into(),
                    name: "Espresso Beans".into(),
                    price: 30.0,
                    thumbnail: "p1.jpg".into(),
                    is_active: true,
                })
                .with_product(ProductSnapshot {
                    id: "p2".into(),
                    name: "Grinder".into(),
                    price: 120.0,
                    thumbnail: "p2.jpg".into(),
                    is_active: true,
                }),
        );
        let users = CartService::new(db.clone(), catalog.clone());
        let guests = GuestCartService::new(db.clone(), catalog.clone());
        let engine = CheckoutEngine::new(
            db,
            users.clone(),
            guests.clone(),
            PricingPolicy::default(),
        );
        (engine, users, guests)
    }

    #[test]
    fn order_number_format() {
        let number = generate_order_number();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[2].len(), 3);
        assert!(parts[1].parse::<i64>().is_ok());
        assert!(parts[2].parse::<u32>().is_ok());
    }

    #[test]
    fn shipping_policy_threshold() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.shipping_cost(120.0), 0.0);
        assert_eq!(policy.shipping_cost(100.0), 0.0);
        assert_eq!(policy.shipping_cost(40.0), 10.0);
    }

    #[tokio::test]
    async fn checkout_prices_and_clears_cart() {
        let (engine, users, _) = engine().await;
        users.add_item("u1", "p1", 2).await.unwrap();

        let order = engine
            .checkout(
                "u1",
                CheckoutRequest {
                    shipping_address: address(),
                    payment_method: None,
                    notes: None,
                },
            )
            .await
            .unwrap();

        // cart [{price:30, qty:2}] → subtotal 60, shipping 10, tax 6.00, total 76.00
        assert_eq!(order.subtotal, 60.0);
        assert_eq!(order.shipping_cost, 10.0);
        assert_eq!(order.tax, 6.0);
        assert_eq!(order.total_amount, 76.0);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, "pending");
        assert_eq!(order.payment_method, "pending");
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);

        let cart = users.get_or_create("u1").await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn checkout_over_threshold_ships_free() {
        let (engine, users, _) = engine().await;
        users.add_item("u2", "p2", 1).await.unwrap();

        let order = engine
            .checkout(
                "u2",
                CheckoutRequest {
                    shipping_address: address(),
                    payment_method: Some("stripe".into()),
                    notes: Some("leave at door".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(order.subtotal, 120.0);
        assert_eq!(order.shipping_cost, 0.0);
        assert_eq!(order.tax, 12.0);
        assert_eq!(order.total_amount, 132.0);
        assert_eq!(order.payment_method, "stripe");
        assert_eq!(order.notes.as_deref(), Some("leave at door"));
    }

    #[tokio::test]
    async fn empty_cart_checkout_is_rejected() {
        let (engine, _, _) = engine().await;
        let err = engine
            .checkout(
                "u3",
                CheckoutRequest {
                    shipping_address: address(),
                    payment_method: None,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn colliding_order_number_surfaces_as_duplicate() {
        let (engine, users, _) = engine().await;
        users.add_item("u7", "p1", 1).await.unwrap();
        let cart = users.get_or_create("u7").await.unwrap();

        let first = engine
            .create_order_with(&cart, "u7", address(), None, None, || "ORD-1-777".into())
            .await
            .unwrap();
        assert_eq!(first.order_number, "ORD-1-777");

        // 同号直插数据库，唯一索引把冲突映射为 Duplicate
        let mut copy = first.clone();
        copy.id = None;
        let err = engine.orders.create(copy).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn order_number_retry_gives_up_with_conflict() {
        let (engine, users, _) = engine().await;
        users.add_item("u8", "p1", 1).await.unwrap();
        let cart = users.get_or_create("u8").await.unwrap();

        engine
            .create_order_with(&cart, "u8", address(), None, None, || "ORD-1-888".into())
            .await
            .unwrap();

        // 号源卡死在已占用的号上：三次重试全部撞索引后放弃
        let err = engine
            .create_order_with(&cart, "u8", address(), None, None, || "ORD-1-888".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn guest_checkout_owns_order_by_token_and_clears_cart() {
        let (engine, _, guests) = engine().await;
        guests.add_item("guest_abc", "p1", 1).await.unwrap();

        let order = engine
            .guest_checkout(
                "guest_abc",
                GuestCheckoutRequest {
                    shipping_address: address(),
                    payment_method: None,
                    notes: None,
                    user_id: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(order.owner_id, "guest_abc");
        assert_eq!(guests.item_count("guest_abc").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn guest_checkout_with_account_merges_first() {
        let (engine, users, guests) = engine().await;
        users.add_item("u5", "p1", 1).await.unwrap();
        guests.add_item("guest_xyz", "p1", 1).await.unwrap();

        let order = engine
            .guest_checkout(
                "guest_xyz",
                GuestCheckoutRequest {
                    shipping_address: address(),
                    payment_method: None,
                    notes: None,
                    user_id: Some("u5".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(order.owner_id, "u5");
        // Merged 1 + 1 of the same product into one line of two
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.subtotal, 60.0);

        // Both carts are gone/empty afterwards
        assert_eq!(guests.item_count("guest_xyz").await.unwrap(), 0);
        assert_eq!(users.item_count("u5").await.unwrap(), 0);
    }
}
