//! Order Service
//!
//! 订单查询、状态机守卫与统计。状态迁移规则在 [`OrderStatus`] 上，
//! 这里负责：加载当前状态 → 校验迁移 → 落库。
//! `force` 是管理员逃生通道，跳过迁移校验但保留审计日志。

use crate::db::models::{
    Order, OrderPage, OrderStats, OrderStatus, QueryOrdersRequest, UpdateOrderStatusRequest,
};
use crate::db::repository::{OrderFilter, OrderRepository};
use crate::utils::{AppError, AppResult};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const DEFAULT_PAGE_LIMIT: u32 = 10;

#[derive(Clone)]
pub struct OrderService {
    repo: OrderRepository,
}

impl OrderService {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            repo: OrderRepository::new(db),
        }
    }

    pub async fn find_by_id(&self, id: &str) -> AppResult<Order> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order with ID {id} not found")))
    }

    /// Owner-scoped lookup; someone else's order reads as absent
    pub async fn find_for_owner(&self, id: &str, owner_id: &str) -> AppResult<Order> {
        let order = self.find_by_id(id).await?;
        if order.owner_id != owner_id {
            return Err(AppError::not_found(format!("Order with ID {id} not found")));
        }
        Ok(order)
    }

    pub async fn find_by_order_number(&self, order_number: &str) -> AppResult<Order> {
        self.repo
            .find_by_order_number(order_number)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Order with number {order_number} not found"))
            })
    }

    /// Paginated list across all owners (admin surface)
    pub async fn list(&self, query: &QueryOrdersRequest) -> AppResult<OrderPage> {
        self.list_filtered(query, None).await
    }

    /// Paginated list scoped to one owner
    pub async fn list_by_owner(
        &self,
        owner_id: &str,
        query: &QueryOrdersRequest,
    ) -> AppResult<OrderPage> {
        self.list_filtered(query, Some(owner_id.to_string())).await
    }

    async fn list_filtered(
        &self,
        query: &QueryOrdersRequest,
        owner_id: Option<String>,
    ) -> AppResult<OrderPage> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, 100);
        let sort_by = query.sort_by.as_deref().unwrap_or("createdAt");
        // 默认新订单在前；只有显式 asc 才升序
        let descending = !matches!(query.sort_order.as_deref(), Some("asc") | Some("ASC"));

        let filter = OrderFilter {
            owner_id,
            status: query.status,
            payment_status: query.payment_status.clone(),
            order_number: query.order_number.clone(),
        };

        let (orders, total) = self.repo.list(&filter, page, limit, sort_by, descending).await?;
        let total_pages = (total.div_ceil(limit as u64)) as u32;

        Ok(OrderPage {
            orders,
            total,
            page,
            total_pages,
        })
    }

    /// Admin status update with transition guard
    ///
    /// 重复设置同一状态视为幂等；非法迁移默认拒绝，`force` 可覆盖。
    pub async fn update_status(
        &self,
        id: &str,
        request: UpdateOrderStatusRequest,
    ) -> AppResult<Order> {
        let current = self.find_by_id(id).await?;

        let same_status = current.status == request.status;
        if !same_status && !current.status.can_transition_to(request.status) {
            if !request.force {
                return Err(AppError::business_rule(format!(
                    "Cannot transition order from {} to {}",
                    current.status.as_str(),
                    request.status.as_str()
                )));
            }
            tracing::warn!(
                order_number = %current.order_number,
                from = current.status.as_str(),
                to = request.status.as_str(),
                "Forced order status override"
            );
        }

        let updated = self
            .repo
            .update_status(id, request.status, request.payment_status, request.notes)
            .await?;
        tracing::info!(
            order_number = %updated.order_number,
            status = updated.status.as_str(),
            "Order status updated"
        );
        Ok(updated)
    }

    /// Customer-initiated cancellation, pending orders only
    pub async fn cancel(&self, id: &str, owner_id: &str) -> AppResult<Order> {
        let order = self.find_for_owner(id, owner_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(AppError::business_rule(
                "Only pending orders can be cancelled",
            ));
        }
        let cancelled = self
            .repo
            .update_status(id, OrderStatus::Cancelled, None, None)
            .await?;
        tracing::info!(order_number = %cancelled.order_number, "Order cancelled");
        Ok(cancelled)
    }

    pub async fn stats(&self, owner_id: Option<&str>) -> AppResult<OrderStats> {
        Ok(self.repo.stats(owner_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CartItem, ShippingAddress};
    use crate::utils::time::now_rfc3339;
    use surrealdb::engine::local::Mem;

    async fn service() -> OrderService {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        crate::db::DbService::from_db(db.clone()).await.unwrap();
        OrderService::new(db)
    }

    fn sample_order(number: &str, owner: &str, total: f64) -> Order {
        let now = now_rfc3339();
        Order {
            id: None,
            order_number: number.to_string(),
            owner_id: owner.to_string(),
            items: vec![CartItem {
                product_id: "p1".into(),
                product_name: "Espresso Beans".into(),
                product_price: total,
                product_thumbnail: "p1.jpg".into(),
                quantity: 1,
                total_price: total,
            }],
            shipping_address: ShippingAddress {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.com".into(),
                phone: "+3100000001".into(),
                address: "1 Analytical Way".into(),
                city: "London".into(),
                state: "LDN".into(),
                zip_code: "E1 6AN".into(),
                country: "UK".into(),
            },
            subtotal: total,
            shipping_cost: 0.0,
            tax: 0.0,
            total_amount: total,
            total_items: 1,
            status: OrderStatus::Pending,
            payment_method: "pending".into(),
            payment_status: "pending".into(),
            notes: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    async fn insert(svc: &OrderService, order: Order) -> (String, Order) {
        let created = svc.repo.create(order).await.unwrap();
        let id = created.id.clone().unwrap().to_string();
        (id, created)
    }

    #[tokio::test]
    async fn find_by_id_and_number() {
        let svc = service().await;
        let (id, created) = insert(&svc, sample_order("ORD-1-001", "u1", 50.0)).await;

        let by_id = svc.find_by_id(&id).await.unwrap();
        assert_eq!(by_id.order_number, created.order_number);

        let by_number = svc.find_by_order_number("ORD-1-001").await.unwrap();
        assert_eq!(by_number.owner_id, "u1");

        let err = svc.find_by_order_number("ORD-0-000").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn owner_scoped_lookup_hides_foreign_orders() {
        let svc = service().await;
        let (id, _) = insert(&svc, sample_order("ORD-2-001", "u1", 20.0)).await;

        assert!(svc.find_for_owner(&id, "u1").await.is_ok());
        let err = svc.find_for_owner(&id, "u2").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn cancel_is_pending_only_and_not_repeatable() {
        let svc = service().await;
        let (id, _) = insert(&svc, sample_order("ORD-3-001", "u1", 20.0)).await;

        let cancelled = svc.cancel(&id, "u1").await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        // Second cancel hits the pending-only rule
        let err = svc.cancel(&id, "u1").await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn illegal_transition_is_rejected_unless_forced() {
        let svc = service().await;
        let (id, _) = insert(&svc, sample_order("ORD-4-001", "u1", 20.0)).await;

        let err = svc
            .update_status(
                &id,
                UpdateOrderStatusRequest {
                    status: OrderStatus::Shipped,
                    payment_status: None,
                    notes: None,
                    force: false,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));

        let forced = svc
            .update_status(
                &id,
                UpdateOrderStatusRequest {
                    status: OrderStatus::Shipped,
                    payment_status: Some("paid".into()),
                    notes: Some("manual override".into()),
                    force: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(forced.status, OrderStatus::Shipped);
        assert_eq!(forced.payment_status, "paid");
    }

    #[tokio::test]
    async fn setting_same_status_is_idempotent() {
        let svc = service().await;
        let (id, _) = insert(&svc, sample_order("ORD-5-001", "u1", 20.0)).await;

        let updated = svc
            .update_status(
                &id,
                UpdateOrderStatusRequest {
                    status: OrderStatus::Pending,
                    payment_status: Some("paid".into()),
                    notes: None,
                    force: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Pending);
        assert_eq!(updated.payment_status, "paid");
    }

    #[tokio::test]
    async fn sequential_transitions_walk_the_state_machine() {
        let svc = service().await;
        let (id, _) = insert(&svc, sample_order("ORD-6-001", "u1", 20.0)).await;

        for status in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            let updated = svc
                .update_status(
                    &id,
                    UpdateOrderStatusRequest {
                        status,
                        payment_status: None,
                        notes: None,
                        force: false,
                    },
                )
                .await
                .unwrap();
            assert_eq!(updated.status, status);
        }

        // Delivered is terminal
        let err = svc
            .update_status(
                &id,
                UpdateOrderStatusRequest {
                    status: OrderStatus::Pending,
                    payment_status: None,
                    notes: None,
                    force: false,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn list_paginates_and_filters_by_owner() {
        let svc = service().await;
        for i in 0..12 {
            let owner = if i % 2 == 0 { "u1" } else { "u2" };
            insert(&svc, sample_order(&format!("ORD-7-{i:03}"), owner, 10.0)).await;
        }

        let page = svc.list(&QueryOrdersRequest::default()).await.unwrap();
        assert_eq!(page.total, 12);
        assert_eq!(page.orders.len(), 10);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 2);

        let mine = svc
            .list_by_owner("u1", &QueryOrdersRequest::default())
            .await
            .unwrap();
        assert_eq!(mine.total, 6);
        assert!(mine.orders.iter().all(|o| o.owner_id == "u1"));
    }

    #[tokio::test]
    async fn list_filters_by_status_and_number_fragment() {
        let svc = service().await;
        let (id, _) = insert(&svc, sample_order("ORD-8-123", "u1", 10.0)).await;
        insert(&svc, sample_order("ORD-8-456", "u1", 10.0)).await;
        svc.cancel(&id, "u1").await.unwrap();

        let cancelled = svc
            .list(&QueryOrdersRequest {
                status: Some(OrderStatus::Cancelled),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(cancelled.total, 1);
        assert_eq!(cancelled.orders[0].order_number, "ORD-8-123");

        let by_fragment = svc
            .list(&QueryOrdersRequest {
                order_number: Some("8-456".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_fragment.total, 1);
        assert_eq!(by_fragment.orders[0].order_number, "ORD-8-456");
    }

    #[tokio::test]
    async fn stats_aggregate_totals_and_status_counts() {
        let svc = service().await;
        insert(&svc, sample_order("ORD-9-001", "u1", 100.0)).await;
        insert(&svc, sample_order("ORD-9-002", "u1", 50.0)).await;
        let (id, _) = insert(&svc, sample_order("ORD-9-003", "u2", 30.0)).await;
        svc.cancel(&id, "u2").await.unwrap();

        let all = svc.stats(None).await.unwrap();
        assert_eq!(all.total_orders, 3);
        assert_eq!(all.total_revenue, 180.0);
        assert_eq!(all.pending_orders, 2);
        assert_eq!(all.cancelled_orders, 1);
        assert_eq!(all.average_order_value, 60.0);

        let scoped = svc.stats(Some("u1")).await.unwrap();
        assert_eq!(scoped.total_orders, 2);
        assert_eq!(scoped.total_revenue, 150.0);
    }
}
