//! Order Repository
//!
//! orderNumber UNIQUE 索引承担订单号冲突检测；
//! 插入报重复时结算层重新生成并重试。

use super::{BaseRepository, RepoError, RepoResult, is_unique_violation, record_id};
use crate::db::models::{Order, OrderStats, OrderStatus};
use crate::utils::time::now_rfc3339;
use serde::Deserialize;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const ORDER_TABLE: &str = "order";

/// Sortable top-level scalar fields
const SORTABLE_FIELDS: &[&str] = &[
    "createdAt",
    "updatedAt",
    "totalAmount",
    "orderNumber",
    "status",
    "paymentStatus",
    "subtotal",
    "totalItems",
];

/// Filters shared by the list endpoints
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub owner_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<String>,
    /// Case-insensitive substring match on orderNumber
    pub order_number: Option<String>,
}

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Insert a new order; unique-index violation on orderNumber surfaces as Duplicate
    pub async fn create(&self, order: Order) -> RepoResult<Order> {
        let created: Option<Order> = self
            .base
            .db()
            .create(ORDER_TABLE)
            .content(order)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    RepoError::Duplicate("Order number already exists".to_string())
                } else {
                    RepoError::from(e)
                }
            })?;
        created.ok_or_else(|| RepoError::Database("Failed to create order".to_string()))
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        let order: Option<Order> = self.base.db().select(record_id(ORDER_TABLE, id)).await?;
        Ok(order)
    }

    pub async fn find_by_order_number(&self, order_number: &str) -> RepoResult<Option<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query("SELECT * FROM order WHERE orderNumber = $number")
            .bind(("number", order_number.to_string()))
            .await?
            .take(0)?;
        Ok(orders.into_iter().next())
    }

    /// Offset-paginated list with filters and whitelisted sort field
    pub async fn list(
        &self,
        filter: &OrderFilter,
        page: u32,
        limit: u32,
        sort_by: &str,
        descending: bool,
    ) -> RepoResult<(Vec<Order>, u64)> {
        // ORDER BY 字段无法参数绑定，只接受白名单内的字段名
        let sort_field = SORTABLE_FIELDS
            .iter()
            .find(|f| **f == sort_by)
            .copied()
            .unwrap_or("createdAt");
        let direction = if descending { "DESC" } else { "ASC" };

        let where_clause = Self::where_clause(filter);
        let start = (page.saturating_sub(1) as u64) * limit as u64;

        let list_query = format!(
            "SELECT * FROM order {where_clause} ORDER BY {sort_field} {direction} LIMIT $limit START $start"
        );
        let count_query = format!("SELECT count() AS count FROM order {where_clause} GROUP ALL");

        let orders: Vec<Order> = Self::bind_filter(
            self.base.db().query(&list_query),
            filter,
        )
        .bind(("limit", limit as i64))
        .bind(("start", start as i64))
        .await?
        .take(0)?;

        #[derive(Deserialize)]
        struct CountRow {
            count: u64,
        }
        let counts: Vec<CountRow> =
            Self::bind_filter(self.base.db().query(&count_query), filter)
                .await?
                .take(0)?;
        let total = counts.first().map(|c| c.count).unwrap_or(0);

        Ok((orders, total))
    }

    /// Overwrite status fields; transition checks happen in the service layer
    pub async fn update_status(
        &self,
        id: &str,
        status: OrderStatus,
        payment_status: Option<String>,
        notes: Option<String>,
    ) -> RepoResult<Order> {
        let mut set_parts = vec!["status = $status", "updatedAt = $updated_at"];
        if payment_status.is_some() {
            set_parts.push("paymentStatus = $payment_status");
        }
        if notes.is_some() {
            set_parts.push("notes = $notes");
        }

        let query_str = format!("UPDATE $order SET {} RETURN AFTER", set_parts.join(", "));
        let mut query = self
            .base
            .db()
            .query(&query_str)
            .bind(("order", record_id(ORDER_TABLE, id)))
            .bind(("status", status))
            .bind(("updated_at", now_rfc3339()));
        if let Some(ps) = payment_status {
            query = query.bind(("payment_status", ps));
        }
        if let Some(n) = notes {
            query = query.bind(("notes", n));
        }

        let updated: Vec<Order> = query.await?.take(0)?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Order with ID {} not found", id)))
    }

    /// Aggregate counts/sums, optionally scoped to one owner
    pub async fn stats(&self, owner_id: Option<&str>) -> RepoResult<OrderStats> {
        let where_clause = match owner_id {
            Some(_) => "WHERE ownerId = $owner",
            None => "",
        };

        #[derive(Deserialize)]
        struct TotalsRow {
            total_orders: u64,
            total_revenue: Option<f64>,
            average_order_value: Option<f64>,
        }
        #[derive(Deserialize)]
        struct StatusRow {
            status: OrderStatus,
            count: u64,
        }

        let totals_query = format!(
            "SELECT count() AS total_orders, \
             math::sum(totalAmount) AS total_revenue, \
             math::mean(totalAmount) AS average_order_value \
             FROM order {where_clause} GROUP ALL"
        );
        let status_query =
            format!("SELECT status, count() AS count FROM order {where_clause} GROUP BY status");

        let mut totals_q = self.base.db().query(&totals_query);
        let mut status_q = self.base.db().query(&status_query);
        if let Some(owner) = owner_id {
            totals_q = totals_q.bind(("owner", owner.to_string()));
            status_q = status_q.bind(("owner", owner.to_string()));
        }

        let totals: Vec<TotalsRow> = totals_q.await?.take(0)?;
        let by_status: Vec<StatusRow> = status_q.await?.take(0)?;

        let mut stats = OrderStats::default();
        if let Some(t) = totals.into_iter().next() {
            stats.total_orders = t.total_orders;
            stats.total_revenue = t.total_revenue.unwrap_or(0.0);
            stats.average_order_value = t.average_order_value.unwrap_or(0.0);
        }
        for row in by_status {
            match row.status {
                OrderStatus::Pending => stats.pending_orders = row.count,
                OrderStatus::Confirmed => stats.confirmed_orders = row.count,
                OrderStatus::Delivered => stats.delivered_orders = row.count,
                OrderStatus::Cancelled => stats.cancelled_orders = row.count,
                _ => {}
            }
        }
        Ok(stats)
    }

    fn where_clause(filter: &OrderFilter) -> String {
        let mut parts = Vec::new();
        if filter.owner_id.is_some() {
            parts.push("ownerId = $owner");
        }
        if filter.status.is_some() {
            parts.push("status = $f_status");
        }
        if filter.payment_status.is_some() {
            parts.push("paymentStatus = $f_payment_status");
        }
        if filter.order_number.is_some() {
            parts.push("string::contains(string::lowercase(orderNumber), string::lowercase($f_order_number))");
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", parts.join(" AND "))
        }
    }

    fn bind_filter<'a>(
        mut query: surrealdb::method::Query<'a, Db>,
        filter: &OrderFilter,
    ) -> surrealdb::method::Query<'a, Db> {
        if let Some(owner) = &filter.owner_id {
            query = query.bind(("owner", owner.clone()));
        }
        if let Some(status) = filter.status {
            query = query.bind(("f_status", status));
        }
        if let Some(ps) = &filter.payment_status {
            query = query.bind(("f_payment_status", ps.clone()));
        }
        if let Some(number) = &filter.order_number {
            query = query.bind(("f_order_number", number.clone()));
        }
        query
    }
}
