//! Payment Repository
//!
//! 独立 payment 表，按 provider 关联 id (paymentIntentId / paypalOrderId)
//! 反查本地记录做对账。

use super::{BaseRepository, RepoError, RepoResult, record_id};
use crate::db::models::{Payment, PaymentUpdate};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const PAYMENT_TABLE: &str = "payment";

#[derive(Clone)]
pub struct PaymentRepository {
    base: BaseRepository,
}

impl PaymentRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn create(&self, payment: Payment) -> RepoResult<Payment> {
        let created: Option<Payment> = self
            .base
            .db()
            .create(PAYMENT_TABLE)
            .content(payment)
            .await?;
        created.ok_or_else(|| RepoError::Database("Failed to create payment".to_string()))
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Payment>> {
        let payment: Option<Payment> = self.base.db().select(record_id(PAYMENT_TABLE, id)).await?;
        Ok(payment)
    }

    pub async fn find_by_intent_id(&self, payment_intent_id: &str) -> RepoResult<Option<Payment>> {
        self.find_one_by("paymentIntentId", payment_intent_id).await
    }

    pub async fn find_by_paypal_order_id(
        &self,
        paypal_order_id: &str,
    ) -> RepoResult<Option<Payment>> {
        self.find_one_by("paypalOrderId", paypal_order_id).await
    }

    /// Merge reconciliation fields into the stored record; payment rows are
    /// only mutated by the reconciliation service, one provider callback at a time
    pub async fn update(&self, payment: &Payment) -> RepoResult<Payment> {
        let id = payment
            .id
            .clone()
            .ok_or_else(|| RepoError::Validation("Payment has no id".to_string()))?;
        let updated: Option<Payment> = self
            .base
            .db()
            .update(id)
            .merge(PaymentUpdate::from(payment))
            .await?;
        updated.ok_or_else(|| RepoError::NotFound("Payment not found".to_string()))
    }

    pub async fn list_by_owner(&self, owner_id: &str) -> RepoResult<Vec<Payment>> {
        let payments: Vec<Payment> = self
            .base
            .db()
            .query("SELECT * FROM payment WHERE ownerId = $owner ORDER BY createdAt DESC")
            .bind(("owner", owner_id.to_string()))
            .await?
            .take(0)?;
        Ok(payments)
    }

    pub async fn list_by_order(&self, order_id: &str) -> RepoResult<Vec<Payment>> {
        let payments: Vec<Payment> = self
            .base
            .db()
            .query("SELECT * FROM payment WHERE orderId = $order ORDER BY createdAt DESC")
            .bind(("order", order_id.to_string()))
            .await?
            .take(0)?;
        Ok(payments)
    }

    async fn find_one_by(&self, field: &str, value: &str) -> RepoResult<Option<Payment>> {
        // field 来自本模块内的固定调用，不接受外部输入
        let query = format!("SELECT * FROM payment WHERE {field} = $value");
        let payments: Vec<Payment> = self
            .base
            .db()
            .query(&query)
            .bind(("value", value.to_string()))
            .await?
            .take(0)?;
        Ok(payments.into_iter().next())
    }
}
