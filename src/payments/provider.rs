//! Payment Provider Strategy
//!
//! 两家服务商的 create/confirm/refund 归一成一个 trait，
//! 对账服务按 Payment 的 method 标签选择实现；测试注入假实现。

use crate::db::models::{Payment, PaymentMethod, PaymentStatus};
use crate::utils::AppResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Order context handed to provider create calls
#[derive(Debug, Clone, Default)]
pub struct CreateContext {
    pub order_id: String,
    pub order_number: String,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

/// Provider-side handle returned by a create call
///
/// Stripe fills `client_secret`, PayPal fills `approval_url`.
#[derive(Debug, Clone)]
pub struct ProviderPayment {
    /// Payment-intent id (Stripe) or order id (PayPal)
    pub provider_ref: String,
    pub client_secret: Option<String>,
    pub approval_url: Option<String>,
}

/// What the provider reports when a payment is confirmed
#[derive(Debug, Clone)]
pub struct ProviderOutcome {
    pub status: PaymentStatus,
    /// Charge id (Stripe) or capture id (PayPal) on success
    pub transaction_id: Option<String>,
    pub failure_reason: Option<String>,
}

/// Provider-side refund receipt
#[derive(Debug, Clone)]
pub struct ProviderRefund {
    pub refund_id: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn method(&self) -> PaymentMethod;

    /// Register the payment with the provider
    async fn create(
        &self,
        amount: f64,
        currency: &str,
        ctx: &CreateContext,
    ) -> AppResult<ProviderPayment>;

    /// Query/settle the payment identified by `provider_ref`
    async fn confirm(&self, provider_ref: &str) -> AppResult<ProviderOutcome>;

    /// Refund a completed payment, full refund when `amount` is `None`
    async fn refund(&self, payment: &Payment, amount: Option<f64>) -> AppResult<ProviderRefund>;
}

pub type SharedProvider = Arc<dyn PaymentProvider>;
