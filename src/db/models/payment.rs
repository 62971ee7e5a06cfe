//! Payment Model
//!
//! 一个订单可有多条支付记录 (重试产生新记录)，至多一条到达 completed。
//! Payment 状态与 Order 状态独立对账，互不自动联动。

use super::serde_helpers;
use crate::utils::time::now_rfc3339;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use validator::Validate;

/// Payment status enum (wire-level lowercase strings)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

/// Payment provider tag, selects the provider implementation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Stripe,
    Paypal,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Stripe => "stripe",
            PaymentMethod::Paypal => "paypal",
        }
    }
}

/// Payment entity, keyed to order + owner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    pub order_id: String,
    pub owner_id: String,
    pub payment_method: PaymentMethod,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    /// Provider charge/capture id once completed
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// Stripe payment-intent id
    #[serde(default)]
    pub payment_intent_id: Option<String>,
    /// PayPal order id
    #[serde(default)]
    pub paypal_order_id: Option<String>,
    /// PayPal capture id
    #[serde(default)]
    pub paypal_capture_id: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub processed_at: Option<String>,
    #[serde(default)]
    pub refunded_at: Option<String>,
    #[serde(default)]
    pub refunded_amount: Option<f64>,
    pub created_at: String,
}

impl Payment {
    /// New pending payment row for an order
    pub fn pending(
        order_id: impl Into<String>,
        owner_id: impl Into<String>,
        method: PaymentMethod,
        amount: f64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            order_id: order_id.into(),
            owner_id: owner_id.into(),
            payment_method: method,
            amount,
            currency: currency.into(),
            status: PaymentStatus::Pending,
            transaction_id: None,
            payment_intent_id: None,
            paypal_order_id: None,
            paypal_capture_id: None,
            failure_reason: None,
            processed_at: None,
            refunded_at: None,
            refunded_amount: None,
            created_at: now_rfc3339(),
        }
    }
}

/// Merge payload for reconciliation updates
///
/// 只携带对账会改动的字段，不回写 id / orderId 等不可变字段。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paypal_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paypal_capture_id: Option<String>,
    /// 总是写回：失败后重试成功时要把旧的失败原因清掉
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_amount: Option<f64>,
}

impl From<&Payment> for PaymentUpdate {
    fn from(payment: &Payment) -> Self {
        Self {
            status: payment.status,
            transaction_id: payment.transaction_id.clone(),
            payment_intent_id: payment.payment_intent_id.clone(),
            paypal_order_id: payment.paypal_order_id.clone(),
            paypal_capture_id: payment.paypal_capture_id.clone(),
            failure_reason: payment.failure_reason.clone(),
            processed_at: payment.processed_at.clone(),
            refunded_at: payment.refunded_at.clone(),
            refunded_amount: payment.refunded_amount,
        }
    }
}

// =============================================================================
// API Request/Response Types
// =============================================================================

/// Create payment payload (both providers)
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    #[validate(length(min = 1))]
    pub order_id: String,
    #[validate(range(min = 0.01))]
    pub amount: f64,
    #[validate(length(equal = 3))]
    pub currency: String,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

/// Confirm payment payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: Option<String>,
    pub paypal_order_id: Option<String>,
}

/// Refund payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    /// Full refund when unspecified
    pub amount: Option<f64>,
}

/// Response for Stripe payment creation — client drives the payment sheet
/// with the intent's client secret
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StripePaymentCreated {
    pub payment_id: String,
    pub client_secret: String,
    pub payment_intent_id: String,
    pub amount: f64,
    pub currency: String,
}

/// Response for PayPal payment creation — client redirects to the approval URL
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayPalPaymentCreated {
    pub payment_id: String,
    pub paypal_order_id: String,
    pub approval_url: String,
    pub amount: f64,
    pub currency: String,
}

/// Response for confirm/refund operations
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub amount: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}
