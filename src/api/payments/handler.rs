//! Payments API Handlers
//!
//! 创建/确认对用户和游客一视同仁 ([`Identity`])，订单归属在服务层校验。
//! webhook 用原始字节验签，任何包装都会破坏签名。

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use serde_json::{Value, json};
use validator::Validate;

use crate::api::identity::Identity;
use crate::core::ServerState;
use crate::db::models::{
    ConfirmPaymentRequest, CreatePaymentRequest, PayPalPaymentCreated, Payment, PaymentResult,
    RefundRequest, StripePaymentCreated,
};
use crate::utils::{AppError, AppResult};

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /api/payments/stripe/create - 创建 Stripe 支付
pub async fn create_stripe(
    State(state): State<ServerState>,
    identity: Identity,
    Json(payload): Json<CreatePaymentRequest>,
) -> AppResult<Json<StripePaymentCreated>> {
    payload.validate()?;
    let created = state
        .payments
        .create_stripe_payment(&identity.id, payload)
        .await?;
    Ok(Json(created))
}

/// POST /api/payments/stripe/confirm - 确认 Stripe 支付
pub async fn confirm_stripe(
    State(state): State<ServerState>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> AppResult<Json<PaymentResult>> {
    let intent_id = payload
        .payment_intent_id
        .as_deref()
        .ok_or_else(|| AppError::validation("paymentIntentId is required"))?;
    Ok(Json(state.payments.confirm_stripe(intent_id).await?))
}

/// POST /api/payments/paypal/create - 创建 PayPal 支付
pub async fn create_paypal(
    State(state): State<ServerState>,
    identity: Identity,
    Json(payload): Json<CreatePaymentRequest>,
) -> AppResult<Json<PayPalPaymentCreated>> {
    payload.validate()?;
    let created = state
        .payments
        .create_paypal_payment(&identity.id, payload)
        .await?;
    Ok(Json(created))
}

/// POST /api/payments/paypal/confirm - 捕获 PayPal 订单
pub async fn confirm_paypal(
    State(state): State<ServerState>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> AppResult<Json<PaymentResult>> {
    let paypal_order_id = payload
        .paypal_order_id
        .as_deref()
        .ok_or_else(|| AppError::validation("paypalOrderId is required"))?;
    Ok(Json(state.payments.confirm_paypal(paypal_order_id).await?))
}

/// POST /api/payments/webhook/stripe - Stripe webhook 入口
///
/// 验签失败整个调用失败 (400)，不触碰任何 Payment 记录。
pub async fn stripe_webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::validation("Missing Stripe-Signature header"))?;

    let event_type = state
        .payments
        .process_stripe_webhook(signature, &body)
        .await?;
    Ok(Json(json!({ "received": true, "type": event_type })))
}

/// POST /api/payments/:id/refund - 退款 (管理端，completed 且至多一次)
pub async fn refund(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<RefundRequest>,
) -> AppResult<Json<PaymentResult>> {
    Ok(Json(state.payments.refund(&id, payload).await?))
}

/// GET /api/payments/my - 当前身份的支付记录
pub async fn list_my(
    State(state): State<ServerState>,
    identity: Identity,
) -> AppResult<Json<Vec<Payment>>> {
    Ok(Json(state.payments.list_by_owner(&identity.id).await?))
}

/// GET /api/payments/order/:order_id - 某订单的支付记录 (仅限本人订单)
pub async fn list_by_order(
    State(state): State<ServerState>,
    identity: Identity,
    Path(order_id): Path<String>,
) -> AppResult<Json<Vec<Payment>>> {
    // 归属校验：别人的订单读起来就像不存在；游客凭令牌同样可查
    state.orders.find_for_owner(&order_id, &identity.id).await?;
    Ok(Json(state.payments.list_by_order(&order_id).await?))
}
