//! Payment Reconciliation Service
//!
//! 本地 Payment 记录是对账的真相源：创建时落 pending 行并记下
//! provider 关联 id，confirm/webhook 按关联 id 反查本地记录再改状态。
//! 支付完成**不**自动推进订单状态，订单由管理端独立确认。

use super::provider::{CreateContext, ProviderOutcome, SharedProvider};
use super::stripe::{StripeEvent, StripeWebhook};
use crate::db::models::{
    CreatePaymentRequest, Order, PayPalPaymentCreated, Payment, PaymentMethod, PaymentResult,
    PaymentStatus, RefundRequest, StripePaymentCreated,
};
use crate::db::repository::{OrderRepository, PaymentRepository};
use crate::money;
use crate::utils::time::now_rfc3339;
use crate::utils::{AppError, AppResult};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use validator::Validate;

#[derive(Clone)]
pub struct PaymentService {
    payments: PaymentRepository,
    orders: OrderRepository,
    stripe: SharedProvider,
    paypal: SharedProvider,
    webhook: StripeWebhook,
}

impl PaymentService {
    pub fn new(
        db: Surreal<Db>,
        stripe: SharedProvider,
        paypal: SharedProvider,
        webhook: StripeWebhook,
    ) -> Self {
        Self {
            payments: PaymentRepository::new(db.clone()),
            orders: OrderRepository::new(db),
            stripe,
            paypal,
            webhook,
        }
    }

    fn provider(&self, method: PaymentMethod) -> &SharedProvider {
        match method {
            PaymentMethod::Stripe => &self.stripe,
            PaymentMethod::Paypal => &self.paypal,
        }
    }

    // =========================================================================
    // Create
    // =========================================================================

    pub async fn create_stripe_payment(
        &self,
        owner_id: &str,
        request: CreatePaymentRequest,
    ) -> AppResult<StripePaymentCreated> {
        let (payment, handle) = self
            .create_payment(owner_id, PaymentMethod::Stripe, request)
            .await?;
        let client_secret = handle
            .client_secret
            .ok_or_else(|| AppError::internal("Stripe did not return a client secret"))?;
        Ok(StripePaymentCreated {
            payment_id: payment_id_string(&payment),
            client_secret,
            payment_intent_id: handle.provider_ref,
            amount: payment.amount,
            currency: payment.currency,
        })
    }

    pub async fn create_paypal_payment(
        &self,
        owner_id: &str,
        request: CreatePaymentRequest,
    ) -> AppResult<PayPalPaymentCreated> {
        let (payment, handle) = self
            .create_payment(owner_id, PaymentMethod::Paypal, request)
            .await?;
        let approval_url = handle
            .approval_url
            .ok_or_else(|| AppError::internal("PayPal did not return an approval link"))?;
        Ok(PayPalPaymentCreated {
            payment_id: payment_id_string(&payment),
            paypal_order_id: handle.provider_ref,
            approval_url,
            amount: payment.amount,
            currency: payment.currency,
        })
    }

    /// Register with the provider, then persist the pending row with the
    /// provider's correlation id
    async fn create_payment(
        &self,
        owner_id: &str,
        method: PaymentMethod,
        request: CreatePaymentRequest,
    ) -> AppResult<(Payment, super::provider::ProviderPayment)> {
        request.validate()?;
        let order = self.owned_order(&request.order_id, owner_id).await?;

        // 金额必须与订单应付一致，防止客户端改价
        if money::round2(request.amount) != order.total_amount {
            return Err(AppError::validation(
                "Payment amount does not match order total",
            ));
        }

        let ctx = CreateContext {
            order_id: request.order_id.clone(),
            order_number: order.order_number.clone(),
            success_url: request.success_url.clone(),
            cancel_url: request.cancel_url.clone(),
        };
        let handle = self
            .provider(method)
            .create(request.amount, &request.currency, &ctx)
            .await?;

        let mut payment = Payment::pending(
            request.order_id,
            owner_id,
            method,
            money::round2(request.amount),
            request.currency.to_lowercase(),
        );
        match method {
            PaymentMethod::Stripe => payment.payment_intent_id = Some(handle.provider_ref.clone()),
            PaymentMethod::Paypal => payment.paypal_order_id = Some(handle.provider_ref.clone()),
        }

        let created = self.payments.create(payment).await?;
        tracing::info!(
            order_number = %order.order_number,
            method = method.as_str(),
            provider_ref = %handle.provider_ref,
            "Payment created"
        );
        Ok((created, handle))
    }

    async fn owned_order(&self, order_id: &str, owner_id: &str) -> AppResult<Order> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order with ID {order_id} not found")))?;
        if order.owner_id != owner_id {
            return Err(AppError::not_found(format!(
                "Order with ID {order_id} not found"
            )));
        }
        Ok(order)
    }

    // =========================================================================
    // Confirm
    // =========================================================================

    pub async fn confirm_stripe(&self, payment_intent_id: &str) -> AppResult<PaymentResult> {
        let payment = self
            .payments
            .find_by_intent_id(payment_intent_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Payment not found for this payment intent")
            })?;

        let outcome = self.stripe.confirm(payment_intent_id).await?;
        let updated = self.apply_outcome(payment, outcome).await?;
        Ok(result_of(&updated))
    }

    pub async fn confirm_paypal(&self, paypal_order_id: &str) -> AppResult<PaymentResult> {
        let payment = self
            .payments
            .find_by_paypal_order_id(paypal_order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Payment not found for this PayPal order"))?;

        let outcome = self.paypal.confirm(paypal_order_id).await?;
        let mut payment = payment;
        if outcome.status == PaymentStatus::Completed {
            payment.paypal_capture_id = outcome.transaction_id.clone();
        }
        let updated = self.apply_outcome(payment, outcome).await?;
        Ok(result_of(&updated))
    }

    // =========================================================================
    // Refund
    // =========================================================================

    /// Refund a completed payment, at most once
    pub async fn refund(&self, payment_id: &str, request: RefundRequest) -> AppResult<PaymentResult> {
        let mut payment = self
            .payments
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Payment with ID {payment_id} not found"))
            })?;

        if payment.status == PaymentStatus::Refunded {
            return Err(AppError::business_rule("Payment has already been refunded"));
        }
        if payment.status != PaymentStatus::Completed {
            return Err(AppError::business_rule(
                "Only completed payments can be refunded",
            ));
        }
        if let Some(partial) = request.amount {
            if partial <= 0.0 || money::round2(partial) > payment.amount {
                return Err(AppError::validation(
                    "Refund amount must be positive and within the payment amount",
                ));
            }
        }

        let receipt = self
            .provider(payment.payment_method)
            .refund(&payment, request.amount)
            .await?;

        payment.status = PaymentStatus::Refunded;
        payment.refunded_at = Some(now_rfc3339());
        payment.refunded_amount = Some(money::round2(request.amount.unwrap_or(payment.amount)));
        let updated = self.payments.update(&payment).await?;
        tracing::info!(
            payment = %payment_id_string(&updated),
            refund = %receipt.refund_id,
            "Payment refunded"
        );
        Ok(result_of(&updated))
    }

    // =========================================================================
    // Webhook
    // =========================================================================

    /// Verify and apply a Stripe webhook; returns the event type
    ///
    /// 未知 intent 只告警不报错，避免服务商无限重投。
    pub async fn process_stripe_webhook(
        &self,
        signature_header: &str,
        payload: &[u8],
    ) -> AppResult<String> {
        let event = self.webhook.verify_and_parse(payload, signature_header)?;
        let outcome = match event.event_type.as_str() {
            "payment_intent.succeeded" => ProviderOutcome {
                status: PaymentStatus::Completed,
                transaction_id: event.data.object.latest_charge.clone(),
                failure_reason: None,
            },
            "payment_intent.payment_failed" => ProviderOutcome {
                status: PaymentStatus::Failed,
                transaction_id: None,
                failure_reason: Some(event_failure_reason(&event)),
            },
            "payment_intent.canceled" => ProviderOutcome {
                status: PaymentStatus::Cancelled,
                transaction_id: None,
                failure_reason: Some("Payment cancelled".to_string()),
            },
            other => {
                tracing::debug!(event_type = other, "Ignoring unhandled webhook event");
                return Ok(event.event_type);
            }
        };

        let intent_id = &event.data.object.id;
        match self.payments.find_by_intent_id(intent_id).await? {
            Some(payment) => {
                self.apply_outcome(payment, outcome).await?;
            }
            None => {
                tracing::warn!(intent = %intent_id, "Webhook for unknown payment intent");
            }
        }
        Ok(event.event_type)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn find_by_id(&self, payment_id: &str) -> AppResult<Payment> {
        self.payments.find_by_id(payment_id).await?.ok_or_else(|| {
            AppError::not_found(format!("Payment with ID {payment_id} not found"))
        })
    }

    pub async fn list_by_owner(&self, owner_id: &str) -> AppResult<Vec<Payment>> {
        Ok(self.payments.list_by_owner(owner_id).await?)
    }

    pub async fn list_by_order(&self, order_id: &str) -> AppResult<Vec<Payment>> {
        Ok(self.payments.list_by_order(order_id).await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Write a provider outcome onto the local row; refunded rows are final
    async fn apply_outcome(
        &self,
        mut payment: Payment,
        outcome: ProviderOutcome,
    ) -> AppResult<Payment> {
        if payment.status == PaymentStatus::Refunded {
            tracing::warn!(
                payment = %payment_id_string(&payment),
                "Ignoring provider outcome for refunded payment"
            );
            return Ok(payment);
        }

        payment.status = outcome.status;
        if outcome.transaction_id.is_some() {
            payment.transaction_id = outcome.transaction_id;
        }
        payment.failure_reason = outcome.failure_reason;
        if payment.status == PaymentStatus::Completed && payment.processed_at.is_none() {
            payment.processed_at = Some(now_rfc3339());
        }

        let updated = self.payments.update(&payment).await?;
        tracing::info!(
            payment = %payment_id_string(&updated),
            status = ?updated.status,
            "Payment status updated"
        );
        Ok(updated)
    }
}

fn payment_id_string(payment: &Payment) -> String {
    payment
        .id
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_default()
}

fn result_of(payment: &Payment) -> PaymentResult {
    PaymentResult {
        payment_id: payment_id_string(payment),
        status: payment.status,
        amount: payment.amount,
        currency: payment.currency.clone(),
        transaction_id: payment.transaction_id.clone(),
    }
}

fn event_failure_reason(event: &StripeEvent) -> String {
    event
        .data
        .object
        .last_payment_error
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| "Payment method required".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CartItem, OrderStatus, ShippingAddress};
    use crate::payments::provider::{PaymentProvider, ProviderPayment, ProviderRefund};
    use async_trait::async_trait;
    use ring::hmac;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use surrealdb::engine::local::Mem;

    const WEBHOOK_SECRET: &str = "whsec_test";

    /// Scripted provider: fixed refs, configurable confirm outcome
    struct FakeProvider {
        method: PaymentMethod,
        confirm_status: PaymentStatus,
        refund_calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new(method: PaymentMethod, confirm_status: PaymentStatus) -> Arc<Self> {
            Arc::new(Self {
                method,
                confirm_status,
                refund_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PaymentProvider for FakeProvider {
        fn method(&self) -> PaymentMethod {
            self.method
        }

        async fn create(
            &self,
            _amount: f64,
            _currency: &str,
            ctx: &CreateContext,
        ) -> AppResult<ProviderPayment> {
            match self.method {
                PaymentMethod::Stripe => Ok(ProviderPayment {
                    provider_ref: format!("pi_{}", ctx.order_number),
                    client_secret: Some("cs_test_secret".into()),
                    approval_url: None,
                }),
                PaymentMethod::Paypal => Ok(ProviderPayment {
                    provider_ref: format!("PAY-{}", ctx.order_number),
                    client_secret: None,
                    approval_url: Some("https://paypal.example/approve".into()),
                }),
            }
        }

        async fn confirm(&self, _provider_ref: &str) -> AppResult<ProviderOutcome> {
            Ok(ProviderOutcome {
                status: self.confirm_status,
                transaction_id: match self.confirm_status {
                    PaymentStatus::Completed => Some("txn_1".into()),
                    _ => None,
                },
                failure_reason: match self.confirm_status {
                    PaymentStatus::Failed => Some("Payment method required".into()),
                    _ => None,
                },
            })
        }

        async fn refund(
            &self,
            _payment: &Payment,
            _amount: Option<f64>,
        ) -> AppResult<ProviderRefund> {
            self.refund_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ProviderRefund {
                refund_id: "re_1".into(),
            })
        }
    }

    async fn service_with(
        stripe: Arc<FakeProvider>,
        paypal: Arc<FakeProvider>,
    ) -> (PaymentService, OrderRepository) {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        crate::db::DbService::from_db(db.clone()).await.unwrap();
        let orders = OrderRepository::new(db.clone());
        let service = PaymentService::new(
            db,
            stripe,
            paypal,
            StripeWebhook::new(WEBHOOK_SECRET),
        );
        (service, orders)
    }

    async fn seed_order(orders: &OrderRepository, number: &str, owner: &str, total: f64) -> String {
        let now = now_rfc3339();
        let order = Order {
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
        };
        let created = orders.create(order).await.unwrap();
        created.id.unwrap().to_string()
    }

    fn create_request(order_id: &str, amount: f64) -> CreatePaymentRequest {
        CreatePaymentRequest {
            order_id: order_id.to_string(),
            amount,
            currency: "usd".into(),
            success_url: Some("https://shop.example/ok".into()),
            cancel_url: Some("https://shop.example/cancel".into()),
        }
    }

    fn sign_webhook(payload: &[u8]) -> String {
        let timestamp = crate::utils::time::now_millis() / 1000;
        let key = hmac::Key::new(hmac::HMAC_SHA256, WEBHOOK_SECRET.as_bytes());
        let mut signed = timestamp.to_string().into_bytes();
        signed.push(b'.');
        signed.extend_from_slice(payload);
        let tag = hmac::sign(&key, &signed);
        format!("t={timestamp},v1={}", hex::encode(tag.as_ref()))
    }

    #[tokio::test]
    async fn stripe_create_persists_pending_row() {
        let stripe = FakeProvider::new(PaymentMethod::Stripe, PaymentStatus::Completed);
        let paypal = FakeProvider::new(PaymentMethod::Paypal, PaymentStatus::Completed);
        let (service, orders) = service_with(stripe, paypal).await;
        let order_id = seed_order(&orders, "ORD-1-001", "u1", 76.0).await;

        let created = service
            .create_stripe_payment("u1", create_request(&order_id, 76.0))
            .await
            .unwrap();
        assert_eq!(created.payment_intent_id, "pi_ORD-1-001");
        assert_eq!(created.client_secret, "cs_test_secret");
        assert_eq!(created.amount, 76.0);

        let stored = service.find_by_id(&created.payment_id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
        assert_eq!(stored.payment_intent_id.as_deref(), Some("pi_ORD-1-001"));
        assert_eq!(stored.owner_id, "u1");
    }

    #[tokio::test]
    async fn amount_mismatch_is_rejected_before_provider_call() {
        let stripe = FakeProvider::new(PaymentMethod::Stripe, PaymentStatus::Completed);
        let paypal = FakeProvider::new(PaymentMethod::Paypal, PaymentStatus::Completed);
        let (service, orders) = service_with(stripe, paypal).await;
        let order_id = seed_order(&orders, "ORD-2-001", "u1", 76.0).await;

        let err = service
            .create_stripe_payment("u1", create_request(&order_id, 10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn foreign_order_reads_as_missing() {
        let stripe = FakeProvider::new(PaymentMethod::Stripe, PaymentStatus::Completed);
        let paypal = FakeProvider::new(PaymentMethod::Paypal, PaymentStatus::Completed);
        let (service, orders) = service_with(stripe, paypal).await;
        let order_id = seed_order(&orders, "ORD-3-001", "u1", 76.0).await;

        let err = service
            .create_stripe_payment("u2", create_request(&order_id, 76.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn confirm_stripe_completes_payment() {
        let stripe = FakeProvider::new(PaymentMethod::Stripe, PaymentStatus::Completed);
        let paypal = FakeProvider::new(PaymentMethod::Paypal, PaymentStatus::Completed);
        let (service, orders) = service_with(stripe, paypal).await;
        let order_id = seed_order(&orders, "ORD-4-001", "u1", 76.0).await;

        service
            .create_stripe_payment("u1", create_request(&order_id, 76.0))
            .await
            .unwrap();

        let result = service.confirm_stripe("pi_ORD-4-001").await.unwrap();
        assert_eq!(result.status, PaymentStatus::Completed);
        assert_eq!(result.transaction_id.as_deref(), Some("txn_1"));

        let stored = service.find_by_id(&result.payment_id).await.unwrap();
        assert!(stored.processed_at.is_some());
    }

    #[tokio::test]
    async fn confirm_unknown_intent_is_not_found() {
        let stripe = FakeProvider::new(PaymentMethod::Stripe, PaymentStatus::Completed);
        let paypal = FakeProvider::new(PaymentMethod::Paypal, PaymentStatus::Completed);
        let (service, _) = service_with(stripe, paypal).await;

        let err = service.confirm_stripe("pi_nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn confirm_paypal_records_capture_id() {
        let stripe = FakeProvider::new(PaymentMethod::Stripe, PaymentStatus::Completed);
        let paypal = FakeProvider::new(PaymentMethod::Paypal, PaymentStatus::Completed);
        let (service, orders) = service_with(stripe, paypal).await;
        let order_id = seed_order(&orders, "ORD-5-001", "u1", 76.0).await;

        service
            .create_paypal_payment("u1", create_request(&order_id, 76.0))
            .await
            .unwrap();

        let result = service.confirm_paypal("PAY-ORD-5-001").await.unwrap();
        assert_eq!(result.status, PaymentStatus::Completed);

        let stored = service.find_by_id(&result.payment_id).await.unwrap();
        assert_eq!(stored.paypal_capture_id.as_deref(), Some("txn_1"));
    }

    #[tokio::test]
    async fn refund_happens_at_most_once() {
        let stripe = FakeProvider::new(PaymentMethod::Stripe, PaymentStatus::Completed);
        let paypal = FakeProvider::new(PaymentMethod::Paypal, PaymentStatus::Completed);
        let (service, orders) = service_with(stripe.clone(), paypal).await;
        let order_id = seed_order(&orders, "ORD-6-001", "u1", 76.0).await;

        service
            .create_stripe_payment("u1", create_request(&order_id, 76.0))
            .await
            .unwrap();
        let confirmed = service.confirm_stripe("pi_ORD-6-001").await.unwrap();

        let refunded = service
            .refund(&confirmed.payment_id, RefundRequest { amount: None })
            .await
            .unwrap();
        assert_eq!(refunded.status, PaymentStatus::Refunded);

        let err = service
            .refund(&confirmed.payment_id, RefundRequest { amount: None })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert_eq!(stripe.refund_calls.load(Ordering::SeqCst), 1);

        let stored = service.find_by_id(&confirmed.payment_id).await.unwrap();
        assert_eq!(stored.refunded_amount, Some(76.0));
        assert!(stored.refunded_at.is_some());
    }

    #[tokio::test]
    async fn pending_payment_cannot_be_refunded() {
        let stripe = FakeProvider::new(PaymentMethod::Stripe, PaymentStatus::Completed);
        let paypal = FakeProvider::new(PaymentMethod::Paypal, PaymentStatus::Completed);
        let (service, orders) = service_with(stripe, paypal).await;
        let order_id = seed_order(&orders, "ORD-7-001", "u1", 76.0).await;

        let created = service
            .create_stripe_payment("u1", create_request(&order_id, 76.0))
            .await
            .unwrap();

        let err = service
            .refund(&created.payment_id, RefundRequest { amount: None })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn webhook_completes_matching_payment() {
        let stripe = FakeProvider::new(PaymentMethod::Stripe, PaymentStatus::Completed);
        let paypal = FakeProvider::new(PaymentMethod::Paypal, PaymentStatus::Completed);
        let (service, orders) = service_with(stripe, paypal).await;
        let order_id = seed_order(&orders, "ORD-8-001", "u1", 76.0).await;

        let created = service
            .create_stripe_payment("u1", create_request(&order_id, 76.0))
            .await
            .unwrap();

        let payload = format!(
            r#"{{"type":"payment_intent.succeeded","data":{{"object":{{"id":"{}","latest_charge":"ch_9"}}}}}}"#,
            created.payment_intent_id
        );
        let header = sign_webhook(payload.as_bytes());
        let event_type = service
            .process_stripe_webhook(&header, payload.as_bytes())
            .await
            .unwrap();
        assert_eq!(event_type, "payment_intent.succeeded");

        let stored = service.find_by_id(&created.payment_id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Completed);
        assert_eq!(stored.transaction_id.as_deref(), Some("ch_9"));
    }

    #[tokio::test]
    async fn webhook_with_bad_signature_touches_nothing() {
        let stripe = FakeProvider::new(PaymentMethod::Stripe, PaymentStatus::Completed);
        let paypal = FakeProvider::new(PaymentMethod::Paypal, PaymentStatus::Completed);
        let (service, orders) = service_with(stripe, paypal).await;
        let order_id = seed_order(&orders, "ORD-9-001", "u1", 76.0).await;

        let created = service
            .create_stripe_payment("u1", create_request(&order_id, 76.0))
            .await
            .unwrap();

        let payload = format!(
            r#"{{"type":"payment_intent.succeeded","data":{{"object":{{"id":"{}"}}}}}}"#,
            created.payment_intent_id
        );
        let err = service
            .process_stripe_webhook("t=1,v1=deadbeef", payload.as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let stored = service.find_by_id(&created.payment_id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn webhook_failure_event_records_reason() {
        let stripe = FakeProvider::new(PaymentMethod::Stripe, PaymentStatus::Completed);
        let paypal = FakeProvider::new(PaymentMethod::Paypal, PaymentStatus::Completed);
        let (service, orders) = service_with(stripe, paypal).await;
        let order_id = seed_order(&orders, "ORD-10-001", "u1", 76.0).await;

        let created = service
            .create_stripe_payment("u1", create_request(&order_id, 76.0))
            .await
            .unwrap();

        let payload = format!(
            r#"{{"type":"payment_intent.payment_failed","data":{{"object":{{"id":"{}","last_payment_error":{{"message":"Your card was declined."}}}}}}}}"#,
            created.payment_intent_id
        );
        let header = sign_webhook(payload.as_bytes());
        service
            .process_stripe_webhook(&header, payload.as_bytes())
            .await
            .unwrap();

        let stored = service.find_by_id(&created.payment_id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Failed);
        assert_eq!(
            stored.failure_reason.as_deref(),
            Some("Your card was declined.")
        );
    }

    #[tokio::test]
    async fn listings_scope_by_owner_and_order() {
        let stripe = FakeProvider::new(PaymentMethod::Stripe, PaymentStatus::Completed);
        let paypal = FakeProvider::new(PaymentMethod::Paypal, PaymentStatus::Completed);
        let (service, orders) = service_with(stripe, paypal).await;
        let order_a = seed_order(&orders, "ORD-11-001", "u1", 76.0).await;
        let order_b = seed_order(&orders, "ORD-11-002", "u2", 76.0).await;

        service
            .create_stripe_payment("u1", create_request(&order_a, 76.0))
            .await
            .unwrap();
        service
            .create_paypal_payment("u2", create_request(&order_b, 76.0))
            .await
            .unwrap();

        let mine = service.list_by_owner("u1").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].payment_method, PaymentMethod::Stripe);

        let for_order = service.list_by_order(&order_b).await.unwrap();
        assert_eq!(for_order.len(), 1);
        assert_eq!(for_order[0].owner_id, "u2");
    }
}
