//! Stripe Provider
//!
//! Payment Intents API (form 编码，金额用最小货币单位) + Refunds API。
//! Webhook 签名是 `Stripe-Signature: t=<unix>,v1=<hmac-sha256-hex>`，
//! 签名串为 `{t}.{raw_body}`，带时间窗校验。

use super::provider::{CreateContext, PaymentProvider, ProviderOutcome, ProviderPayment, ProviderRefund};
use crate::db::models::{Payment, PaymentMethod, PaymentStatus};
use crate::money;
use crate::utils::time::now_millis;
use crate::utils::{AppError, AppResult};
use async_trait::async_trait;
use ring::hmac;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.stripe.com";
/// Webhook timestamp tolerance, matches Stripe's SDK default
const WEBHOOK_TOLERANCE_SECS: i64 = 300;

pub struct StripeProvider {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeProvider {
    pub fn new(secret_key: impl Into<String>) -> AppResult<Self> {
        Self::with_base_url(secret_key, DEFAULT_API_BASE)
    }

    pub fn with_base_url(
        secret_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            secret_key: secret_key.into(),
            base_url: base_url.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PaymentIntent {
    id: String,
    status: String,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    latest_charge: Option<String>,
    #[serde(default)]
    last_payment_error: Option<StripeErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Refund {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Map an intent's lifecycle status onto the local payment status
fn outcome_from_intent(intent: &PaymentIntent) -> ProviderOutcome {
    match intent.status.as_str() {
        "succeeded" => ProviderOutcome {
            status: PaymentStatus::Completed,
            transaction_id: intent.latest_charge.clone(),
            failure_reason: None,
        },
        "processing" => ProviderOutcome {
            status: PaymentStatus::Processing,
            transaction_id: None,
            failure_reason: None,
        },
        "requires_payment_method" => ProviderOutcome {
            status: PaymentStatus::Failed,
            transaction_id: None,
            failure_reason: Some(
                intent
                    .last_payment_error
                    .as_ref()
                    .and_then(|e| e.message.clone())
                    .unwrap_or_else(|| "Payment method required".to_string()),
            ),
        },
        "canceled" => ProviderOutcome {
            status: PaymentStatus::Cancelled,
            transaction_id: None,
            failure_reason: Some("Payment cancelled".to_string()),
        },
        // requires_action / requires_confirmation / requires_capture
        _ => ProviderOutcome {
            status: PaymentStatus::Pending,
            transaction_id: None,
            failure_reason: None,
        },
    }
}

/// Read a Stripe error body into a stable-prefixed message
async fn stripe_error(resp: reqwest::Response, action: &str) -> AppError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<StripeErrorEnvelope>(&body)
        .ok()
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| format!("HTTP {status}"));
    AppError::validation(format!("{action} failed: {message}"))
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Stripe
    }

    async fn create(
        &self,
        amount: f64,
        currency: &str,
        ctx: &CreateContext,
    ) -> AppResult<ProviderPayment> {
        let minor = money::to_minor_units(amount)?;
        let form: Vec<(&str, String)> = vec![
            ("amount", minor.to_string()),
            ("currency", currency.to_lowercase()),
            ("metadata[orderId]", ctx.order_id.clone()),
            ("metadata[orderNumber]", ctx.order_number.clone()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        let resp = self
            .client
            .post(format!("{}/v1/payment_intents", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::internal(format!("Stripe connection failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(stripe_error(resp, "Stripe payment creation").await);
        }

        let intent: PaymentIntent = resp
            .json()
            .await
            .map_err(|e| AppError::internal(format!("Invalid Stripe response: {e}")))?;
        Ok(ProviderPayment {
            provider_ref: intent.id,
            client_secret: intent.client_secret,
            approval_url: None,
        })
    }

    async fn confirm(&self, provider_ref: &str) -> AppResult<ProviderOutcome> {
        let resp = self
            .client
            .get(format!(
                "{}/v1/payment_intents/{}",
                self.base_url, provider_ref
            ))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::internal(format!("Stripe connection failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(stripe_error(resp, "Stripe payment confirmation").await);
        }

        let intent: PaymentIntent = resp
            .json()
            .await
            .map_err(|e| AppError::internal(format!("Invalid Stripe response: {e}")))?;
        Ok(outcome_from_intent(&intent))
    }

    async fn refund(&self, payment: &Payment, amount: Option<f64>) -> AppResult<ProviderRefund> {
        let intent_id = payment
            .payment_intent_id
            .as_deref()
            .ok_or_else(|| AppError::validation("Payment has no Stripe payment intent"))?;

        let mut form: Vec<(&str, String)> = vec![("payment_intent", intent_id.to_string())];
        if let Some(partial) = amount {
            form.push(("amount", money::to_minor_units(partial)?.to_string()));
        }

        let resp = self
            .client
            .post(format!("{}/v1/refunds", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::internal(format!("Stripe connection failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(stripe_error(resp, "Stripe refund").await);
        }

        let refund: Refund = resp
            .json()
            .await
            .map_err(|e| AppError::internal(format!("Invalid Stripe response: {e}")))?;
        Ok(ProviderRefund {
            refund_id: refund.id,
        })
    }
}

// =============================================================================
// Webhook verification
// =============================================================================

/// Webhook event payload, only the fields reconciliation needs
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: StripeEventObject,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventObject {
    /// Payment-intent id
    pub id: String,
    #[serde(default)]
    pub latest_charge: Option<String>,
    #[serde(default)]
    pub last_payment_error: Option<StripeEventError>,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventError {
    #[serde(default)]
    pub message: Option<String>,
}

/// Stripe-Signature header verifier
#[derive(Clone)]
pub struct StripeWebhook {
    secret: String,
    tolerance_secs: i64,
}

impl StripeWebhook {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs: WEBHOOK_TOLERANCE_SECS,
        }
    }

    /// Verify the signature header against the raw request body
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> AppResult<()> {
        let mut timestamp: Option<i64> = None;
        let mut candidates: Vec<&str> = Vec::new();
        for part in signature_header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse().ok(),
                Some(("v1", value)) => candidates.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| AppError::validation("Invalid webhook signature header"))?;
        if candidates.is_empty() {
            return Err(AppError::validation("Invalid webhook signature header"));
        }

        let now = now_millis() / 1000;
        if (now - timestamp).abs() > self.tolerance_secs {
            return Err(AppError::validation("Webhook timestamp outside tolerance"));
        }

        let key = hmac::Key::new(hmac::HMAC_SHA256, self.secret.as_bytes());
        let mut signed = timestamp.to_string().into_bytes();
        signed.push(b'.');
        signed.extend_from_slice(payload);

        let verified = candidates.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|sig| hmac::verify(&key, &signed, &sig).is_ok())
                .unwrap_or(false)
        });
        if verified {
            Ok(())
        } else {
            Err(AppError::validation("Invalid webhook signature"))
        }
    }

    /// Verify then decode the event body
    pub fn verify_and_parse(&self, payload: &[u8], signature_header: &str) -> AppResult<StripeEvent> {
        self.verify(payload, signature_header)?;
        serde_json::from_slice(payload)
            .map_err(|e| AppError::validation(format!("Invalid webhook payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
        let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
        let mut signed = timestamp.to_string().into_bytes();
        signed.push(b'.');
        signed.extend_from_slice(payload);
        let tag = hmac::sign(&key, &signed);
        format!("t={timestamp},v1={}", hex::encode(tag.as_ref()))
    }

    #[test]
    fn valid_signature_passes() {
        let webhook = StripeWebhook::new("whsec_test");
        let payload = br#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_1"}}}"#;
        let header = sign("whsec_test", now_millis() / 1000, payload);

        let event = webhook.verify_and_parse(payload, &header).unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.data.object.id, "pi_1");
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let webhook = StripeWebhook::new("whsec_test");
        let header = sign("whsec_test", now_millis() / 1000, b"{\"a\":1}");
        let err = webhook.verify(b"{\"a\":2}", &header).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let webhook = StripeWebhook::new("whsec_real");
        let payload = b"{}";
        let header = sign("whsec_other", now_millis() / 1000, payload);
        assert!(webhook.verify(payload, &header).is_err());
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let webhook = StripeWebhook::new("whsec_test");
        let payload = b"{}";
        let header = sign("whsec_test", now_millis() / 1000 - 3600, payload);
        let err = webhook.verify(payload, &header).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn malformed_header_is_rejected() {
        let webhook = StripeWebhook::new("whsec_test");
        assert!(webhook.verify(b"{}", "not-a-header").is_err());
        assert!(webhook.verify(b"{}", "t=123").is_err());
        assert!(webhook.verify(b"{}", "v1=deadbeef").is_err());
    }

    #[test]
    fn intent_status_mapping() {
        let intent = |status: &str| PaymentIntent {
            id: "pi_1".into(),
            status: status.into(),
            client_secret: None,
            latest_charge: Some("ch_1".into()),
            last_payment_error: None,
        };

        let done = outcome_from_intent(&intent("succeeded"));
        assert_eq!(done.status, PaymentStatus::Completed);
        assert_eq!(done.transaction_id.as_deref(), Some("ch_1"));

        let failed = outcome_from_intent(&intent("requires_payment_method"));
        assert_eq!(failed.status, PaymentStatus::Failed);
        assert_eq!(failed.failure_reason.as_deref(), Some("Payment method required"));

        let cancelled = outcome_from_intent(&intent("canceled"));
        assert_eq!(cancelled.status, PaymentStatus::Cancelled);

        assert_eq!(
            outcome_from_intent(&intent("processing")).status,
            PaymentStatus::Processing
        );
        assert_eq!(
            outcome_from_intent(&intent("requires_action")).status,
            PaymentStatus::Pending
        );
    }
}
