//! PayPal Provider
//!
//! OAuth2 client-credentials 换 access token，Orders v2 创建/捕获，
//! Captures API 退款。金额是字符串，固定两位小数。

use super::provider::{CreateContext, PaymentProvider, ProviderOutcome, ProviderPayment, ProviderRefund};
use crate::db::models::{Payment, PaymentMethod, PaymentStatus};
use crate::money;
use crate::utils::{AppError, AppResult};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const SANDBOX_API_BASE: &str = "https://api-m.sandbox.paypal.com";

pub struct PayPalProvider {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    base_url: String,
}

impl PayPalProvider {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> AppResult<Self> {
        Self::with_base_url(client_id, client_secret, SANDBOX_API_BASE)
    }

    pub fn with_base_url(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: base_url.into(),
        })
    }

    /// Fetch a short-lived bearer token
    async fn access_token(&self) -> AppResult<String> {
        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.client_id, self.client_secret));

        let resp = self
            .client
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .header("Authorization", format!("Basic {credentials}"))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| AppError::internal(format!("PayPal connection failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(paypal_error(resp, "PayPal authentication").await);
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AppError::internal(format!("Invalid PayPal response: {e}")))?;
        Ok(token.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct PayPalOrder {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    links: Vec<PayPalLink>,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Deserialize)]
struct PayPalLink {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    #[serde(default)]
    payments: Option<UnitPayments>,
}

#[derive(Debug, Deserialize)]
struct UnitPayments {
    #[serde(default)]
    captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
struct Capture {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PayPalRefund {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PayPalErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// PayPal amounts are fixed-point strings
fn format_amount(amount: f64) -> String {
    format!("{:.2}", money::round2(amount))
}

/// The buyer-facing approval link out of a HATEOAS link set
fn approval_link(links: &[PayPalLink]) -> Option<&str> {
    links
        .iter()
        .find(|l| l.rel == "approve" || l.rel == "payer-action")
        .map(|l| l.href.as_str())
}

async fn paypal_error(resp: reqwest::Response, action: &str) -> AppError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<PayPalErrorEnvelope>(&body)
        .ok()
        .and_then(|e| e.message.or(e.error_description))
        .unwrap_or_else(|| format!("HTTP {status}"));
    AppError::validation(format!("{action} failed: {message}"))
}

#[async_trait]
impl PaymentProvider for PayPalProvider {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Paypal
    }

    async fn create(
        &self,
        amount: f64,
        currency: &str,
        ctx: &CreateContext,
    ) -> AppResult<ProviderPayment> {
        let token = self.access_token().await?;

        let mut body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": ctx.order_id,
                "custom_id": ctx.order_number,
                "amount": {
                    "currency_code": currency.to_uppercase(),
                    "value": format_amount(amount),
                },
            }],
        });
        if ctx.success_url.is_some() || ctx.cancel_url.is_some() {
            body["application_context"] = json!({
                "return_url": ctx.success_url,
                "cancel_url": ctx.cancel_url,
            });
        }

        let resp = self
            .client
            .post(format!("{}/v2/checkout/orders", self.base_url))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::internal(format!("PayPal connection failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(paypal_error(resp, "PayPal payment creation").await);
        }

        let order: PayPalOrder = resp
            .json()
            .await
            .map_err(|e| AppError::internal(format!("Invalid PayPal response: {e}")))?;
        let approval_url = approval_link(&order.links)
            .map(str::to_string)
            .ok_or_else(|| AppError::internal("PayPal did not return an approval link"))?;

        Ok(ProviderPayment {
            provider_ref: order.id,
            client_secret: None,
            approval_url: Some(approval_url),
        })
    }

    /// Capture the approved order
    async fn confirm(&self, provider_ref: &str) -> AppResult<ProviderOutcome> {
        let token = self.access_token().await?;

        let resp = self
            .client
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.base_url, provider_ref
            ))
            .bearer_auth(&token)
            .header("Content-Type", "application/json")
            .body("{}")
            .send()
            .await
            .map_err(|e| AppError::internal(format!("PayPal connection failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(paypal_error(resp, "PayPal payment capture").await);
        }

        let order: PayPalOrder = resp
            .json()
            .await
            .map_err(|e| AppError::internal(format!("Invalid PayPal response: {e}")))?;

        if order.status == "COMPLETED" {
            let capture_id = order
                .purchase_units
                .first()
                .and_then(|u| u.payments.as_ref())
                .and_then(|p| p.captures.first())
                .map(|c| c.id.clone());
            Ok(ProviderOutcome {
                status: PaymentStatus::Completed,
                transaction_id: capture_id,
                failure_reason: None,
            })
        } else {
            Ok(ProviderOutcome {
                status: PaymentStatus::Failed,
                transaction_id: None,
                failure_reason: Some(format!("PayPal capture status: {}", order.status)),
            })
        }
    }

    async fn refund(&self, payment: &Payment, amount: Option<f64>) -> AppResult<ProviderRefund> {
        let capture_id = payment
            .paypal_capture_id
            .as_deref()
            .ok_or_else(|| AppError::validation("Payment has no PayPal capture"))?;
        let token = self.access_token().await?;

        let mut request = self
            .client
            .post(format!(
                "{}/v2/payments/captures/{}/refund",
                self.base_url, capture_id
            ))
            .bearer_auth(&token);
        request = match amount {
            Some(partial) => request.json(&json!({
                "amount": {
                    "currency_code": payment.currency.to_uppercase(),
                    "value": format_amount(partial),
                }
            })),
            // 空对象 = 全额退款
            None => request
                .header("Content-Type", "application/json")
                .body("{}"),
        };

        let resp = request
            .send()
            .await
            .map_err(|e| AppError::internal(format!("PayPal connection failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(paypal_error(resp, "PayPal refund").await);
        }

        let refund: PayPalRefund = resp
            .json()
            .await
            .map_err(|e| AppError::internal(format!("Invalid PayPal response: {e}")))?;
        Ok(ProviderRefund {
            refund_id: refund.id,
        })
    }
}
