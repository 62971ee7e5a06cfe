//! Payments Module
//!
//! 支付对账：本地 Payment 记录 + 支付服务商 (Stripe / PayPal)。
//! 服务商操作统一在 [`PaymentProvider`] 策略后面，按支付方式选择实现。
//! Payment 状态与订单状态独立，不做自动联动。

mod paypal;
mod provider;
mod service;
mod stripe;

pub use paypal::PayPalProvider;
pub use provider::{
    CreateContext, PaymentProvider, ProviderOutcome, ProviderPayment, ProviderRefund,
    SharedProvider,
};
pub use service::PaymentService;
pub use stripe::{StripeProvider, StripeWebhook};
