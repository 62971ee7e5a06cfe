//! Orders Module
//!
//! - [`checkout`] - 购物车 → 订单的定价与落库
//! - [`service`] - 订单查询、状态机与统计

mod checkout;
mod service;

pub use checkout::{CheckoutEngine, PricingPolicy};
pub use service::OrderService;
