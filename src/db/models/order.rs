//! Order Model
//!
//! 订单在结算时从购物车快照生成，行项创建后不可变。
//! 状态机：pending → confirmed → processing → shipped → delivered，
//! pending → cancelled；delivered/cancelled 为终态。

use super::cart::CartItem;
use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use validator::Validate;

// =============================================================================
// Order Status (state machine)
// =============================================================================

/// Order status enum (wire-level lowercase strings)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether a transition from `self` to `next` is legal
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// Shipping address, embedded verbatim in the order
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub state: String,
    #[validate(length(min = 1))]
    pub zip_code: String,
    #[validate(length(min = 1))]
    pub country: String,
}

/// Order entity
///
/// `items` 是结算时购物车行项的深拷贝，订单创建后不再变动。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    /// Unique, generated at checkout (`ORD-<unixMillis>-<3-digit>`)
    pub order_number: String,
    /// User id or guest token that placed the order
    pub owner_id: String,
    pub items: Vec<CartItem>,
    pub shipping_address: ShippingAddress,
    pub subtotal: f64,
    pub shipping_cost: f64,
    pub tax: f64,
    /// subtotal + shippingCost + tax
    pub total_amount: f64,
    pub total_items: i32,
    pub status: OrderStatus,
    pub payment_method: String,
    pub payment_status: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// =============================================================================
// API Request Types
// =============================================================================

/// Checkout payload (authenticated users)
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate(nested)]
    pub shipping_address: ShippingAddress,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// Guest checkout payload
///
/// `user_id` is filled in by the upstream auth collaborator when the client
/// asked for an account during checkout; the new order is then owned by that
/// user and the guest cart is merged away.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GuestCheckoutRequest {
    #[validate(nested)]
    pub shipping_address: ShippingAddress,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub user_id: Option<String>,
}

/// Admin status-update payload
///
/// 非法状态迁移默认被拒绝；`force = true` 保留原始设计中
/// 管理员无条件覆盖的逃生通道。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    pub payment_status: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub force: bool,
}

/// Order list query parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOrdersRequest {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<String>,
    /// Case-insensitive substring match on orderNumber
    pub order_number: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

// =============================================================================
// API Response Types
// =============================================================================

/// Pagination envelope used by every order list endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

/// Aggregate order statistics, optionally scoped to one owner
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: u64,
    pub total_revenue: f64,
    pub average_order_value: f64,
    pub pending_orders: u64,
    pub confirmed_orders: u64,
    pub delivered_orders: u64,
    pub cancelled_orders: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));

        // No transitions out of terminal states
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Confirmed));

        // No skipping forward, no cancelling late
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Confirmed.can_transition_to(Cancelled));
        assert!(!Shipped.can_transition_to(Cancelled));
    }

    #[test]
    fn status_wire_format_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Pending).unwrap(),
            "\"pending\""
        );
        let parsed: OrderStatus = serde_json::from_str("\"delivered\"").unwrap();
        assert_eq!(parsed, OrderStatus::Delivered);
    }
}
