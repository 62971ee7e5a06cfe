//! Data Models
//!
//! 持久化实体与 API 载荷。所有 wire 字段使用 camelCase。

pub mod cart;
pub mod order;
pub mod payment;
pub mod serde_helpers;

pub use cart::{AddToCartRequest, Cart, CartItem, CartItemCount, MergeCartRequest, UpdateCartItemRequest};
pub use order::{
    CheckoutRequest, GuestCheckoutRequest, Order, OrderPage, OrderStats, OrderStatus,
    QueryOrdersRequest, ShippingAddress, UpdateOrderStatusRequest,
};
pub use payment::{
    ConfirmPaymentRequest, CreatePaymentRequest, PayPalPaymentCreated, Payment, PaymentMethod,
    PaymentResult, PaymentStatus, PaymentUpdate, RefundRequest, StripePaymentCreated,
};
