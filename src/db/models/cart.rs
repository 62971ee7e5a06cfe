//! Cart Model
//!
//! 购物车按身份 (用户 ID 或游客令牌) 唯一，行项按商品去重。
//! 单价在加入购物车时快照，不随商品目录变动。

use super::serde_helpers;
use crate::money;
use crate::utils::time::now_rfc3339;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use validator::Validate;

/// One cart line — at most one per distinct product id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub product_name: String,
    /// Unit price snapshotted at add time
    pub product_price: f64,
    pub product_thumbnail: String,
    pub quantity: i32,
    /// productPrice × quantity
    pub total_price: f64,
}

/// Cart entity — one per identity (registered user or guest token)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    /// User id or guest token (unique index)
    pub owner_id: String,
    pub items: Vec<CartItem>,
    /// Σ items[i].totalPrice
    pub total_amount: f64,
    /// Σ items[i].quantity
    pub total_items: i32,
    /// Optimistic-concurrency counter, bumped on every save
    #[serde(default)]
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Cart {
    /// New empty cart for an identity
    pub fn empty(owner_id: impl Into<String>) -> Self {
        let now = now_rfc3339();
        Self {
            id: None,
            owner_id: owner_id.into(),
            items: Vec::new(),
            total_amount: 0.0,
            total_items: 0,
            version: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Recompute totalAmount/totalItems from the lines
    pub fn recalculate_totals(&mut self) {
        self.total_amount = money::sum(self.items.iter().map(|i| i.total_price));
        self.total_items = self.items.iter().map(|i| i.quantity).sum();
        self.updated_at = now_rfc3339();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Position of the line for a product, if present
    pub fn find_item(&self, product_id: &str) -> Option<usize> {
        self.items.iter().position(|i| i.product_id == product_id)
    }
}

// =============================================================================
// API Request Types
// =============================================================================

/// Add product to cart payload
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// Update cart line quantity payload
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// Merge guest cart into user cart payload
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MergeCartRequest {
    #[validate(length(min = 1))]
    pub user_id: String,
}

/// Item-count response (non-failing read)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemCount {
    pub count: i32,
}
