//! Product Catalog Gateway
//!
//! 商品目录是外部协作方：本服务只需要按商品 id 解析
//! {name, price, thumbnail, isActive}。通过 trait 注入，
//! 生产环境走 HTTP，测试走内存实现。

use crate::utils::{AppError, AppResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Product snapshot as resolved from the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Catalog lookup capability consumed by the cart layer
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Resolve a product by id; `NotFound` when the catalog has no such product
    async fn resolve_product(&self, product_id: &str) -> AppResult<ProductSnapshot>;
}

pub type SharedCatalog = Arc<dyn CatalogGateway>;

// =============================================================================
// HTTP implementation
// =============================================================================

/// Catalog gateway over the catalog service's HTTP API
pub struct HttpCatalogGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCatalogGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl CatalogGateway for HttpCatalogGateway {
    async fn resolve_product(&self, product_id: &str) -> AppResult<ProductSnapshot> {
        let url = format!("{}/api/products/{}", self.base_url, product_id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::internal(format!("Catalog service connection failed: {e}")))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::not_found(format!(
                "Product with ID {} not found",
                product_id
            )));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::internal(format!(
                "Catalog service error: {} - {}",
                status, text
            )));
        }

        resp.json::<ProductSnapshot>()
            .await
            .map_err(|e| AppError::internal(format!("Invalid catalog response: {e}")))
    }
}

// =============================================================================
// In-memory implementation (tests, local development seeding)
// =============================================================================

/// Fixed product table, no I/O
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: HashMap<String, ProductSnapshot>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, product: ProductSnapshot) -> Self {
        self.products.insert(product.id.clone(), product);
        self
    }
}

#[async_trait]
impl CatalogGateway for InMemoryCatalog {
    async fn resolve_product(&self, product_id: &str) -> AppResult<ProductSnapshot> {
        self.products
            .get(product_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Product with ID {} not found", product_id)))
    }
}
