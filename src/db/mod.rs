//! Database Module
//!
//! 嵌入式 SurrealDB 存储：连接初始化 + 表结构定义

pub mod models;
pub mod repository;

use crate::utils::AppError;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, RocksDb};

const NAMESPACE: &str = "shop";
const DATABASE: &str = "shop";

/// Database service — owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open (or create) the database at the given path and apply schema definitions
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let db = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        let service = Self::from_db(db).await?;
        tracing::info!(path = %db_path, "Database connection established (SurrealDB RocksDB)");
        Ok(service)
    }

    /// Wrap an existing connection (tests use the in-memory engine)
    pub async fn from_db(db: Surreal<Db>) -> Result<Self, AppError> {
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        define_schema(&db).await?;
        Ok(Self { db })
    }
}

/// 启动时定义索引
///
/// - cart.ownerId 唯一：每个身份 (用户或游客) 最多一个购物车
/// - order.orderNumber 唯一：订单号冲突在插入时报错，由结算层重试
/// - payment 关联字段普通索引：按 provider id 对账
async fn define_schema(db: &Surreal<Db>) -> Result<(), AppError> {
    db.query(
        r#"
        DEFINE INDEX IF NOT EXISTS idx_cart_owner ON TABLE cart COLUMNS ownerId UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_order_number ON TABLE order COLUMNS orderNumber UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_order_owner ON TABLE order COLUMNS ownerId;
        DEFINE INDEX IF NOT EXISTS idx_payment_order ON TABLE payment COLUMNS orderId;
        DEFINE INDEX IF NOT EXISTS idx_payment_owner ON TABLE payment COLUMNS ownerId;
        DEFINE INDEX IF NOT EXISTS idx_payment_intent ON TABLE payment COLUMNS paymentIntentId;
        DEFINE INDEX IF NOT EXISTS idx_payment_paypal ON TABLE payment COLUMNS paypalOrderId;
        "#,
    )
    .await
    .map_err(|e| AppError::database(format!("Failed to define schema: {e}")))?;

    tracing::debug!("Database schema definitions applied");
    Ok(())
}
