use crate::orders::PricingPolicy;
use crate::utils::{AppError, AppResult};
use std::path::PathBuf;

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/shop-server | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | CATALOG_URL | http://localhost:3001 | 商品目录服务地址 |
/// | CATALOG_TIMEOUT_MS | 5000 | 目录请求超时(毫秒) |
/// | FREE_SHIPPING_THRESHOLD | 100 | 免运费门槛 |
/// | FLAT_SHIPPING_FEE | 10 | 门槛以下统一运费 |
/// | TAX_RATE | 0.10 | 固定税率 |
/// | STRIPE_SECRET_KEY | (空) | Stripe API 密钥 |
/// | STRIPE_WEBHOOK_SECRET | (空) | Stripe webhook 签名密钥 |
/// | PAYPAL_CLIENT_ID | (空) | PayPal client id |
/// | PAYPAL_CLIENT_SECRET | (空) | PayPal client secret |
/// | PAYPAL_API_BASE | sandbox | PayPal API 地址 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/shop HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库和日志文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,

    // === 外部协作方 ===
    /// 商品目录服务 URL
    pub catalog_url: String,
    /// 目录请求超时 (毫秒)
    pub catalog_timeout_ms: u64,

    // === 定价策略 ===
    /// 免运费门槛 (货币单位)
    pub free_shipping_threshold: f64,
    /// 门槛以下的统一运费
    pub flat_shipping_fee: f64,
    /// 固定税率
    pub tax_rate: f64,

    // === 支付服务商凭证 (只从环境加载) ===
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub paypal_client_id: String,
    pub paypal_client_secret: String,
    pub paypal_api_base: String,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/shop-server".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),

            catalog_url: std::env::var("CATALOG_URL")
                .unwrap_or_else(|_| "http://localhost:3001".into()),
            catalog_timeout_ms: std::env::var("CATALOG_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),

            free_shipping_threshold: std::env::var("FREE_SHIPPING_THRESHOLD")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(100.0),
            flat_shipping_fee: std::env::var("FLAT_SHIPPING_FEE")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10.0),
            tax_rate: std::env::var("TAX_RATE")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(0.10),

            stripe_secret_key: std::env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            paypal_client_id: std::env::var("PAYPAL_CLIENT_ID").unwrap_or_default(),
            paypal_client_secret: std::env::var("PAYPAL_CLIENT_SECRET").unwrap_or_default(),
            paypal_api_base: std::env::var("PAYPAL_API_BASE")
                .unwrap_or_else(|_| "https://api-m.sandbox.paypal.com".into()),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// 数据库目录 (work_dir/database)
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// 日志目录 (work_dir/logs)
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> AppResult<()> {
        for dir in [self.database_dir(), self.log_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::internal(format!("Failed to create {}: {e}", dir.display()))
            })?;
        }
        Ok(())
    }

    /// 结算定价策略
    pub fn pricing_policy(&self) -> PricingPolicy {
        PricingPolicy {
            free_shipping_threshold: self.free_shipping_threshold,
            flat_shipping_fee: self.flat_shipping_fee,
            tax_rate: self.tax_rate,
        }
    }

    /// 校验支付凭证
    ///
    /// 生产环境缺失凭证直接拒绝启动；开发环境只告警，
    /// 方便不接支付的本地调试。
    pub fn validate_payment_credentials(&self) -> AppResult<()> {
        let missing: Vec<&str> = [
            ("STRIPE_SECRET_KEY", &self.stripe_secret_key),
            ("STRIPE_WEBHOOK_SECRET", &self.stripe_webhook_secret),
            ("PAYPAL_CLIENT_ID", &self.paypal_client_id),
            ("PAYPAL_CLIENT_SECRET", &self.paypal_client_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            return Ok(());
        }
        if self.is_production() {
            return Err(AppError::internal(format!(
                "Missing payment credentials: {}",
                missing.join(", ")
            )));
        }
        tracing::warn!(missing = ?missing, "Payment credentials not configured");
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
