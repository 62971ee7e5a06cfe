use std::sync::Arc;
use std::time::Duration;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::cart::{CartService, GuestCartService};
use crate::catalog::{HttpCatalogGateway, SharedCatalog};
use crate::core::Config;
use crate::db::DbService;
use crate::orders::{CheckoutEngine, OrderService};
use crate::payments::{PayPalProvider, PaymentService, StripeProvider, StripeWebhook};
use crate::utils::AppResult;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc/廉价 Clone 实现浅拷贝，每个请求处理器拿到的都是
/// 同一组服务实例。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | db | 嵌入式数据库 (SurrealDB) |
/// | catalog | 商品目录网关 |
/// | carts / guest_carts | 购物车服务 |
/// | checkout | 结算引擎 |
/// | orders | 订单服务 |
/// | payments | 支付对账服务 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: Surreal<Db>,
    pub catalog: SharedCatalog,
    pub carts: CartService,
    pub guest_carts: GuestCartService,
    pub checkout: Arc<CheckoutEngine>,
    pub orders: OrderService,
    pub payments: Arc<PaymentService>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 1. 工作目录结构 + 支付凭证校验
    /// 2. 数据库 (work_dir/database/shop.db) + 唯一索引
    /// 3. HTTP 目录网关与各服务
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        config.ensure_work_dir_structure()?;
        config.validate_payment_credentials()?;

        let db_path = config.database_dir().join("shop.db");
        let db_service = DbService::new(&db_path.to_string_lossy()).await?;

        let catalog: SharedCatalog = Arc::new(HttpCatalogGateway::new(
            config.catalog_url.clone(),
            Duration::from_millis(config.catalog_timeout_ms),
        )?);

        Self::assemble(config.clone(), db_service.db, catalog)
    }

    /// 从已有数据库连接和目录网关装配服务
    ///
    /// 测试用 Mem 引擎 + 内存目录走这里。
    pub fn assemble(
        config: Config,
        db: Surreal<Db>,
        catalog: SharedCatalog,
    ) -> AppResult<Self> {
        let stripe = Arc::new(StripeProvider::new(config.stripe_secret_key.clone())?);
        let paypal = Arc::new(PayPalProvider::with_base_url(
            config.paypal_client_id.clone(),
            config.paypal_client_secret.clone(),
            config.paypal_api_base.clone(),
        )?);
        let webhook = StripeWebhook::new(config.stripe_webhook_secret.clone());

        let carts = CartService::new(db.clone(), catalog.clone());
        let guest_carts = GuestCartService::new(db.clone(), catalog.clone());
        let checkout = Arc::new(CheckoutEngine::new(
            db.clone(),
            carts.clone(),
            guest_carts.clone(),
            config.pricing_policy(),
        ));
        let orders = OrderService::new(db.clone());
        let payments = Arc::new(PaymentService::new(db.clone(), stripe, paypal, webhook));

        Ok(Self {
            config,
            db,
            catalog,
            carts,
            guest_carts,
            checkout,
            orders,
            payments,
        })
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }
}
