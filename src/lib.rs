//! Shop Server - 电商后台核心服务
//!
//! # 架构概述
//!
//! 本服务承载电商后台的核心域：购物车 (用户 + 游客)、结算定价、
//! 订单状态机与支付对账。商品目录和认证是外部协作方，分别通过
//! [`catalog::CatalogGateway`] 和身份请求头接入。
//!
//! # 模块结构
//!
//! ```text
//! src/
//! ├── core/      # 配置、状态、服务器启动
//! ├── utils/     # 错误、日志、时间工具
//! ├── db/        # 嵌入式 SurrealDB、模型与仓储
//! ├── money.rs   # 金额舍入与校验
//! ├── catalog/   # 商品目录网关
//! ├── cart/      # 用户/游客购物车服务
//! ├── orders/    # 结算引擎、订单服务
//! ├── payments/  # Stripe / PayPal 支付对账
//! └── api/       # HTTP 路由和处理器
//! ```

pub mod api;
pub mod cart;
pub mod catalog;
pub mod core;
pub mod db;
pub mod money;
pub mod orders;
pub mod payments;
pub mod utils;

// Re-export 公共类型
pub use cart::{CartService, GuestCartService};
pub use core::{Config, Server, ServerState};
pub use orders::{CheckoutEngine, OrderService, PricingPolicy};
pub use payments::PaymentService;
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
