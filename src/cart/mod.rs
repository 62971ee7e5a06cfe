//! Cart Module
//!
//! 用户购物车与游客购物车共用同一套行项/总额逻辑，
//! 游客购物车额外支持登录后合并到用户购物车。

mod guest;
mod service;

pub use guest::GuestCartService;
pub use service::CartService;
