//! 请求身份抽取
//!
//! 认证由上游网关完成，本服务只信任网关转发的身份头：
//! 用户请求带 `X-User-ID`，游客请求带 `X-Guest-ID`。
//! 游客令牌缺失时由 [`GuestId`] 铸造，经响应头发还客户端往返。

use crate::cart::GuestCartService;
use crate::utils::AppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const GUEST_ID_HEADER: &str = "x-guest-id";

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Authenticated user identity (gateway-resolved)
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, USER_ID_HEADER).ok_or(AppError::Unauthorized)?;
        Ok(Self { id })
    }
}

/// Guest identity; mints a fresh `guest_<uuid>` token when the header is absent
///
/// 铸造的令牌必须随响应头发回，客户端带着它继续后续请求。
#[derive(Debug, Clone)]
pub struct GuestId {
    pub id: String,
    /// Token was minted for this request
    pub minted: bool,
}

impl<S> FromRequestParts<S> for GuestId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(match header_value(parts, GUEST_ID_HEADER) {
            Some(id) => Self { id, minted: false },
            None => Self {
                id: GuestCartService::generate_guest_id(),
                minted: true,
            },
        })
    }
}

/// Guest identity that must already exist (checkout path never mints)
#[derive(Debug, Clone)]
pub struct RequiredGuestId(pub String);

impl<S> FromRequestParts<S> for RequiredGuestId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_value(parts, GUEST_ID_HEADER)
            .map(Self)
            .ok_or_else(|| AppError::validation("Guest cart not found"))
    }
}

/// Either identity: user header wins over guest header
///
/// 支付接口对用户和游客一视同仁，按订单归属校验。
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: String,
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_value(parts, USER_ID_HEADER)
            .or_else(|| header_value(parts, GUEST_ID_HEADER))
            .map(|id| Self { id })
            .ok_or(AppError::Unauthorized)
    }
}
