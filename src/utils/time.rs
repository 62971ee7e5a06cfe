//! 时间工具

use chrono::Utc;

/// 当前 Unix 毫秒时间戳
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 当前 RFC3339 时间字符串 (用于持久化字段)
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
