//! 面向用户的提示

use serde::Serialize;

use crate::error::ShareError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub code: &'static str,
    pub message: String,
}

impl Notice {
    pub fn info(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            code,
            message: message.into(),
        }
    }

    /// 错误提示只展示 `user_message()`，技术细节留在日志里。
    pub fn from_error(error: &ShareError) -> Self {
        Self {
            level: NoticeLevel::Error,
            code: error.code(),
            message: error.user_message().to_string(),
        }
    }

    pub fn offline() -> Self {
        Self::warning("OFFLINE", "网络已断开：二维码仍可生成与下载，打开链接可能失败")
    }

    pub fn manual_fallback(url: &str) -> Self {
        Self::info("MANUAL_FALLBACK", format!("可手动复制链接：{}", url))
    }
}
