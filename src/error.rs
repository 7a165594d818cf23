//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `ShareError` 枚举，覆盖“校验 → 解析链接 → 绘制 → 导出 → 复制 → 打开”
//! 整条分发链路的失败分支。各叶子组件（校验器、解析器、渲染器、导出器、剪贴板适配器）
//! 只返回显式的失败值，不向边界外 panic；由编排器统一决定面向用户的提示与重试策略。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - `code()` / `stage()` 提供稳定的机器可读字段，便于日志聚合与前端分支。
//! - 实现 `Serialize` 将错误序列化为字符串，方便直接透传给调用方。

use serde::Serialize;

/// 分享链路统一错误类型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShareError {
    /// 标识符或 URL 格式非法（终态，不重试）
    #[error("输入无效：{0}")]
    InvalidInput(String),

    /// 单次绘制失败（在重试预算内自动重试）
    #[error("二维码绘制失败：{0}")]
    RenderTransient(String),

    /// 重试预算耗尽（终态，直到用户手动重试）
    #[error("二维码生成失败（已尝试 {attempts} 次）：{last_error}")]
    RenderExhausted { attempts: u32, last_error: String },

    /// 画布尚未处于就绪状态
    #[error("二维码尚未就绪：{0}")]
    NotReady(String),

    /// 所有复制方式均失败
    #[error("剪贴板不可用：{0}")]
    ClipboardUnavailable(String),

    /// 文件保存失败（可单独重试导出）
    #[error("导出失败：{0}")]
    ExportFailed(String),

    /// 打开 / 分享链接失败
    #[error("打开链接失败：{0}")]
    Launch(String),

    /// 配置加载或校验失败
    #[error("配置错误：{0}")]
    Config(String),

    /// 文件系统 I/O 错误
    #[error("文件系统错误：{0}")]
    Io(String),
}

impl ShareError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "E_INVALID_INPUT",
            Self::RenderTransient(_) => "E_RENDER_TRANSIENT",
            Self::RenderExhausted { .. } => "E_RENDER_EXHAUSTED",
            Self::NotReady(_) => "E_NOT_READY",
            Self::ClipboardUnavailable(_) => "E_CLIPBOARD_UNAVAILABLE",
            Self::ExportFailed(_) => "E_EXPORT_FAILED",
            Self::Launch(_) => "E_LAUNCH",
            Self::Config(_) => "E_CONFIG",
            Self::Io(_) => "E_IO",
        }
    }

    /// 出错阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "validate",
            Self::RenderTransient(_) | Self::RenderExhausted { .. } => "render",
            Self::NotReady(_) | Self::ExportFailed(_) => "export",
            Self::ClipboardUnavailable(_) => "clipboard",
            Self::Launch(_) => "launch",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }

    /// 只有单次绘制失败允许自动重试。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RenderTransient(_))
    }

    /// 面向最终用户的提示文案。
    ///
    /// 技术细节只进日志，用户只看到可操作的简短说明。
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "问卷链接无效，请检查问卷是否已发布",
            Self::RenderTransient(_) | Self::RenderExhausted { .. } => "二维码生成失败，请重试或直接复制链接",
            Self::NotReady(_) => "二维码仍在生成中，请稍候",
            Self::ClipboardUnavailable(_) => "复制失败，请手动复制链接",
            Self::ExportFailed(_) | Self::Io(_) => "下载失败，请重试",
            Self::Launch(_) => "无法打开链接，请手动复制后在浏览器中打开",
            Self::Config(_) => "配置有误，已使用默认设置",
        }
    }
}

impl From<std::io::Error> for ShareError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl Serialize for ShareError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_render_failures_are_retryable() {
        assert!(ShareError::RenderTransient("x".into()).is_retryable());
        assert!(!ShareError::InvalidInput("x".into()).is_retryable());
        assert!(
            !ShareError::RenderExhausted {
                attempts: 3,
                last_error: "x".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn serializes_as_display_string() {
        let err = ShareError::ExportFailed("disk full".into());
        let json = serde_json::to_string(&err).expect("serialize should succeed");
        assert_eq!(json, "\"导出失败：disk full\"");
    }

    #[test]
    fn io_errors_convert_into_io_variant() {
        let err: ShareError = std::io::Error::other("boom").into();
        assert_eq!(err.code(), "E_IO");
        assert_eq!(err.stage(), "io");
    }
}
