//! 平台能力探测模块
//!
//! # 设计思路
//!
//! “能力 X 是否存在”只在一个地方计算一次，结果以类型化标志下发，
//! 避免在各处散落 `if 存在 { .. }` 判断。测试直接构造 `PlatformCapabilities`
//! 即可确定性地模拟“能力存在/缺失”。
//!
//! # 实现思路
//!
//! - 原生环境的探测结果通过 `once_cell::sync::Lazy` 缓存，整个进程只探测一次。
//! - 剪贴板探测会真正尝试打开系统剪贴板；选区复制探测在 PATH 中查找复制命令。

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::clipboard::native::{CommandSelectionHost, SystemClipboard};

/// 类型化的可用性标志。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Availability {
    Available,
    Unavailable,
}

impl Availability {
    pub fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

impl From<bool> for Availability {
    fn from(value: bool) -> Self {
        if value {
            Self::Available
        } else {
            Self::Unavailable
        }
    }
}

/// 当前运行环境的能力集合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformCapabilities {
    /// 异步剪贴板写入。
    pub async_clipboard: Availability,
    /// 同步选区复制命令。
    pub selection_copy: Availability,
    /// 原生分享面板。
    pub native_share: Availability,
    /// 客户端文件保存。
    pub file_save: Availability,
}

static NATIVE_CAPABILITIES: Lazy<PlatformCapabilities> = Lazy::new(|| {
    let capabilities = PlatformCapabilities {
        async_clipboard: SystemClipboard::probe().into(),
        selection_copy: CommandSelectionHost::detect().is_some().into(),
        native_share: Availability::Unavailable,
        file_save: Availability::Available,
    };
    log::info!("🔎 平台能力探测完成：{:?}", capabilities);
    capabilities
});

impl PlatformCapabilities {
    /// 所有能力可用。
    pub fn all() -> Self {
        Self {
            async_clipboard: Availability::Available,
            selection_copy: Availability::Available,
            native_share: Availability::Available,
            file_save: Availability::Available,
        }
    }

    /// 所有能力缺失。
    pub fn none() -> Self {
        Self {
            async_clipboard: Availability::Unavailable,
            selection_copy: Availability::Unavailable,
            native_share: Availability::Unavailable,
            file_save: Availability::Unavailable,
        }
    }

    /// 原生桌面环境的能力（进程内只探测一次）。
    pub fn detect_native() -> Self {
        *NATIVE_CAPABILITIES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_from_bool() {
        assert!(Availability::from(true).is_available());
        assert!(!Availability::from(false).is_available());
    }

    #[test]
    fn presets_are_consistent() {
        let all = PlatformCapabilities::all();
        let none = PlatformCapabilities::none();
        assert!(all.async_clipboard.is_available() && all.native_share.is_available());
        assert!(!none.selection_copy.is_available() && !none.file_save.is_available());
    }
}
