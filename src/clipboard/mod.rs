//! 剪贴板适配模块
//!
//! # 设计思路
//!
//! 复制链接是“尽力而为”的操作：浏览器权限、系统剪贴板占用、缺少复制命令都可能导致失败。
//! 这里把多种复制方式建模为**有序策略链**，依次尝试，首个成功者胜出：
//!
//! 1. 平台异步剪贴板写入（若存在）
//! 2. 同步选区复制：创建离屏元素 → 写入文本 → 全选 → 执行复制 → 无论成败都移除元素
//!
//! 每个策略的结果统一归一为 `Result<(), ShareError>`，适配器对外只返回 `ClipboardResult`，
//! 永远不会把错误抛给调用方。后续新增第三种复制方式只需往链上追加一个策略。
//!
//! # 实现思路
//!
//! - 策略链由 `PlatformCapabilities` 决定包含哪些策略，不在运行时散落能力判断。
//! - 离屏元素由 `StagingGuard`（RAII）管理，`Drop` 时必定移除，不会泄漏。
//! - 子模块：`strategy` 定义策略 trait 与两种内置策略，`native` 提供桌面端实现。

pub mod native;
pub mod strategy;

use std::sync::Arc;

use serde::Serialize;

use crate::capability::PlatformCapabilities;
use crate::error::ShareError;
use crate::platform::{AsyncClipboard, SelectionHost};

pub use strategy::{AsyncClipboardStrategy, ClipboardStrategy, SelectionCopyStrategy, StagingGuard};

/// 单次复制结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipboardResult {
    pub success: bool,
    /// 人类可读的原因说明。
    pub reason: String,
    /// 成功时使用的策略名。
    pub strategy: Option<&'static str>,
}

impl ClipboardResult {
    fn copied(strategy: &'static str) -> Self {
        Self {
            success: true,
            reason: format!("已通过 {} 复制", strategy),
            strategy: Some(strategy),
        }
    }

    fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: reason.into(),
            strategy: None,
        }
    }

    /// 转为统一错误类型，供编排层使用。
    pub fn into_result(self) -> Result<&'static str, ShareError> {
        match (self.success, self.strategy) {
            (true, Some(strategy)) => Ok(strategy),
            _ => Err(ShareError::ClipboardUnavailable(self.reason)),
        }
    }
}

/// 按顺序尝试复制策略的适配器。
pub struct ClipboardAdapter {
    strategies: Vec<Box<dyn ClipboardStrategy>>,
}

impl ClipboardAdapter {
    pub fn new(strategies: Vec<Box<dyn ClipboardStrategy>>) -> Self {
        Self { strategies }
    }

    /// 根据能力探测结果组装策略链。
    ///
    /// 能力缺失或未提供实现的策略直接跳过。
    pub fn from_capabilities(
        capabilities: &PlatformCapabilities,
        primary: Option<Arc<dyn AsyncClipboard>>,
        fallback: Option<Arc<dyn SelectionHost>>,
    ) -> Self {
        let mut strategies: Vec<Box<dyn ClipboardStrategy>> = Vec::new();

        if capabilities.async_clipboard.is_available() {
            if let Some(clipboard) = primary {
                strategies.push(Box::new(AsyncClipboardStrategy::new(clipboard)));
            }
        }

        if capabilities.selection_copy.is_available() {
            if let Some(host) = fallback {
                strategies.push(Box::new(SelectionCopyStrategy::new(host)));
            }
        }

        log::debug!("📋 剪贴板策略链：{:?}", strategies.iter().map(|s| s.name()).collect::<Vec<_>>());

        Self::new(strategies)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// 复制文本，首个成功的策略胜出。
    pub async fn copy_text(&self, text: &str) -> ClipboardResult {
        if text.is_empty() {
            return ClipboardResult::failed("没有可复制的内容");
        }

        if self.strategies.is_empty() {
            log::warn!("⚠️ 没有可用的复制方式");
            return ClipboardResult::failed("当前环境没有可用的复制方式");
        }

        let mut failures = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            match strategy.attempt(text).await {
                Ok(()) => {
                    log::info!("✅ 复制成功（{}）", strategy.name());
                    return ClipboardResult::copied(strategy.name());
                }
                Err(err) => {
                    log::warn!("❌ 复制方式 {} 失败，尝试下一种：{}", strategy.name(), err);
                    failures.push(format!("{}: {}", strategy.name(), err));
                }
            }
        }

        ClipboardResult::failed(format!("所有复制方式均失败（{}）", failures.join("；")))
    }
}
