//! 复制策略定义
//!
//! 每种复制方式实现 `ClipboardStrategy`，由 `ClipboardAdapter` 按顺序调度。

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ShareError;
use crate::platform::{AsyncClipboard, SelectionHost, StagingHandle};

/// 单一复制方式。
#[async_trait]
pub trait ClipboardStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn attempt(&self, text: &str) -> Result<(), ShareError>;
}

/// 首选：平台异步剪贴板写入。
pub struct AsyncClipboardStrategy {
    clipboard: Arc<dyn AsyncClipboard>,
}

impl AsyncClipboardStrategy {
    pub fn new(clipboard: Arc<dyn AsyncClipboard>) -> Self {
        Self { clipboard }
    }
}

#[async_trait]
impl ClipboardStrategy for AsyncClipboardStrategy {
    fn name(&self) -> &'static str {
        "async-clipboard"
    }

    async fn attempt(&self, text: &str) -> Result<(), ShareError> {
        self.clipboard.write_text(text).await
    }
}

/// 离屏元素的 RAII 守卫
///
/// 构造时元素已挂载，`Drop` 时无条件移除。无论复制成功、失败还是提前 `?` 返回，
/// 调用结束后元素都不会残留。
pub struct StagingGuard<'a> {
    host: &'a dyn SelectionHost,
    handle: StagingHandle,
}

impl<'a> StagingGuard<'a> {
    pub fn create(host: &'a dyn SelectionHost, text: &str) -> Result<Self, ShareError> {
        let handle = host.create_staging(text)?;
        Ok(Self { host, handle })
    }

    pub fn handle(&self) -> StagingHandle {
        self.handle
    }
}

impl Drop for StagingGuard<'_> {
    fn drop(&mut self) {
        self.host.remove_staging(self.handle);
        log::debug!("🧹 已移除离屏复制元素 {:?}", self.handle);
    }
}

/// 回退：同步选区复制。
pub struct SelectionCopyStrategy {
    host: Arc<dyn SelectionHost>,
}

impl SelectionCopyStrategy {
    pub fn new(host: Arc<dyn SelectionHost>) -> Self {
        Self { host }
    }
}

fn copy_with_staging(host: &dyn SelectionHost, text: &str) -> Result<(), ShareError> {
    let staging = StagingGuard::create(host, text)?;
    host.select_all(staging.handle())?;

    if host.exec_copy() {
        Ok(())
    } else {
        Err(ShareError::ClipboardUnavailable("复制命令执行失败".to_string()))
    }
}

#[async_trait]
impl ClipboardStrategy for SelectionCopyStrategy {
    fn name(&self) -> &'static str {
        "selection-copy"
    }

    /// 复制命令是同步的，放到阻塞线程中执行。
    async fn attempt(&self, text: &str) -> Result<(), ShareError> {
        let host = self.host.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || copy_with_staging(host.as_ref(), &text))
            .await
            .map_err(|e| ShareError::ClipboardUnavailable(format!("线程执行失败：{}", e)))?
    }
}
