//! 可取消的计划任务
//!
//! 包装 `tokio::task::JoinHandle`：`cancel()` 或 `Drop` 时中止任务，
//! 挂起中的退避等待随之失效，不会在绘制目标消失后再触发。

use std::future::Future;

use tokio::task::JoinHandle;

use crate::error::ShareError;

#[derive(Debug)]
pub struct ScheduledTask {
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// 在当前 tokio 运行时上启动任务。
    pub fn spawn<F>(future: F) -> Result<Self, ShareError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ShareError::RenderTransient(format!("没有可用的异步运行时：{}", e)))?;
        Ok(Self {
            handle: Some(runtime.spawn(future)),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                log::debug!("🛑 取消挂起的生成任务");
            }
            handle.abort();
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
