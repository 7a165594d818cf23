//! # 平台边界接口
//!
//! ## 设计思路
//!
//! 分发链路依赖的所有“外部能力”（异步剪贴板、同步选区复制、文件保存、打开链接）
//! 都收敛为 trait。核心逻辑只依赖 trait，不依赖具体运行环境：
//! 桌面端使用本 crate 提供的原生实现，测试中注入内存假实现即可模拟“能力存在/缺失/失败”。
//!
//! 绘制目标 `SurfaceTarget` 与渲染器关系更紧密，定义在 `renderer::surface`。

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::ShareError;

/// 异步剪贴板写入能力（首选复制方式）。
#[async_trait]
pub trait AsyncClipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ShareError>;
}

/// 临时“离屏元素”的句柄。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StagingHandle(pub u64);

/// 同步选区复制能力（回退复制方式）。
///
/// 调用顺序固定为：创建离屏元素 → 全选 → 执行复制 → 移除元素。
/// 移除由 `clipboard::strategy::StagingGuard` 在作用域结束时保证。
pub trait SelectionHost: Send + Sync {
    fn create_staging(&self, text: &str) -> Result<StagingHandle, ShareError>;
    fn select_all(&self, handle: StagingHandle) -> Result<(), ShareError>;
    /// 对当前选区执行一次同步复制命令，返回命令是否成功。
    fn exec_copy(&self) -> bool;
    fn remove_staging(&self, handle: StagingHandle);
    /// 当前仍挂载的离屏元素数量。
    fn staged_count(&self) -> usize;
}

/// 文件保存结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub file_name: String,
    /// 落盘位置；浏览器式下载没有可见路径时为 `None`。
    pub location: Option<PathBuf>,
}

/// 客户端文件保存触发器。
#[async_trait]
pub trait FileSaver: Send + Sync {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<SavedFile, ShareError>;
}

/// 在新上下文中打开链接，或调用平台“发送/分享”能力。
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn open(&self, url: &str) -> Result<(), ShareError>;

    /// 平台原生分享；默认不支持。
    async fn share(&self, _title: &str, _text: &str, _url: &str) -> Result<(), ShareError> {
        Err(ShareError::Launch("当前平台不支持原生分享".to_string()))
    }
}

/// 使用系统默认程序打开链接。
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

#[async_trait]
impl Launcher for SystemLauncher {
    async fn open(&self, url: &str) -> Result<(), ShareError> {
        log::info!("🌐 使用系统默认程序打开链接");
        spawn_opener(url)
    }
}

#[cfg(target_os = "macos")]
fn spawn_opener(url: &str) -> Result<(), ShareError> {
    std::process::Command::new("open")
        .arg(url)
        .spawn()
        .map_err(|e| ShareError::Launch(format!("打开链接失败: {}", e)))?;
    Ok(())
}

#[cfg(target_os = "windows")]
fn spawn_opener(url: &str) -> Result<(), ShareError> {
    std::process::Command::new("cmd")
        .args(["/C", "start", "", url])
        .spawn()
        .map_err(|e| ShareError::Launch(format!("打开链接失败: {}", e)))?;
    Ok(())
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn spawn_opener(url: &str) -> Result<(), ShareError> {
    std::process::Command::new("xdg-open")
        .arg(url)
        .spawn()
        .map_err(|e| ShareError::Launch(format!("打开链接失败: {}", e)))?;
    Ok(())
}
