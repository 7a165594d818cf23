//! 二维码导出模块
//!
//! # 设计思路
//!
//! 导出只针对“已就绪”的绘制目标：读取快照 → 编码 PNG → 校验字节确实是 PNG →
//! 用清洗后的文件名触发保存。任何失败都返回 `false`（或 `Err`，供编排器使用），
//! 绝不 panic，调用方可以单独提供“重新下载”入口。
//!
//! # 实现思路
//!
//! - `try_export` 返回带时间戳的 `ExportReceipt`；`export` 是只关心成败的薄封装。
//! - `to_data_url` 提供 `data:image/png;base64,...` 形式，等价于 canvas 的 `toDataURL`。

mod filename;
mod saver;

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Local};
use image::{ImageFormat, RgbaImage};
use serde::Serialize;

use crate::error::ShareError;
use crate::platform::FileSaver;
use crate::renderer::SharedSurface;

pub use filename::sanitize_file_name;
pub use saver::DirectorySaver;

const PNG_MIME: &str = "image/png";

/// 一次成功导出的回执。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReceipt {
    pub file_name: String,
    pub bytes_len: usize,
    pub location: Option<PathBuf>,
    pub exported_at: DateTime<Local>,
}

pub struct ArtifactExporter {
    saver: Arc<dyn FileSaver>,
    default_name: String,
}

impl ArtifactExporter {
    pub fn new(saver: Arc<dyn FileSaver>, default_name: impl Into<String>) -> Self {
        Self {
            saver,
            default_name: default_name.into(),
        }
    }

    /// 导出为 PNG 文件，只返回成败。
    pub async fn export(&self, surface: &SharedSurface, suggested_name: &str) -> bool {
        match self.try_export(surface, suggested_name).await {
            Ok(_) => true,
            Err(err) => {
                log::warn!("❌ 导出失败 [{}]：{}", err.code(), err);
                false
            }
        }
    }

    pub async fn try_export(&self, surface: &SharedSurface, suggested_name: &str) -> Result<ExportReceipt, ShareError> {
        let image = read_snapshot(surface)?;
        let bytes = encode_png(&image)?;
        let file_name = sanitize_file_name(suggested_name, &self.default_name);

        log::info!("📤 导出二维码 {}（{} 字节）", file_name, bytes.len());

        let saved = self.saver.save(&file_name, &bytes).await.map_err(|err| match err {
            ShareError::ExportFailed(_) => err,
            other => ShareError::ExportFailed(other.to_string()),
        })?;

        Ok(ExportReceipt {
            file_name: saved.file_name,
            bytes_len: bytes.len(),
            location: saved.location,
            exported_at: Local::now(),
        })
    }

    /// 已就绪绘制目标的 data URL。
    pub fn to_data_url(surface: &SharedSurface) -> Result<String, ShareError> {
        let image = read_snapshot(surface)?;
        let bytes = encode_png(&image)?;
        Ok(format!("data:{};base64,{}", PNG_MIME, general_purpose::STANDARD.encode(bytes)))
    }
}

fn read_snapshot(surface: &SharedSurface) -> Result<RgbaImage, ShareError> {
    let target = surface
        .lock()
        .map_err(|_| ShareError::ExportFailed("绘制目标锁已中毒".to_string()))?;

    target
        .snapshot()
        .cloned()
        .ok_or_else(|| ShareError::NotReady("二维码尚未生成完成".to_string()))
}

/// 编码 PNG 并确认输出字节类型。
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ShareError> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| ShareError::ExportFailed(format!("PNG 编码失败：{}", e)))?;
    let bytes = cursor.into_inner();

    match infer::get(&bytes) {
        Some(kind) if kind.mime_type() == PNG_MIME => Ok(bytes),
        Some(kind) => Err(ShareError::ExportFailed(format!("编码结果类型异常：{}", kind.mime_type()))),
        None => Err(ShareError::ExportFailed("无法识别编码结果类型".to_string())),
    }
}
