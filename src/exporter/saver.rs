//! 本地目录保存实现

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::ShareError;
use crate::platform::{FileSaver, SavedFile};

/// 将文件写入指定目录（不存在时自动创建）。
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 配置未指定目录时使用当前工作目录。
    pub fn from_config(output_dir: Option<&Path>) -> Result<Self, ShareError> {
        match output_dir {
            Some(dir) => Ok(Self::new(dir)),
            None => Ok(Self::new(std::env::current_dir()?)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl FileSaver for DirectorySaver {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<SavedFile, ShareError> {
        if file_name.contains(['/', '\\']) {
            return Err(ShareError::ExportFailed(format!("文件名不能包含路径分隔符：{}", file_name)));
        }

        let dir = self.dir.clone();
        let path = dir.join(file_name);
        let target = path.clone();
        let bytes = bytes.to_vec();

        tokio::task::spawn_blocking(move || -> Result<(), ShareError> {
            std::fs::create_dir_all(&dir)
                .map_err(|e| ShareError::ExportFailed(format!("创建目录失败 {}: {}", dir.display(), e)))?;
            std::fs::write(&target, &bytes)
                .map_err(|e| ShareError::ExportFailed(format!("写入文件失败 {}: {}", target.display(), e)))
        })
        .await
        .map_err(|e| ShareError::ExportFailed(format!("线程执行失败：{}", e)))??;

        log::info!("💾 已保存 {}", path.display());

        Ok(SavedFile {
            file_name: file_name.to_string(),
            location: Some(path),
        })
    }
}
