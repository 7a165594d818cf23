//! 桌面端剪贴板实现
//!
//! - `SystemClipboard`：通过 `arboard` 写入系统剪贴板，在阻塞线程中执行，避免阻塞 async 运行时。
//! - `CommandSelectionHost`：把文本暂存为“离屏元素”，选中后通过平台复制命令
//!   （`pbcopy` / `wl-copy` / `xclip` / `xsel` / `clip`）写入剪贴板。

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ShareError;
use crate::platform::{AsyncClipboard, SelectionHost, StagingHandle};

const SYSTEM_CLIPBOARD_RETRIES: u32 = 3;
const SYSTEM_CLIPBOARD_RETRY_DELAY: Duration = Duration::from_millis(50);

/// 基于 `arboard` 的系统剪贴板。
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl SystemClipboard {
    /// 能否打开系统剪贴板。
    pub fn probe() -> bool {
        match arboard::Clipboard::new() {
            Ok(_) => true,
            Err(err) => {
                log::debug!("系统剪贴板不可用：{}", err);
                false
            }
        }
    }

    fn write_blocking(text: &str) -> Result<(), ShareError> {
        let mut last_error = None;

        for attempt in 1..=SYSTEM_CLIPBOARD_RETRIES {
            if attempt > 1 {
                log::debug!("🔄 系统剪贴板重试 {}/{}", attempt, SYSTEM_CLIPBOARD_RETRIES);
                std::thread::sleep(SYSTEM_CLIPBOARD_RETRY_DELAY);
            }

            let result = arboard::Clipboard::new()
                .map_err(|e| format!("无法访问剪贴板：{}", e))
                .and_then(|mut clipboard| clipboard.set_text(text).map_err(|e| format!("写入失败：{}", e)));

            match result {
                Ok(()) => return Ok(()),
                Err(message) => {
                    log::warn!("❌ 系统剪贴板尝试 {} 失败：{}", attempt, message);
                    last_error = Some(message);
                }
            }
        }

        Err(ShareError::ClipboardUnavailable(
            last_error.unwrap_or_else(|| "未知错误".to_string()),
        ))
    }
}

#[async_trait]
impl AsyncClipboard for SystemClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ShareError> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || Self::write_blocking(&text))
            .await
            .map_err(|e| ShareError::ClipboardUnavailable(format!("线程执行失败：{}", e)))?
    }
}

#[derive(Debug, Default)]
struct StagingArea {
    elements: HashMap<u64, String>,
    selection: Option<u64>,
}

/// 通过平台复制命令完成“选区复制”。
#[derive(Debug)]
pub struct CommandSelectionHost {
    program: &'static str,
    args: &'static [&'static str],
    area: Mutex<StagingArea>,
    next_id: AtomicU64,
}

#[cfg(target_os = "macos")]
const COPY_COMMANDS: &[(&str, &[&str])] = &[("pbcopy", &[])];

#[cfg(target_os = "windows")]
const COPY_COMMANDS: &[(&str, &[&str])] = &[("clip", &[])];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const COPY_COMMANDS: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

impl CommandSelectionHost {
    pub fn with_command(program: &'static str, args: &'static [&'static str]) -> Self {
        Self {
            program,
            args,
            area: Mutex::new(StagingArea::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// 在 PATH 中查找第一个可用的复制命令。
    pub fn detect() -> Option<Self> {
        let paths = std::env::var_os("PATH")?;
        COPY_COMMANDS.iter().find_map(|(program, args)| {
            std::env::split_paths(&paths)
                .any(|dir| is_executable_in(&dir, program))
                .then(|| Self::with_command(program, args))
        })
    }

    pub fn program(&self) -> &'static str {
        self.program
    }

    fn selected_text(&self) -> Option<String> {
        let area = self.area.lock().ok()?;
        let id = area.selection?;
        area.elements.get(&id).cloned()
    }

    fn pipe_to_command(&self, text: &str) -> Result<bool, std::io::Error> {
        let mut child = Command::new(self.program)
            .args(self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        // 写入失败也要先回收子进程
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };
        let status = child.wait()?;
        written?;

        Ok(status.success())
    }
}

fn is_executable_in(dir: &Path, program: &str) -> bool {
    if dir.join(program).is_file() {
        return true;
    }
    cfg!(target_os = "windows") && dir.join(format!("{}.exe", program)).is_file()
}

impl SelectionHost for CommandSelectionHost {
    fn create_staging(&self, text: &str) -> Result<StagingHandle, ShareError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut area = self
            .area
            .lock()
            .map_err(|_| ShareError::ClipboardUnavailable("暂存区锁已中毒".to_string()))?;
        area.elements.insert(id, text.to_string());
        Ok(StagingHandle(id))
    }

    fn select_all(&self, handle: StagingHandle) -> Result<(), ShareError> {
        let mut area = self
            .area
            .lock()
            .map_err(|_| ShareError::ClipboardUnavailable("暂存区锁已中毒".to_string()))?;
        if !area.elements.contains_key(&handle.0) {
            return Err(ShareError::ClipboardUnavailable("离屏元素不存在".to_string()));
        }
        area.selection = Some(handle.0);
        Ok(())
    }

    fn exec_copy(&self) -> bool {
        let Some(text) = self.selected_text() else {
            log::warn!("⚠️ 没有选中的内容，跳过复制命令");
            return false;
        };

        match self.pipe_to_command(&text) {
            Ok(success) => success,
            Err(err) => {
                log::warn!("❌ 复制命令 {} 执行失败：{}", self.program, err);
                false
            }
        }
    }

    fn remove_staging(&self, handle: StagingHandle) {
        if let Ok(mut area) = self.area.lock() {
            area.elements.remove(&handle.0);
            if area.selection == Some(handle.0) {
                area.selection = None;
            }
        }
    }

    fn staged_count(&self) -> usize {
        self.area.lock().map(|area| area.elements.len()).unwrap_or(0)
    }
}
