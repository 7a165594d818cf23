//! 分发编排模块
//!
//! # 设计思路
//!
//! 每个展示中的二维码对应一个 `DistributionOrchestrator`，它独占：
//!
//! - `ArtifactRenderState`（`Idle / Generating / Ready / Failed`）
//! - 绘制目标与当前生成任务
//! - 复制 / 下载 / 打开 / 分享 四类用户动作
//!
//! 两路外部信号持续输入：网络连通性只影响提示文案（生成是本地行为，离线不阻塞），
//! 设备/视口影响二维码尺寸，尺寸变化时重新生成。
//!
//! 自动重试对用户不可见，预算耗尽才以 `Failed` 呈现；用户手动重试在任何非生成状态下都允许，
//! 且总是从零开始计数。生成中收到的重试请求直接忽略，避免两个序列同时写同一绘制目标。
//!
//! # 实现思路
//!
//! - 状态通过 `tokio::sync::watch` 发布，快照带 `sequence`；后台任务只在序号一致时写回，
//!   旧序列的迟到结果被自然丢弃。
//! - 生成序列运行在 `ScheduledTask` 中，重新生成、卸载或析构时中止，挂起的退避不会再触发。
//! - 所有动作返回 `ActionOutcome`，失败时附带“手动复制链接”的兜底提示，不向外抛错。

pub mod device;
pub mod notice;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::capability::PlatformCapabilities;
use crate::clipboard::ClipboardAdapter;
use crate::clipboard::native::{CommandSelectionHost, SystemClipboard};
use crate::config::ShareConfig;
use crate::error::ShareError;
use crate::exporter::{ArtifactExporter, DirectorySaver, ExportReceipt};
use crate::identifier::is_valid_identifier;
use crate::platform::{AsyncClipboard, FileSaver, Launcher, SelectionHost, SystemLauncher};
use crate::reachability::{self, Reachability};
use crate::renderer::{ArtifactRenderer, RenderEvent, RenderOutcome, ScheduledTask, SharedSurface};
use crate::resolver::{DistributionLinks, LinkKind, UrlResolver};
use crate::share::{ShareChannel, ShareContent, build_share_target};

pub use device::{DeviceClass, DeviceSignals, Viewport};
pub use notice::{Notice, NoticeLevel};

/// “已复制”提示的持续时间。
pub const COPIED_INDICATOR: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// 显式注入的运行时信号。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeEnvironment {
    pub origin: String,
    pub connectivity: Connectivity,
    pub device: DeviceSignals,
}

impl RuntimeEnvironment {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            connectivity: Connectivity::Online,
            device: DeviceSignals::desktop(),
        }
    }
}

/// 数据层传入的分享对象（只读）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareRequest {
    pub identifier: String,
    pub title: String,
    pub description: Option<String>,
}

impl ShareRequest {
    pub fn new(identifier: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum ArtifactRenderState {
    Idle,
    Generating,
    Ready,
    Failed(ShareError),
}

impl ArtifactRenderState {
    pub fn is_generating(&self) -> bool {
        matches!(self, Self::Generating)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// 对外发布的状态快照。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderSnapshot {
    /// 生成序列号；每次重新生成递增。
    pub sequence: u64,
    pub state: ArtifactRenderState,
    /// 当前序列已开始的绘制次数。
    pub attempts: u32,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryDecision {
    Started,
    IgnoredWhileGenerating,
    InvalidIdentifier,
    /// 视图未挂载（或已卸载）。
    NotMounted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareAction {
    Copy,
    Download,
    Open,
    Share,
}

/// 用户动作的结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub action: ShareAction,
    pub success: bool,
    pub detail: String,
    pub error: Option<ShareError>,
    pub export: Option<ExportReceipt>,
    pub notices: Vec<Notice>,
}

impl ActionOutcome {
    fn succeeded(action: ShareAction, detail: impl Into<String>) -> Self {
        Self {
            action,
            success: true,
            detail: detail.into(),
            error: None,
            export: None,
            notices: Vec::new(),
        }
    }

    fn failed(action: ShareAction, error: ShareError) -> Self {
        Self {
            action,
            success: false,
            detail: error.user_message().to_string(),
            notices: vec![Notice::from_error(&error)],
            error: Some(error),
            export: None,
        }
    }

    fn with_notice(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }
}

/// 编排器依赖的平台能力。
pub struct PlatformServices {
    pub capabilities: PlatformCapabilities,
    pub clipboard: ClipboardAdapter,
    pub saver: Arc<dyn FileSaver>,
    pub launcher: Arc<dyn Launcher>,
}

impl PlatformServices {
    /// 桌面端原生实现。
    pub fn native(config: &ShareConfig) -> Result<Self, ShareError> {
        let capabilities = PlatformCapabilities::detect_native();

        let primary = capabilities
            .async_clipboard
            .is_available()
            .then(|| Arc::new(SystemClipboard) as Arc<dyn AsyncClipboard>);
        let fallback = CommandSelectionHost::detect().map(|host| {
            log::info!("📋 回退复制命令：{}", host.program());
            Arc::new(host) as Arc<dyn SelectionHost>
        });

        Ok(Self {
            clipboard: ClipboardAdapter::from_capabilities(&capabilities, primary, fallback),
            saver: Arc::new(DirectorySaver::from_config(config.export.output_dir.as_deref())?),
            launcher: Arc::new(SystemLauncher),
            capabilities,
        })
    }
}

pub struct DistributionOrchestrator {
    config: ShareConfig,
    resolver: UrlResolver,
    renderer: Arc<ArtifactRenderer>,
    exporter: ArtifactExporter,
    clipboard: ClipboardAdapter,
    launcher: Arc<dyn Launcher>,
    capabilities: PlatformCapabilities,
    surface: SharedSurface,
    request: ShareRequest,
    env: RuntimeEnvironment,
    state: Arc<watch::Sender<RenderSnapshot>>,
    task: Option<ScheduledTask>,
    mounted: bool,
    copied_at: Option<Instant>,
    reachability: Reachability,
}

impl DistributionOrchestrator {
    pub fn new(
        config: ShareConfig,
        services: PlatformServices,
        surface: SharedSurface,
        request: ShareRequest,
        env: RuntimeEnvironment,
    ) -> Result<Self, ShareError> {
        config.validate()?;

        let size = env.device.artifact_size(&config.sizing);
        let (state, _) = watch::channel(RenderSnapshot {
            sequence: 0,
            state: ArtifactRenderState::Idle,
            attempts: 0,
            size,
        });

        Ok(Self {
            resolver: UrlResolver::new(config.resolver.clone()),
            renderer: Arc::new(ArtifactRenderer::new(config.render.clone())?),
            exporter: ArtifactExporter::new(services.saver, config.export.default_file_name.clone()),
            clipboard: services.clipboard,
            launcher: services.launcher,
            capabilities: services.capabilities,
            surface,
            request,
            env,
            state: Arc::new(state),
            task: None,
            mounted: false,
            copied_at: None,
            reachability: Reachability::Skipped,
            config,
        })
    }

    /// 视图挂载：开始第一个生成序列。
    pub fn mount(&mut self) {
        self.mounted = true;
        self.start_generation("挂载");
    }

    /// 视图卸载：取消挂起的重试并清空绘制目标。
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.cancel_task();
        if let Ok(mut target) = self.surface.lock() {
            target.clear();
        }
        let size = self.artifact_size();
        let sequence = self.next_sequence();
        self.publish(sequence, ArtifactRenderState::Idle, size);
        log::info!("🧹 分享视图已卸载");
    }

    pub fn state(&self) -> ArtifactRenderState {
        self.state.borrow().state.clone()
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RenderSnapshot> {
        self.state.subscribe()
    }

    /// 等待当前生成序列结束。
    pub async fn settled(&self) -> ArtifactRenderState {
        let mut receiver = self.state.subscribe();
        let settled = match receiver.wait_for(|snapshot| !snapshot.state.is_generating()).await {
            Ok(snapshot) => Some(snapshot.state.clone()),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.state())
    }

    /// 用户手动重试。
    pub fn retry(&mut self) -> RetryDecision {
        if !self.has_valid_identifier() {
            log::warn!("⚠️ 标识符无效，忽略重试");
            return RetryDecision::InvalidIdentifier;
        }
        if !self.mounted {
            log::warn!("⚠️ 视图未挂载，忽略重试");
            return RetryDecision::NotMounted;
        }
        if self.state.borrow().state.is_generating() {
            log::info!("⏳ 正在生成中，忽略重试请求");
            return RetryDecision::IgnoredWhileGenerating;
        }
        self.start_generation("用户重试");
        RetryDecision::Started
    }

    pub fn set_connectivity(&mut self, connectivity: Connectivity) {
        if self.env.connectivity == connectivity {
            return;
        }
        log::info!("📶 网络状态变化：{:?}", connectivity);
        self.env.connectivity = connectivity;
        if !connectivity.is_online() {
            self.reachability = Reachability::Skipped;
        }
    }

    /// 设备/视口变化。尺寸改变且当前不是失败态时重新生成。
    pub fn set_device(&mut self, device: DeviceSignals) {
        let previous = self.artifact_size();
        self.env.device = device;
        let next = self.artifact_size();

        if previous == next {
            return;
        }
        match self.state() {
            ArtifactRenderState::Generating | ArtifactRenderState::Ready => {
                log::info!("📐 二维码尺寸 {}px -> {}px，重新生成", previous, next);
                self.start_generation("尺寸变化");
            }
            ArtifactRenderState::Idle | ArtifactRenderState::Failed(_) => {}
        }
    }

    /// 标识符变化：重置预算并重新生成。
    pub fn set_identifier(&mut self, identifier: impl Into<String>) {
        let identifier = identifier.into();
        if self.request.identifier == identifier {
            return;
        }
        self.request.identifier = identifier;
        self.copied_at = None;
        self.restart_if_mounted("标识符变化");
    }

    /// 运行时 origin 变化：重置预算并重新生成。
    pub fn set_origin(&mut self, origin: impl Into<String>) {
        let origin = origin.into();
        if self.env.origin == origin {
            return;
        }
        self.env.origin = origin;
        self.restart_if_mounted("origin 变化");
    }

    pub fn environment(&self) -> &RuntimeEnvironment {
        &self.env
    }

    pub fn request(&self) -> &ShareRequest {
        &self.request
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }

    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    pub fn artifact_size(&self) -> u32 {
        self.env.device.artifact_size(&self.config.sizing)
    }

    /// 按当前 origin 即时解析分发链接（不缓存）。
    pub fn links(&self) -> Result<DistributionLinks, ShareError> {
        self.resolver.resolve_links(&self.env.origin, &self.request.identifier)
    }

    /// 任何自动化路径失败时，用户仍可手动复制的原始链接。
    pub fn manual_fallback_url(&self) -> Option<String> {
        self.links().ok().map(|links| links.canonical)
    }

    pub fn copied_recently(&self) -> bool {
        self.copied_at.is_some_and(|at| at.elapsed() < COPIED_INDICATOR)
    }

    /// 当前需要展示给用户的提示。
    pub fn notices(&self) -> Vec<Notice> {
        let mut notices = Vec::new();

        let links_error = self.links().err();
        if let Some(error) = &links_error {
            notices.push(Notice::from_error(error));
        }
        if !self.env.connectivity.is_online() {
            notices.push(Notice::offline());
        }
        if let ArtifactRenderState::Failed(error) = self.state() {
            // 标识符错误已在上面提示过
            if links_error.is_none() {
                notices.push(Notice::from_error(&error));
            }
            if let Some(url) = self.manual_fallback_url() {
                notices.push(Notice::manual_fallback(&url));
            }
        }
        if let Reachability::Unreachable { reason } = &self.reachability {
            notices.push(Notice::warning("UNREACHABLE", format!("链接暂时无法访问（{}）", reason)));
        }

        notices
    }

    pub async fn copy_link(&mut self, kind: LinkKind) -> ActionOutcome {
        let url = match self.links() {
            Ok(links) => links.get(kind).to_string(),
            Err(error) => return ActionOutcome::failed(ShareAction::Copy, error),
        };

        match self.clipboard.copy_text(&url).await.into_result() {
            Ok(strategy) => {
                self.copied_at = Some(Instant::now());
                ActionOutcome::succeeded(ShareAction::Copy, format!("链接已复制（{}）", strategy))
            }
            Err(error) => {
                log::warn!("❌ 复制链接失败：{}", error);
                ActionOutcome::failed(ShareAction::Copy, error).with_notice(Notice::manual_fallback(&url))
            }
        }
    }

    /// 下载二维码。未指定文件名时使用 `{标题}_{标识符}_qr.png`。
    pub async fn download(&self, suggested_name: Option<&str>) -> ActionOutcome {
        if let Err(error) = self.links() {
            return ActionOutcome::failed(ShareAction::Download, error);
        }
        if !self.state().is_ready() {
            return ActionOutcome::failed(
                ShareAction::Download,
                ShareError::NotReady("二维码尚未生成完成".to_string()),
            );
        }
        if !self.capabilities.file_save.is_available() {
            log::warn!("⚠️ 当前平台不支持保存文件");
            let outcome = ActionOutcome::failed(
                ShareAction::Download,
                ShareError::ExportFailed("当前环境不支持保存文件".to_string()),
            );
            return match self.manual_fallback_url() {
                Some(url) => outcome.with_notice(Notice::manual_fallback(&url)),
                None => outcome,
            };
        }

        let name = match suggested_name {
            Some(name) => name.to_string(),
            None => self.default_download_name(),
        };

        match self.exporter.try_export(&self.surface, &name).await {
            Ok(receipt) => {
                let mut outcome = ActionOutcome::succeeded(ShareAction::Download, receipt.file_name.clone());
                outcome.export = Some(receipt);
                outcome
            }
            Err(error) => ActionOutcome::failed(ShareAction::Download, error),
        }
    }

    /// 在新上下文中打开链接。离线时照常尝试，但附带提示。
    pub async fn open(&self, kind: LinkKind) -> ActionOutcome {
        let url = match self.links() {
            Ok(links) => links.get(kind).to_string(),
            Err(error) => return ActionOutcome::failed(ShareAction::Open, error),
        };

        let outcome = match self.launcher.open(&url).await {
            Ok(()) => ActionOutcome::succeeded(ShareAction::Open, url),
            Err(error) => {
                log::warn!("❌ 打开链接失败：{}", error);
                ActionOutcome::failed(ShareAction::Open, error).with_notice(Notice::manual_fallback(&url))
            }
        };
        self.with_network_caveat(outcome)
    }

    /// 分享：指定渠道时打开对应分享链接；否则优先原生分享，不可用时退回复制链接。
    pub async fn share(&mut self, channel: Option<ShareChannel>) -> ActionOutcome {
        let links = match self.links() {
            Ok(links) => links,
            Err(error) => return ActionOutcome::failed(ShareAction::Share, error),
        };
        let content = ShareContent {
            title: self.request.title.clone(),
            description: self.request.description.clone(),
            url: links.canonical.clone(),
        };

        if let Some(channel) = channel {
            let outcome = match build_share_target(channel, &content) {
                Ok(target) => match self.launcher.open(&target).await {
                    Ok(()) => ActionOutcome::succeeded(ShareAction::Share, channel.as_str()),
                    Err(error) => ActionOutcome::failed(ShareAction::Share, error)
                        .with_notice(Notice::manual_fallback(&links.canonical)),
                },
                Err(error) => ActionOutcome::failed(ShareAction::Share, error),
            };
            return if channel.needs_network() {
                self.with_network_caveat(outcome)
            } else {
                outcome
            };
        }

        if self.capabilities.native_share.is_available() {
            match self
                .launcher
                .share(&content.title, &content.native_text(), &content.url)
                .await
            {
                Ok(()) => return ActionOutcome::succeeded(ShareAction::Share, "native"),
                Err(error) => log::warn!("⚠️ 原生分享失败，改为复制链接：{}", error),
            }
        }

        let mut outcome = self.copy_link(LinkKind::Canonical).await;
        outcome.action = ShareAction::Share;
        outcome
    }

    /// 可选的链接可达性探测，结果只影响提示。
    pub async fn check_reachability(&mut self) -> Reachability {
        let result = match self.links() {
            Ok(links) => {
                reachability::probe(
                    &links.canonical,
                    &self.config.reachability,
                    self.env.connectivity.is_online(),
                )
                .await
            }
            Err(_) => Reachability::Skipped,
        };
        self.reachability = result.clone();
        result
    }

    fn default_download_name(&self) -> String {
        let title = self.request.title.trim();
        let title = if title.is_empty() { "survey" } else { title };
        format!("{}_{}_qr.png", title, self.request.identifier)
    }

    fn has_valid_identifier(&self) -> bool {
        is_valid_identifier(Some(&self.request.identifier))
    }

    fn with_network_caveat(&self, outcome: ActionOutcome) -> ActionOutcome {
        if self.env.connectivity.is_online() {
            outcome
        } else {
            outcome.with_notice(Notice::offline())
        }
    }

    fn restart_if_mounted(&mut self, reason: &str) {
        if !self.mounted {
            return;
        }
        self.start_generation(reason);
    }

    fn next_sequence(&self) -> u64 {
        self.state.borrow().sequence + 1
    }

    fn publish(&self, sequence: u64, state: ArtifactRenderState, size: u32) {
        self.state.send_replace(RenderSnapshot {
            sequence,
            state,
            attempts: 0,
            size,
        });
    }

    fn cancel_task(&mut self) {
        if let Some(mut task) = self.task.take() {
            task.cancel();
        }
    }

    fn start_generation(&mut self, reason: &str) {
        self.cancel_task();

        let size = self.artifact_size();
        let sequence = self.next_sequence();

        let url = match self.links() {
            Ok(links) => links.canonical,
            Err(error) => {
                log::warn!("❌ 无法开始生成（{}）：{}", reason, error);
                if let Ok(mut target) = self.surface.lock() {
                    target.clear();
                }
                self.publish(sequence, ArtifactRenderState::Failed(error), size);
                return;
            }
        };

        log::info!("🚀 开始生成序列 #{}（{}）", sequence, reason);
        self.publish(sequence, ArtifactRenderState::Generating, size);

        let renderer = self.renderer.clone();
        let surface = self.surface.clone();
        let state = self.state.clone();

        let spawned = ScheduledTask::spawn(async move {
            let progress = state.clone();
            let outcome = renderer
                .render(&url, &surface, size, move |event| {
                    if let RenderEvent::AttemptStarted { attempt } = event {
                        progress.send_if_modified(|snapshot| {
                            if snapshot.sequence != sequence {
                                return false;
                            }
                            snapshot.attempts = attempt;
                            true
                        });
                    }
                })
                .await;

            state.send_if_modified(|snapshot| {
                if snapshot.sequence != sequence {
                    log::debug!("🗑️ 丢弃过期的生成结果 #{}", sequence);
                    return false;
                }
                match outcome {
                    RenderOutcome::Ready { attempts, .. } => {
                        snapshot.attempts = attempts;
                        snapshot.state = ArtifactRenderState::Ready;
                    }
                    RenderOutcome::Failed { error } => {
                        snapshot.state = ArtifactRenderState::Failed(error);
                    }
                }
                true
            });
        });

        match spawned {
            Ok(task) => self.task = Some(task),
            Err(error) => {
                log::error!("❌ 无法启动生成任务：{}", error);
                self.publish(sequence, ArtifactRenderState::Failed(error), size);
            }
        }
    }
}

/// 导出文件最终位置（仅用于展示）。
pub fn describe_location(receipt: &ExportReceipt) -> String {
    receipt
        .location
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| receipt.file_name.clone())
}
