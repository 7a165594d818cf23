//! # 问卷分享 — 命令行入口
//!
//! 解析链接、生成二维码并导出 PNG，按需复制 / 打开 / 分享，最后以 JSON 输出结果。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use survey_share::config::{ShareConfig, SizingPreset};
use survey_share::error::ShareError;
use survey_share::orchestrator::{
    ActionOutcome, ArtifactRenderState, Connectivity, DeviceSignals, DistributionOrchestrator, Notice,
    PlatformServices, RuntimeEnvironment, ShareRequest, describe_location,
};
use survey_share::renderer::{CanvasSurface, shared_surface};
use survey_share::resolver::{DistributionLinks, LinkKind};
use survey_share::share::ShareChannel;

#[derive(Parser, Debug)]
#[command(name = "survey-share")]
#[command(about = "生成问卷分享链接与二维码")]
struct Args {
    /// 问卷标识符
    identifier: String,

    /// 当前部署的 origin
    #[arg(long, default_value = "http://localhost:3000")]
    origin: String,

    /// 问卷标题
    #[arg(long, default_value = "")]
    title: String,

    #[arg(long)]
    description: Option<String>,

    /// JSON 配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 尺寸预设（compact / standard / print）
    #[arg(long)]
    preset: Option<String>,

    /// PNG 保存目录
    #[arg(long)]
    out: Option<PathBuf>,

    /// 建议文件名（会被清洗）
    #[arg(long)]
    name: Option<String>,

    /// 复制链接到剪贴板
    #[arg(long)]
    copy: bool,

    /// 用系统默认程序打开链接
    #[arg(long)]
    open: bool,

    /// 分享渠道（email / sms / facebook / twitter / linkedin）
    #[arg(long)]
    share: Option<String>,

    /// 复制 / 打开时使用短链接
    #[arg(long)]
    short: bool,

    #[arg(long, default_value = "")]
    user_agent: String,

    #[arg(long, default_value_t = 1280)]
    viewport_width: u32,

    #[arg(long, default_value_t = 800)]
    viewport_height: u32,

    /// 模拟离线
    #[arg(long)]
    offline: bool,

    /// 探测链接可达性
    #[arg(long)]
    probe: bool,
}

#[derive(Serialize)]
struct Summary {
    state: ArtifactRenderState,
    links: Option<DistributionLinks>,
    outcomes: Vec<ActionOutcome>,
    notices: Vec<Notice>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("❌ [{}] {}", err.code(), err);
            eprintln!("{}", err.user_message());
            ExitCode::from(2)
        }
    }
}

fn load_config(args: &Args) -> Result<ShareConfig, ShareError> {
    let mut config = match &args.config {
        Some(path) => ShareConfig::load_from_file(path)?,
        None => ShareConfig::default(),
    };

    if let Some(preset) = &args.preset {
        config.sizing.apply_preset(SizingPreset::from_str(preset)?);
    }
    if let Some(out) = &args.out {
        config.export.output_dir = Some(out.clone());
    }
    if args.probe {
        config.reachability.enabled = true;
    }

    config.validate()?;
    Ok(config)
}

async fn run(args: Args) -> Result<bool, ShareError> {
    let config = load_config(&args)?;
    let channel = args.share.as_deref().map(ShareChannel::from_str).transpose()?;
    let services = PlatformServices::native(&config)?;

    let mut env = RuntimeEnvironment::new(args.origin.clone());
    env.device = DeviceSignals::new(args.user_agent.clone(), args.viewport_width, args.viewport_height);
    if args.offline {
        env.connectivity = Connectivity::Offline;
    }

    let mut request = ShareRequest::new(args.identifier.clone(), args.title.clone());
    if let Some(description) = &args.description {
        request = request.with_description(description.clone());
    }

    let mut orchestrator =
        DistributionOrchestrator::new(config, services, shared_surface(CanvasSurface::new()), request, env)?;

    orchestrator.mount();
    let state = orchestrator.settled().await;
    let kind = if args.short { LinkKind::Short } else { LinkKind::Canonical };

    let mut outcomes = Vec::new();
    if state.is_ready() {
        let outcome = orchestrator.download(args.name.as_deref()).await;
        if let Some(receipt) = &outcome.export {
            log::info!("💾 二维码已保存：{}", describe_location(receipt));
        }
        outcomes.push(outcome);
    }
    if args.copy {
        outcomes.push(orchestrator.copy_link(kind).await);
    }
    if args.open {
        outcomes.push(orchestrator.open(kind).await);
    }
    if let Some(channel) = channel {
        outcomes.push(orchestrator.share(Some(channel)).await);
    }
    if args.probe {
        orchestrator.check_reachability().await;
    }

    let links = orchestrator.links().ok();
    let succeeded = links.is_some() && (state.is_ready() || outcomes.iter().any(|o| o.success));

    let summary = Summary {
        state,
        links,
        outcomes,
        notices: orchestrator.notices(),
    };
    let json = serde_json::to_string_pretty(&summary)
        .map_err(|e| ShareError::Io(format!("序列化结果失败：{}", e)))?;
    println!("{}", json);

    orchestrator.unmount();
    Ok(succeeded)
}
