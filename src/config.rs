//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ShareConfig`：生产域名覆盖、重试/退避、二维码外观、
//! 设备尺寸表、导出默认文件名、可达性探测。运行时行为因此可观测、可调整、可测试。
//! 尺寸预设（compact / standard / print）作为高层语义，映射到底层尺寸组合。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置。
//! - 通过 `serde_json` 从 JSON 文件加载，缺省字段回落到默认值。
//! - `validate` 统一做范围校验，非法配置返回 `ShareError::Config`。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ShareError;

/// 顶层配置。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    pub resolver: ResolverConfig,
    pub render: RenderConfig,
    pub sizing: SizingConfig,
    pub export: ExportConfig,
    pub reachability: ReachabilityConfig,
}

/// 链接解析配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// 已知的生产主机名；当前 origin 的 host 与之相同时改用 `production_origin`。
    pub production_host: String,
    /// 生产环境的规范 origin。
    pub production_origin: String,
    /// 规范链接的路径段（`{origin}/survey/{id}`）。
    pub canonical_segment: String,
    /// 短链接的路径段（`{origin}/s/{id}`）。
    pub short_segment: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            production_host: "ajumapro.com".to_string(),
            production_origin: "https://ajumapro.com".to_string(),
            canonical_segment: "survey".to_string(),
            short_segment: "s".to_string(),
        }
    }
}

/// 纠错等级。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCorrection {
    L,
    M,
    Q,
    H,
}

impl ErrorCorrection {
    pub(crate) fn to_qr(self) -> qrcode::EcLevel {
        match self {
            Self::L => qrcode::EcLevel::L,
            Self::M => qrcode::EcLevel::M,
            Self::Q => qrcode::EcLevel::Q,
            Self::H => qrcode::EcLevel::H,
        }
    }
}

/// 二维码绘制与重试配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// 单个生成序列内允许的最大绘制次数（重试预算上限）。
    pub max_attempts: u32,
    /// 退避基准延迟（毫秒），第 N 次自动重试等待 `base * 2^(N-1)`。
    pub base_retry_delay_ms: u64,
    /// 单次退避延迟上限（毫秒）。
    pub max_retry_delay_ms: u64,
    /// 静区宽度（模块数）。
    pub margin_modules: u32,
    pub error_correction: ErrorCorrection,
    /// 深色模块颜色，`#RRGGBB`。
    pub dark_color: String,
    /// 浅色背景颜色，`#RRGGBB`。
    pub light_color: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_retry_delay_ms: 1_000,
            max_retry_delay_ms: 8_000,
            margin_modules: 2,
            error_correction: ErrorCorrection::M,
            dark_color: "#000000".to_string(),
            light_color: "#FFFFFF".to_string(),
        }
    }
}

impl RenderConfig {
    pub(crate) fn dark_rgb(&self) -> Result<[u8; 3], ShareError> {
        parse_hex_color(&self.dark_color)
    }

    pub(crate) fn light_rgb(&self) -> Result<[u8; 3], ShareError> {
        parse_hex_color(&self.light_color)
    }
}

/// 设备尺寸表（像素）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    pub desktop_size: u32,
    /// 视口宽度 < 480 的手机。
    pub small_mobile_size: u32,
    /// 视口宽度 < 768 的手机。
    pub large_mobile_size: u32,
    pub tablet_size: u32,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            desktop_size: 200,
            small_mobile_size: 280,
            large_mobile_size: 320,
            tablet_size: 250,
        }
    }
}

/// 尺寸预设（面向产品语义）。
///
/// - `Compact`：嵌入小卡片
/// - `Standard`：默认
/// - `Print`：打印 / 海报
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingPreset {
    Compact,
    Standard,
    Print,
}

impl SizingPreset {
    /// 从外部字符串解析预设。
    ///
    /// # 示例
    /// ```rust
    /// use survey_share::config::SizingPreset;
    ///
    /// let preset = SizingPreset::from_str("print")?;
    /// assert_eq!(preset.as_str(), "print");
    /// # Ok::<(), survey_share::error::ShareError>(())
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(preset: &str) -> Result<Self, ShareError> {
        match preset.trim().to_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "standard" => Ok(Self::Standard),
            "print" => Ok(Self::Print),
            other => Err(ShareError::Config(format!(
                "未知尺寸预设：{}（可选：compact / standard / print）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Standard => "standard",
            Self::Print => "print",
        }
    }
}

impl SizingConfig {
    /// 应用尺寸预设。
    pub fn apply_preset(&mut self, preset: SizingPreset) {
        let defaults = Self::default();
        let scale = |size: u32| match preset {
            SizingPreset::Compact => size * 3 / 4,
            SizingPreset::Standard => size,
            SizingPreset::Print => size * 4,
        };

        self.desktop_size = scale(defaults.desktop_size);
        self.small_mobile_size = scale(defaults.small_mobile_size);
        self.large_mobile_size = scale(defaults.large_mobile_size);
        self.tablet_size = scale(defaults.tablet_size);
    }
}

/// 导出配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// 清洗后文件名为空时使用的默认名。
    pub default_file_name: String,
    /// 本地保存目录（仅桌面端 `DirectorySaver` 使用）。
    pub output_dir: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_file_name: "qrcode.png".to_string(),
            output_dir: None,
        }
    }
}

/// 链接可达性探测配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReachabilityConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: 5_000,
        }
    }
}

impl ShareConfig {
    /// 从 JSON 文件加载配置并校验。
    pub fn load_from_file(path: &Path) -> Result<Self, ShareError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ShareError::Config(format!("读取配置文件 '{}' 失败: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ShareError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| ShareError::Config(format!("解析配置失败: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 范围校验。
    pub fn validate(&self) -> Result<(), ShareError> {
        let render = &self.render;
        if !(1..=10).contains(&render.max_attempts) {
            return Err(ShareError::Config("max_attempts 必须在 1~10 之间".to_string()));
        }
        if !(1..=60_000).contains(&render.base_retry_delay_ms) {
            return Err(ShareError::Config("base_retry_delay_ms 必须在 1~60000 毫秒之间".to_string()));
        }
        if render.max_retry_delay_ms < render.base_retry_delay_ms {
            return Err(ShareError::Config(
                "max_retry_delay_ms 不能小于 base_retry_delay_ms".to_string(),
            ));
        }
        if render.margin_modules > 16 {
            return Err(ShareError::Config("margin_modules 不能大于 16".to_string()));
        }
        render.dark_rgb()?;
        render.light_rgb()?;

        let sizing = &self.sizing;
        for (name, size) in [
            ("desktop_size", sizing.desktop_size),
            ("small_mobile_size", sizing.small_mobile_size),
            ("large_mobile_size", sizing.large_mobile_size),
            ("tablet_size", sizing.tablet_size),
        ] {
            if !(64..=4096).contains(&size) {
                return Err(ShareError::Config(format!("{} 必须在 64~4096 像素之间", name)));
            }
        }

        if self.export.default_file_name.trim().is_empty() {
            return Err(ShareError::Config("default_file_name 不能为空".to_string()));
        }

        if !(100..=60_000).contains(&self.reachability.timeout_ms) {
            return Err(ShareError::Config("reachability.timeout_ms 必须在 100~60000 毫秒之间".to_string()));
        }

        let production = reqwest::Url::parse(&self.resolver.production_origin)
            .map_err(|e| ShareError::Config(format!("production_origin 无效: {}", e)))?;
        if production.host_str().is_none() {
            return Err(ShareError::Config("production_origin 缺少主机名".to_string()));
        }

        Ok(())
    }
}

fn parse_hex_color(value: &str) -> Result<[u8; 3], ShareError> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ShareError::Config(format!("颜色格式无效：{}（应为 #RRGGBB）", value)));
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16)
            .map_err(|e| ShareError::Config(format!("颜色格式无效：{} ({})", value, e)))
    };

    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}
