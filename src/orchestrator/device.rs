//! 设备分类与二维码尺寸
//!
//! 通过 User-Agent 判断是否移动设备，再结合视口宽度选择尺寸：
//! 小屏手机（< 480）、大屏手机（< 768）、平板（≥ 768）、桌面。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::SizingConfig;

static MOBILE_AGENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Android|webOS|iPhone|iPad|iPod|BlackBerry|IEMobile|Opera Mini")
        .expect("mobile agent pattern is a valid regex")
});

const SMALL_MOBILE_MAX_WIDTH: u32 = 480;
const LARGE_MOBILE_MAX_WIDTH: u32 = 768;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceClass {
    SmallMobile,
    LargeMobile,
    Tablet,
    Desktop,
}

impl DeviceClass {
    pub fn artifact_size(self, sizing: &SizingConfig) -> u32 {
        match self {
            Self::SmallMobile => sizing.small_mobile_size,
            Self::LargeMobile => sizing.large_mobile_size,
            Self::Tablet => sizing.tablet_size,
            Self::Desktop => sizing.desktop_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// 设备信号（User-Agent + 视口）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSignals {
    pub user_agent: String,
    pub viewport: Viewport,
}

impl Default for DeviceSignals {
    fn default() -> Self {
        Self::desktop()
    }
}

impl DeviceSignals {
    pub fn desktop() -> Self {
        Self {
            user_agent: String::new(),
            viewport: Viewport {
                width: 1280,
                height: 800,
            },
        }
    }

    pub fn new(user_agent: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            user_agent: user_agent.into(),
            viewport: Viewport { width, height },
        }
    }

    pub fn is_mobile_agent(&self) -> bool {
        MOBILE_AGENT.is_match(&self.user_agent)
    }

    pub fn classify(&self) -> DeviceClass {
        if !self.is_mobile_agent() {
            return DeviceClass::Desktop;
        }
        match self.viewport.width {
            w if w < SMALL_MOBILE_MAX_WIDTH => DeviceClass::SmallMobile,
            w if w < LARGE_MOBILE_MAX_WIDTH => DeviceClass::LargeMobile,
            _ => DeviceClass::Tablet,
        }
    }

    pub fn artifact_size(&self, sizing: &SizingConfig) -> u32 {
        self.classify().artifact_size(sizing)
    }
}
