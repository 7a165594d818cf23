//! 分享渠道
//!
//! 为邮件、短信与社交平台构造“分享意图”链接，由 `Launcher::open` 打开。
//! 查询参数统一经 `reqwest::Url` 编码；`mailto:` / `sms:` 中的空格使用 `%20`，
//! 避免邮件客户端把 `+` 原样显示。

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ShareError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareChannel {
    Email,
    Sms,
    Facebook,
    Twitter,
    LinkedIn,
}

impl ShareChannel {
    pub const ALL: [ShareChannel; 5] = [
        ShareChannel::Email,
        ShareChannel::Sms,
        ShareChannel::Facebook,
        ShareChannel::Twitter,
        ShareChannel::LinkedIn,
    ];

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(channel: &str) -> Result<Self, ShareError> {
        match channel.trim().to_lowercase().as_str() {
            "email" | "mail" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            "facebook" => Ok(Self::Facebook),
            "twitter" | "x" => Ok(Self::Twitter),
            "linkedin" => Ok(Self::LinkedIn),
            other => Err(ShareError::InvalidInput(format!("未知分享渠道：{}", other))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Facebook => "facebook",
            Self::Twitter => "twitter",
            Self::LinkedIn => "linkedin",
        }
    }

    /// 是否依赖网络（离线时给出提示）。
    pub fn needs_network(self) -> bool {
        matches!(self, Self::Facebook | Self::Twitter | Self::LinkedIn)
    }
}

/// 分享内容。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareContent {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
}

impl ShareContent {
    /// 原生分享面板使用的文本。
    pub fn native_text(&self) -> String {
        format!("参与问卷：{}", self.title)
    }
}

/// 构造指定渠道的分享链接。
pub fn build_share_target(channel: ShareChannel, content: &ShareContent) -> Result<String, ShareError> {
    match channel {
        ShareChannel::Email => {
            let subject = format!("问卷：{}", content.title);
            let description = content.description.as_deref().unwrap_or_default();
            let body = format!(
                "您好，\n\n诚邀您参与问卷“{}”。\n\n{}\n\n点击以下链接开始填写：\n{}\n\n感谢您的参与！",
                content.title, description, content.url
            );
            Ok(format!("mailto:?{}", encode_query(&[("subject", subject.as_str()), ("body", body.as_str())])?))
        }
        ShareChannel::Sms => {
            let message = format!("问卷：{}\n{}", content.title, content.url);
            Ok(format!("sms:?{}", encode_query(&[("body", message.as_str())])?))
        }
        ShareChannel::Facebook => {
            web_intent("https://www.facebook.com/sharer/sharer.php", &[("u", content.url.as_str())])
        }
        ShareChannel::Twitter => {
            let text = format!("来看看这份问卷：{}", content.title);
            web_intent(
                "https://twitter.com/intent/tweet",
                &[("text", text.as_str()), ("url", content.url.as_str())],
            )
        }
        ShareChannel::LinkedIn => web_intent(
            "https://www.linkedin.com/sharing/share-offsite/",
            &[("url", content.url.as_str())],
        ),
    }
}

fn web_intent(base: &str, params: &[(&str, &str)]) -> Result<String, ShareError> {
    Url::parse_with_params(base, params)
        .map(String::from)
        .map_err(|e| ShareError::InvalidInput(format!("无法构造分享链接：{}", e)))
}

fn encode_query(params: &[(&str, &str)]) -> Result<String, ShareError> {
    let mut scratch = Url::parse("https://share.invalid/")
        .map_err(|e| ShareError::InvalidInput(format!("无法构造分享链接：{}", e)))?;
    scratch.query_pairs_mut().extend_pairs(params);
    Ok(scratch.query().unwrap_or_default().replace('+', "%20"))
}
