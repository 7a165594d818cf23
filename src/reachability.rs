//! 链接可达性探测
//!
//! 对分发链接发一次 `HEAD` 请求，结果只用于追加提示，从不阻塞生成或导出。

use std::time::Duration;

use serde::Serialize;

use crate::config::ReachabilityConfig;
use crate::resolver::redact_url_for_log;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Reachability {
    Reachable { status: u16 },
    Unreachable { reason: String },
    /// 未启用或离线时不探测。
    Skipped,
}

pub async fn probe(url: &str, config: &ReachabilityConfig, online: bool) -> Reachability {
    if !config.enabled || !online {
        return Reachability::Skipped;
    }

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            return Reachability::Unreachable {
                reason: format!("HTTP 客户端初始化失败：{}", err),
            };
        }
    };

    match client.head(url).send().await {
        Ok(response) if response.status().is_success() || response.status().is_redirection() => {
            log::debug!("🌐 链接可访问：{} ({})", redact_url_for_log(url), response.status());
            Reachability::Reachable {
                status: response.status().as_u16(),
            }
        }
        Ok(response) => {
            log::warn!("⚠️ 链接返回异常状态：{} ({})", redact_url_for_log(url), response.status());
            Reachability::Unreachable {
                reason: format!("HTTP {}", response.status().as_u16()),
            }
        }
        Err(err) => {
            log::warn!("⚠️ 链接暂时无法访问：{}：{}", redact_url_for_log(url), err);
            Reachability::Unreachable {
                reason: err.to_string(),
            }
        }
    }
}
