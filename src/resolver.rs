//! 分发链接解析模块
//!
//! # 设计思路
//!
//! 分发链接是“派生值”：每次调用都用**当前**运行时 origin 重新拼接，绝不跨环境缓存。
//! 同一份代码部署在自定义域名、预览域名、本地开发环境时，无需改配置即可得到正确链接。
//!
//! # 实现思路
//!
//! - origin 作为显式参数传入，而不是读取全局状态，测试时直接注入即可。
//! - origin 统一规整为 `scheme://host[:port]`，丢弃路径、查询与片段。
//! - 当 host 等于已知生产主机名时，改用配置中的生产 origin（唯一的硬编码覆盖）。
//! - 链接形态保持稳定：规范链接 `{origin}/survey/{id}`，短链接 `{origin}/s/{id}`。

use serde::Serialize;

use crate::config::ResolverConfig;
use crate::error::ShareError;
use crate::identifier::SurveyId;

/// 链接形态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkKind {
    Canonical,
    Short,
}

/// 一次解析得到的全部分发链接。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionLinks {
    pub identifier: SurveyId,
    pub origin: String,
    pub canonical: String,
    pub short: String,
}

impl DistributionLinks {
    pub fn get(&self, kind: LinkKind) -> &str {
        match kind {
            LinkKind::Canonical => &self.canonical,
            LinkKind::Short => &self.short,
        }
    }
}

/// 分发链接解析器。
#[derive(Debug, Clone)]
pub struct UrlResolver {
    config: ResolverConfig,
}

impl UrlResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// 将当前运行时 origin 规整为分发使用的 origin。
    pub fn resolve_origin(&self, active_origin: &str) -> Result<String, ShareError> {
        let parsed = reqwest::Url::parse(active_origin.trim())
            .map_err(|e| ShareError::InvalidInput(format!("运行时 origin 无效：{} ({})", active_origin, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ShareError::InvalidInput(format!(
                "运行时 origin 仅支持 HTTP/HTTPS：{}",
                active_origin
            )));
        }

        let Some(host) = parsed.host_str() else {
            return Err(ShareError::InvalidInput(format!("运行时 origin 缺少主机名：{}", active_origin)));
        };

        if host.eq_ignore_ascii_case(&self.config.production_host) {
            return Ok(self.config.production_origin.trim_end_matches('/').to_string());
        }

        Ok(parsed.origin().ascii_serialization())
    }

    /// 生成规范分发链接 `{origin}/survey/{id}`。
    ///
    /// # 示例
    /// ```rust
    /// use survey_share::config::ResolverConfig;
    /// use survey_share::resolver::UrlResolver;
    ///
    /// let resolver = UrlResolver::new(ResolverConfig::default());
    /// let url = resolver.resolve_distribution_url(
    ///     "https://app.example.com",
    ///     "85ec5b20-5af6-4479-8bd8-34ae409e2d64",
    /// )?;
    /// assert_eq!(url, "https://app.example.com/survey/85ec5b20-5af6-4479-8bd8-34ae409e2d64");
    /// # Ok::<(), survey_share::error::ShareError>(())
    /// ```
    pub fn resolve_distribution_url(&self, active_origin: &str, identifier: &str) -> Result<String, ShareError> {
        let id = SurveyId::parse(identifier)?;
        let origin = self.resolve_origin(active_origin)?;
        build_url(&origin, &self.config.canonical_segment, &id)
    }

    /// 生成短链接 `{origin}/s/{id}`。
    pub fn resolve_short_url(&self, active_origin: &str, identifier: &str) -> Result<String, ShareError> {
        let id = SurveyId::parse(identifier)?;
        let origin = self.resolve_origin(active_origin)?;
        build_url(&origin, &self.config.short_segment, &id)
    }

    /// 一次性解析规范链接与短链接。
    pub fn resolve_links(&self, active_origin: &str, identifier: &str) -> Result<DistributionLinks, ShareError> {
        let id = SurveyId::parse(identifier)?;
        let origin = self.resolve_origin(active_origin)?;
        let canonical = build_url(&origin, &self.config.canonical_segment, &id)?;
        let short = build_url(&origin, &self.config.short_segment, &id)?;

        log::debug!("🔗 已解析分发链接 - origin: {} id: {}", origin, id);

        Ok(DistributionLinks {
            identifier: id,
            origin,
            canonical,
            short,
        })
    }
}

fn build_url(origin: &str, segment: &str, id: &SurveyId) -> Result<String, ShareError> {
    let url = format!("{}/{}/{}", origin, segment.trim_matches('/'), id);
    if !is_valid_url(&url) {
        return Err(ShareError::InvalidInput(format!("生成的分发链接无效：{}", url)));
    }
    Ok(url)
}

/// URL 语法校验。
pub fn is_valid_url(url: &str) -> bool {
    reqwest::Url::parse(url).is_ok()
}

/// 日志中去掉查询串与片段，避免泄露追踪参数。
pub(crate) fn redact_url_for_log(url: &str) -> String {
    let Ok(mut parsed) = reqwest::Url::parse(url) else {
        return "<invalid-url>".to_string();
    };
    parsed.set_query(None);
    parsed.set_fragment(None);
    parsed.to_string()
}
