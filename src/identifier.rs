//! 问卷标识符校验模块
//!
//! # 设计思路
//!
//! 标识符由数据层生成，对本模块只读。所有后续工作（解析链接、绘制、导出）
//! 都以“标识符合法”为硬前置条件：不合法时直接进入终态，不做任何网络或绘制尝试。
//!
//! # 实现思路
//!
//! - 规范格式为 36 字符、按 8-4-4-4-12 分段的十六进制串，大小写不敏感。
//! - 通过 `once_cell::sync::Lazy` 在首次调用时编译正则，后续零成本复用。
//! - `SurveyId` 新类型保证“拿到即合法”，下游函数不再重复校验。

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ShareError;

static SURVEY_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("survey id pattern is a valid regex")
});

/// 判断标识符是否符合规范格式
///
/// `None` 与空串一律视为非法。不做 trim：带空白的输入同样非法。
pub fn is_valid_identifier(id: Option<&str>) -> bool {
    match id {
        Some(value) if value.len() == 36 => SURVEY_ID_PATTERN.is_match(value),
        _ => false,
    }
}

/// 已校验的问卷标识符。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SurveyId(String);

impl SurveyId {
    /// 校验并包装标识符，保留调用方传入的大小写。
    ///
    /// # 示例
    /// ```rust
    /// use survey_share::identifier::SurveyId;
    ///
    /// let id = SurveyId::parse("85ec5b20-5af6-4479-8bd8-34ae409e2d64")?;
    /// assert_eq!(id.as_str(), "85ec5b20-5af6-4479-8bd8-34ae409e2d64");
    /// # Ok::<(), survey_share::error::ShareError>(())
    /// ```
    pub fn parse(id: &str) -> Result<Self, ShareError> {
        if is_valid_identifier(Some(id)) {
            Ok(Self(id.to_string()))
        } else {
            Err(ShareError::InvalidInput(format!("问卷标识符格式无效：{:?}", id)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SurveyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for SurveyId {
    type Error = ShareError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for SurveyId {
    type Error = ShareError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SurveyId> for String {
    fn from(id: SurveyId) -> Self {
        id.0
    }
}
