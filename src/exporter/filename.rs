//! 下载文件名清洗
//!
//! 规则：
//! - 字母数字转小写，`.` / `-` / `_` 保留，其余字符替换为 `_`
//! - 连续的分隔符折叠为一个，首尾分隔符去掉
//! - 结果为空时使用默认文件名
//! - 统一以 `.png` 结尾

const EXTENSION: &str = ".png";

fn is_separator(c: char) -> bool {
    matches!(c, '_' | '.' | '-')
}

/// 清洗建议文件名。
///
/// # 示例
/// ```rust
/// use survey_share::exporter::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("Q4 Feedback", "qrcode.png"), "q4_feedback.png");
/// assert_eq!(sanitize_file_name("!!!", "qrcode.png"), "qrcode.png");
/// ```
pub fn sanitize_file_name(suggested: &str, default_name: &str) -> String {
    let trimmed = suggested.trim();
    let stem = strip_png_extension(trimmed);

    let mut cleaned = String::with_capacity(stem.len());
    for c in stem.chars() {
        let mapped = if c.is_ascii_alphanumeric() {
            c.to_ascii_lowercase()
        } else if is_separator(c) {
            c
        } else {
            '_'
        };

        if is_separator(mapped) && cleaned.chars().last().is_some_and(is_separator) {
            continue;
        }
        cleaned.push(mapped);
    }

    let cleaned = cleaned.trim_matches(is_separator);
    if cleaned.is_empty() {
        return fallback_name(default_name);
    }

    format!("{}{}", cleaned, EXTENSION)
}

fn strip_png_extension(name: &str) -> &str {
    let split = name.len().saturating_sub(EXTENSION.len());
    match (name.get(..split), name.get(split..)) {
        (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(EXTENSION) => stem,
        _ => name,
    }
}

fn fallback_name(default_name: &str) -> String {
    let default_name = default_name.trim();
    if default_name.is_empty() {
        return format!("qrcode{}", EXTENSION);
    }
    if strip_png_extension(default_name).len() == default_name.len() {
        return format!("{}{}", default_name, EXTENSION);
    }
    default_name.to_string()
}
