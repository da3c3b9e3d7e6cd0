//! 排除规则匹配
//!
//! 排除项和候选路径都去掉首尾 `/`，不区分大小写比较；排除项本身或其
//! 子路径均被排除。同一排除项会同时按原文和百分号解码后的形式匹配，
//! 因为目录选择器给出的名称可能带有 URL 编码。

use std::borrow::Cow;

/// 预处理后的排除规则集合
#[derive(Debug, Clone, Default)]
pub struct ExclusionMatcher {
    /// 已规范化（小写、去首尾斜杠）的排除项，含解码形式
    entries: Vec<String>,
}

impl ExclusionMatcher {
    pub fn new<S: AsRef<str>>(excluded_paths: &[S]) -> Self {
        let mut entries = Vec::new();

        for raw in excluded_paths {
            let normalized = raw.as_ref().trim_matches('/');
            if normalized.is_empty() {
                continue;
            }

            let lower = normalized.to_lowercase();
            let decoded = decode(normalized).trim_matches('/').to_lowercase();

            if !decoded.is_empty() && decoded != lower {
                entries.push(decoded);
            }
            entries.push(lower);
        }

        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 判断相对路径是否被排除
    pub fn matches(&self, relative_path: &str) -> bool {
        if self.entries.is_empty() {
            return false;
        }

        let candidate = relative_path.trim_matches('/').to_lowercase();

        self.entries.iter().any(|entry| {
            candidate == *entry
                || (candidate.len() > entry.len()
                    && candidate.starts_with(entry.as_str())
                    && candidate.as_bytes()[entry.len()] == b'/')
        })
    }
}

fn decode(s: &str) -> Cow<'_, str> {
    urlencoding::decode(s).unwrap_or(Cow::Borrowed(s))
}

/// 单次判断，不预处理排除项
pub fn is_excluded<S: AsRef<str>>(relative_path: &str, excluded_paths: &[S]) -> bool {
    ExclusionMatcher::new(excluded_paths).matches(relative_path)
}
