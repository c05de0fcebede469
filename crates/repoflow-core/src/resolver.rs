//! リポジトリ名の解決
//!
//! git リポジトリ URL のパス末尾セグメントを小文字化して RepoName にする。

use crate::error::{CoreError, Result};
use crate::model::RepoName;
use url::Url;

/// URL からリポジトリ名を解決
///
/// # Examples
/// - `https://github.com/acme/widgets` -> `widgets`
/// - `https://github.com/Acme/Widgets/` -> `widgets`
/// - `https://github.com/acme/widgets.git` -> `widgets.git`
///
/// # Errors
/// URL として解釈できない場合、パスが空の場合、末尾セグメントがタグとして
/// 使えない文字を含む場合は `CoreError::InvalidRepoUrl`。
pub fn resolve_repo_name(git_url: &str) -> Result<RepoName> {
    let invalid = |reason: String| CoreError::InvalidRepoUrl {
        url: git_url.to_string(),
        reason,
    };

    let parsed = Url::parse(git_url).map_err(|e| invalid(e.to_string()))?;

    // 末尾スラッシュは無視する
    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .ok_or_else(|| invalid("URL path is empty".to_string()))?;

    let name = RepoName::new(segment.to_lowercase()).map_err(|e| match e {
        CoreError::InvalidRepoName { reason, .. } => invalid(reason),
        other => invalid(other.to_string()),
    })?;

    tracing::debug!("Resolved repo name '{}' from {}", name, git_url);
    Ok(name)
}
