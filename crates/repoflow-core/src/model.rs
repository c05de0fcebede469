//! リクエストスコープのモデル定義

use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Docker タグとして許可される最大長
const MAX_TAG_LENGTH: usize = 128;

/// `POST /project` のリクエストボディ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    /// デプロイ対象の git リポジトリ URL
    pub giturl: String,
    /// ビルドに使うターゲット言語（現在は "golang" のみ）
    pub language: String,
}

/// サポートしているターゲット言語
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Golang,
}

impl Language {
    /// ワイヤー上の表記
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Golang => "golang",
        }
    }

    /// ビルドテンプレートのディレクトリ名
    pub fn template_dir(&self) -> &'static str {
        match self {
            Self::Golang => "golang",
        }
    }
}

impl FromStr for Language {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "golang" => Ok(Self::Golang),
            other => Err(CoreError::UnsupportedLanguage(other.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// リポジトリ URL から導出した識別子
///
/// ローカルイメージのタグ、レジストリのタグ、タスク名を兼ねるため、
/// Docker タグとして安全な文字列であることを構築時に保証する。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoName(String);

impl RepoName {
    /// タグ安全性を検証して RepoName を作成
    ///
    /// 制約:
    /// - 1〜128文字
    /// - 英小文字・数字・ピリオド・ハイフン・アンダースコアのみ
    /// - 先頭と末尾は英数字
    /// - 英数字の間の区切りは `.`・`_`・`__`・1個以上の `-` のいずれか
    ///   （`a..b`・`a.-b`・`a___b` などは不可）
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: String| CoreError::InvalidRepoName {
            name: name.clone(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("name is empty".to_string()));
        }

        if name.len() > MAX_TAG_LENGTH {
            return Err(invalid(format!(
                "too long ({} characters, max {})",
                name.len(),
                MAX_TAG_LENGTH
            )));
        }

        for c in name.chars() {
            let allowed = c.is_ascii_lowercase()
                || c.is_ascii_digit()
                || c == '.'
                || c == '-'
                || c == '_';
            if !allowed {
                return Err(invalid(format!("invalid character '{}'", c)));
            }
        }

        let first = name.chars().next().unwrap_or('.');
        let last = name.chars().last().unwrap_or('.');
        if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
            return Err(invalid(
                "must start and end with a letter or digit".to_string(),
            ));
        }

        if let Some(separator) = invalid_separator(&name) {
            return Err(invalid(format!("invalid separator '{}'", separator)));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ビルド直後のローカルイメージ参照 (`<repo>:latest`)
    pub fn local_image(&self) -> String {
        format!("{}:latest", self.0)
    }
}

/// 英数字の間にある区切り文字列のうち、イメージ名の文法
/// `[a-z0-9]+((\.|_|__|-+)[a-z0-9]+)*` に合わない最初のもの
fn invalid_separator(name: &str) -> Option<&str> {
    name.split(|c: char| c.is_ascii_alphanumeric())
        .filter(|sep| !sep.is_empty())
        .find(|sep| !matches!(*sep, "." | "_" | "__") && !sep.chars().all(|c| c == '-'))
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RepoName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// レジストリへのプッシュに使う一時的な認証情報
///
/// 永続化もログ出力もしない。`Debug` ではパスワードを伏せる。
#[derive(Clone)]
pub struct RegistryCredential {
    pub username: String,
    pub password: String,
    pub server_address: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for RegistryCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("server_address", &self.server_address)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// 起動したタスクに到達するためのアドレスとポート
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEndpoint {
    pub address: String,
    pub port: u16,
}

impl TaskEndpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// `http://<address>:<port>` 形式の URL
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }
}

impl fmt::Display for TaskEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// 成功したデプロイの結果
#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    pub repo_name: String,
    /// レジストリにプッシュしたイメージの完全な参照
    pub image: String,
    pub task_id: String,
    pub endpoint: TaskEndpoint,
}
