//! レジストリ認証処理
//!
//! レジストリのトークンサービスから取得した Base64 トークンを
//! `username:password` に分解し、RegistryCredential に変換します。

use crate::error::{BuildError, BuildResult};
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use repoflow_core::RegistryCredential;
use std::fmt;

/// トークンサービスが返す一時的な認証トークン
#[derive(Clone)]
pub struct AuthorizationToken {
    /// Base64エンコードされた "username:password"
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for AuthorizationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// レジストリの一時トークンを発行するサービス
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// トークンを取得する
    ///
    /// 呼び出しの失敗、または認証データが空の場合は `BuildError::AuthToken`。
    async fn authorization_token(&self) -> BuildResult<AuthorizationToken>;
}

/// Base64エンコードされた認証トークンをデコード
///
/// 最初の `:` でユーザー名とパスワードに分割する（パスワード側に `:` が
/// 含まれていてもよい）。
///
/// # Errors
/// Base64 として不正、UTF-8 でない、`:` が無い場合は `BuildError::MalformedToken`。
pub fn decode_authorization_token(
    token: &AuthorizationToken,
    server_address: &str,
) -> BuildResult<RegistryCredential> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(token.token.trim())
        .map_err(|e| BuildError::MalformedToken(format!("Failed to decode token: {}", e)))?;

    let auth_str = String::from_utf8(decoded)
        .map_err(|e| BuildError::MalformedToken(format!("Invalid UTF-8 in token: {}", e)))?;

    let (username, password) = auth_str.split_once(':').ok_or_else(|| {
        BuildError::MalformedToken("token has no ':' separator".to_string())
    })?;

    Ok(RegistryCredential {
        username: username.to_string(),
        password: password.to_string(),
        server_address: server_address.to_string(),
        expires_at: token.expires_at,
    })
}
