//! イメージ公開処理
//!
//! ビルドしたイメージをレジストリの名前空間にタグ付けしてプッシュします。
//! トークン取得 → デコード → ログイン → タグ付け → プッシュ の順に実行し、
//! どこで失敗したかをエラーの種類で区別します。

use crate::auth::{TokenSource, decode_authorization_token};
use crate::error::BuildResult;
use crate::registry::ImageRegistry;
use repoflow_core::{RegistryConfig, RepoName};
use std::sync::Arc;

/// レジストリへの公開を実行するハンドラ
pub struct RegistryPublisher {
    tokens: Arc<dyn TokenSource>,
    registry: Arc<dyn ImageRegistry>,
    config: RegistryConfig,
}

impl RegistryPublisher {
    pub fn new(
        tokens: Arc<dyn TokenSource>,
        registry: Arc<dyn ImageRegistry>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            tokens,
            registry,
            config,
        }
    }

    /// `<repo>:latest` を `<namespace>/<repository>:<repo>` として公開
    ///
    /// # Returns
    /// プッシュ成功時は完全なイメージ名を返す
    pub async fn publish(&self, repo: &RepoName) -> BuildResult<String> {
        let image = self.config.image_base();
        let full_image = self.config.image_for(repo);

        // 1. 一時トークンを取得
        let token = self.tokens.authorization_token().await?;

        // 2. username:password にデコード
        let credential = decode_authorization_token(&token, self.config.server_address())?;

        // 3. ログイン
        self.registry.login(&credential).await?;

        // 4. 名前空間付きのタグを付ける
        self.registry
            .tag(&repo.local_image(), &image, repo.as_str())
            .await?;

        // 5. プッシュ
        tracing::info!("Pushing {}", full_image);
        if let Err(e) = self.registry.push(&image, repo.as_str(), &credential).await {
            self.cleanup_tag(&full_image).await;
            return Err(e);
        }

        Ok(full_image)
    }

    /// プッシュ失敗時に付けたタグを外す（失敗してもログのみ）
    async fn cleanup_tag(&self, full_image: &str) {
        match self.registry.remove_tag(full_image).await {
            Ok(()) => tracing::debug!("Removed tag {} after failed push", full_image),
            Err(e) => tracing::warn!("Failed to remove tag {}: {}", full_image, e),
        }
    }
}
