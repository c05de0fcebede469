use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Pre-build script failed: {0}")]
    PreBuildScript(String),

    #[error("Build context directory not found: {0}")]
    ContextNotFound(PathBuf),

    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error("Build timed out after {secs}s")]
    BuildTimeout { secs: u64 },

    #[error("Failed to obtain registry authorization token: {0}")]
    AuthToken(String),

    #[error("Malformed registry authorization token: {0}")]
    MalformedToken(String),

    #[error("Registry login failed for {registry}: {message}")]
    RegistryLogin { registry: String, message: String },

    #[error("Failed to tag {source_image} as {target}: {message}")]
    TagFailed {
        source_image: String,
        target: String,
        message: String,
    },

    #[error("Push failed: {message}")]
    PushFailed { message: String },

    #[error("Docker connection error: {0}")]
    DockerConnection(#[from] bollard::errors::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::PreBuildScript(msg) => {
                format!(
                    "ビルド前スクリプトが失敗しました: {}\n\
                     \n\
                     build.pre_build_script の内容を確認してください（ビルドは続行します）。",
                    msg
                )
            }
            BuildError::ContextNotFound(path) => {
                format!(
                    "ビルドテンプレートが見つかりません: {}\n\
                     \n\
                     build.templates_dir の設定と言語ごとのディレクトリを確認してください。",
                    path.display()
                )
            }
            BuildError::BuildFailed(msg) => {
                format!(
                    "ビルドに失敗しました: {}\n\
                     \n\
                     Dockerfileとリポジトリの内容を確認してください。",
                    msg
                )
            }
            BuildError::BuildTimeout { secs } => {
                format!(
                    "ビルドが {} 秒以内に完了しませんでした\n\
                     \n\
                     build.timeout_secs を増やすか、ビルド内容を見直してください。",
                    secs
                )
            }
            BuildError::RegistryLogin { registry, .. } => {
                format!(
                    "レジストリ {} へのログインに失敗しました\n\
                     \n\
                     AWS の認証情報と ECR Public の権限を確認してください。",
                    registry
                )
            }
            _ => format!("{}", self),
        }
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
