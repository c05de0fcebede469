//! コンテナレジストリ操作
//!
//! ログイン・タグ付け・プッシュ・タグ削除を ImageRegistry トレイトにまとめ、
//! Docker Engine（Bollard + docker CLI）で実装します。

// Bollard 0.19 の非推奨APIを一時的に使用
#![allow(deprecated)]

use crate::error::{BuildError, BuildResult};
use async_trait::async_trait;
use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::image::{PushImageOptions, RemoveImageOptions, TagImageOptions};
use futures_util::StreamExt;
use repoflow_core::RegistryCredential;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const DOCKER_CONFIG_ENV: &str = "DOCKER_CONFIG";

/// イメージを公開するためのレジストリ操作
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// レジストリにログイン
    async fn login(&self, credential: &RegistryCredential) -> BuildResult<()>;

    /// `source` を `image:tag` としてタグ付け
    async fn tag(&self, source: &str, image: &str, tag: &str) -> BuildResult<()>;

    /// `image:tag` をプッシュ
    async fn push(&self, image: &str, tag: &str, credential: &RegistryCredential)
    -> BuildResult<()>;

    /// ローカルのタグを削除（イメージ本体は残る）
    async fn remove_tag(&self, reference: &str) -> BuildResult<()>;
}

/// Docker Engine を使うレジストリ実装
pub struct DockerRegistry {
    docker: Docker,
    cli: String,
}

impl DockerRegistry {
    pub fn new(docker: Docker) -> Self {
        Self {
            docker,
            cli: "docker".to_string(),
        }
    }

    /// ローカルの Docker Engine に接続して作成
    pub fn connect_local() -> BuildResult<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self::new(docker))
    }

    /// login に使う docker 互換 CLI を差し替える
    pub fn with_cli(mut self, cli: impl Into<String>) -> Self {
        self.cli = cli.into();
        self
    }

    fn to_docker_credentials(credential: &RegistryCredential) -> DockerCredentials {
        DockerCredentials {
            username: Some(credential.username.clone()),
            password: Some(credential.password.clone()),
            serveraddress: Some(credential.server_address.clone()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ImageRegistry for DockerRegistry {
    async fn login(&self, credential: &RegistryCredential) -> BuildResult<()> {
        let registry = credential.server_address.clone();
        let login_error = |message: String| BuildError::RegistryLogin {
            registry: registry.clone(),
            message,
        };

        // 認証情報は呼び出しごとの一時 DOCKER_CONFIG にだけ書かせ、
        // ディレクトリごと破棄する（~/.docker/config.json には残さない）
        let docker_config = tempfile::Builder::new()
            .prefix("repoflow-docker-")
            .tempdir()
            .map_err(|e| login_error(format!("Failed to create docker config dir: {}", e)))?;

        // パスワードはコマンドラインに載せず stdin で渡す
        let mut child = Command::new(&self.cli)
            .env(DOCKER_CONFIG_ENV, docker_config.path())
            .arg("login")
            .arg("--username")
            .arg(&credential.username)
            .arg("--password-stdin")
            .arg(&credential.server_address)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| login_error(format!("Failed to run {} login: {}", self.cli, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(credential.password.as_bytes())
                .await
                .map_err(|e| login_error(format!("Failed to write password: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| login_error(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(login_error(stderr.trim().to_string()));
        }

        tracing::info!("Docker login successful: {}", credential.server_address);
        Ok(())
    }

    async fn tag(&self, source: &str, image: &str, tag: &str) -> BuildResult<()> {
        let options = TagImageOptions {
            repo: image.to_string(),
            tag: tag.to_string(),
        };

        self.docker
            .tag_image(source, Some(options))
            .await
            .map_err(|e| BuildError::TagFailed {
                source_image: source.to_string(),
                target: format!("{}:{}", image, tag),
                message: e.to_string(),
            })?;

        tracing::info!("Tagged {} as {}:{}", source, image, tag);
        Ok(())
    }

    async fn push(
        &self,
        image: &str,
        tag: &str,
        credential: &RegistryCredential,
    ) -> BuildResult<()> {
        let options = PushImageOptions::<String> {
            tag: tag.to_string(),
        };

        let mut stream = self.docker.push_image(
            image,
            Some(options),
            Some(Self::to_docker_credentials(credential)),
        );

        let mut error_message: Option<String> = None;
        let mut last_status = String::new();

        // ストリームは最後まで読み切ってから閉じる
        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(err) = info.error {
                        error_message = Some(err);
                    } else if let Some(status) = info.status
                        && status != last_status
                    {
                        tracing::debug!("push {}:{}: {}", image, tag, status);
                        last_status = status;
                    }
                }
                Err(e) => {
                    return Err(BuildError::PushFailed {
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(err) = error_message {
            return Err(BuildError::PushFailed { message: err });
        }

        tracing::info!("Pushed {}:{}", image, tag);
        Ok(())
    }

    async fn remove_tag(&self, reference: &str) -> BuildResult<()> {
        let options = RemoveImageOptions {
            noprune: true,
            ..Default::default()
        };

        self.docker
            .remove_image(reference, Some(options), None)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    #[test]
    fn test_docker_credentials_conversion() {
        let credential = RegistryCredential {
            username: "AWS".to_string(),
            password: "secret".to_string(),
            server_address: "public.ecr.aws".to_string(),
            expires_at: None,
        };

        let creds = DockerRegistry::to_docker_credentials(&credential);
        assert_eq!(creds.username.as_deref(), Some("AWS"));
        assert_eq!(creds.password.as_deref(), Some("secret"));
        assert_eq!(creds.serveraddress.as_deref(), Some("public.ecr.aws"));
        assert!(creds.identitytoken.is_none());
    }

    fn credential() -> RegistryCredential {
        RegistryCredential {
            username: "AWS".to_string(),
            password: "s3cret-token".to_string(),
            server_address: "public.ecr.aws".to_string(),
            expires_at: None,
        }
    }

    /// docker の代わりに実行されるスクリプトを用意する。
    /// 引数・stdin・DOCKER_CONFIG を `out_dir` に記録し、DOCKER_CONFIG に
    /// config.json を書き込む。
    fn fake_cli(out_dir: &Path, exit_code: i32) -> DockerRegistry {
        let script = out_dir.join("fake-docker");
        let body = format!(
            "#!/bin/sh\n\
             printf '%s ' \"$@\" > '{out}/args.txt'\n\
             cat > '{out}/stdin.txt'\n\
             printf '%s' \"$DOCKER_CONFIG\" > '{out}/docker_config.txt'\n\
             echo '{{\"auths\":{{}}}}' > \"$DOCKER_CONFIG/config.json\"\n\
             echo 'login denied' >&2\n\
             exit {code}\n",
            out = out_dir.display(),
            code = exit_code
        );
        fs::write(&script, body).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        DockerRegistry::connect_local()
            .unwrap()
            .with_cli(script.to_string_lossy())
    }

    #[tokio::test]
    async fn test_login_passes_password_on_stdin_only() {
        let out_dir = tempfile::tempdir().unwrap();
        let registry = fake_cli(out_dir.path(), 0);

        registry.login(&credential()).await.unwrap();

        let args = fs::read_to_string(out_dir.path().join("args.txt")).unwrap();
        assert_eq!(
            args.trim_end(),
            "login --username AWS --password-stdin public.ecr.aws"
        );
        assert!(!args.contains("s3cret-token"));

        let stdin = fs::read_to_string(out_dir.path().join("stdin.txt")).unwrap();
        assert_eq!(stdin, "s3cret-token");
    }

    #[tokio::test]
    async fn test_login_config_is_discarded() {
        let out_dir = tempfile::tempdir().unwrap();
        let registry = fake_cli(out_dir.path(), 0);

        registry.login(&credential()).await.unwrap();

        let docker_config =
            PathBuf::from(fs::read_to_string(out_dir.path().join("docker_config.txt")).unwrap());
        assert!(
            docker_config
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("repoflow-docker-")
        );
        assert!(!docker_config.exists());
    }

    #[tokio::test]
    async fn test_login_failure() {
        let out_dir = tempfile::tempdir().unwrap();
        let registry = fake_cli(out_dir.path(), 1);

        let err = registry.login(&credential()).await.unwrap_err();
        match err {
            BuildError::RegistryLogin { registry, message } => {
                assert_eq!(registry, "public.ecr.aws");
                assert!(message.contains("login denied"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_missing_cli() {
        let registry = DockerRegistry::connect_local()
            .unwrap()
            .with_cli("/nonexistent/repoflow-docker");

        let err = registry.login(&credential()).await.unwrap_err();
        assert!(matches!(err, BuildError::RegistryLogin { .. }));
    }

    #[tokio::test]
    #[ignore] // Docker接続が必要なため、通常のテストではスキップ
    async fn test_tag_and_remove() {
        let registry = DockerRegistry::connect_local().unwrap();
        registry
            .tag("alpine:latest", "localhost:5000/repoflow-test", "widgets")
            .await
            .unwrap();
        registry
            .remove_tag("localhost:5000/repoflow-test:widgets")
            .await
            .unwrap();
    }
}
