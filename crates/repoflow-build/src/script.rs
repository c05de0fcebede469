//! ビルド前スクリプト
//!
//! `GIT_REPOSITORY_URL` を環境変数に入れて外部シェルスクリプトを実行します。
//! 出力はデーモンの標準出力・標準エラーにそのまま流します。

use crate::error::{BuildError, BuildResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// ビルド前に実行される処理
#[async_trait]
pub trait PreBuildStep: Send + Sync {
    async fn run(&self, git_url: &str) -> BuildResult<()>;
}

/// `sh <script>` を実行する PreBuildStep
#[derive(Debug, Clone)]
pub struct ShellScript {
    script: PathBuf,
}

impl ShellScript {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }

    fn command(&self, git_url: &str) -> Command {
        let mut cmd = Command::new("sh");
        // デーモン自身の環境は汚さず、子プロセスにだけ渡す
        cmd.arg(&self.script)
            .env("GIT_REPOSITORY_URL", git_url)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }
}

#[async_trait]
impl PreBuildStep for ShellScript {
    async fn run(&self, git_url: &str) -> BuildResult<()> {
        tracing::debug!("Running pre-build script: sh {}", self.script.display());

        let status = self.command(git_url).status().await.map_err(|e| {
            BuildError::PreBuildScript(format!(
                "failed to run {}: {}",
                self.script.display(),
                e
            ))
        })?;

        if !status.success() {
            return Err(BuildError::PreBuildScript(format!(
                "{} exited with {}",
                self.script.display(),
                status
            )));
        }

        Ok(())
    }
}
