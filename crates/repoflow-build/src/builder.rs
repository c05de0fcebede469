use crate::error::{BuildError, BuildResult};
use async_trait::async_trait;
use repoflow_core::{Language, RepoName};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// リポジトリからローカルイメージを作るビルドツール
#[async_trait]
pub trait BuildTool: Send + Sync {
    /// イメージをビルドし、ローカルイメージ参照（`<repo>:latest`）を返す
    async fn build(&self, repo: &RepoName, git_url: &str, language: Language)
    -> BuildResult<String>;
}

/// `docker build` を言語テンプレートのディレクトリで実行するビルダー
pub struct ImageBuilder {
    program: String,
    templates_dir: PathBuf,
    timeout: Duration,
}

impl ImageBuilder {
    pub fn new(templates_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: "docker".to_string(),
            templates_dir: templates_dir.into(),
            timeout,
        }
    }

    /// docker 以外の互換 CLI（podman など）を使う
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// 言語に対応するビルドコンテキスト
    pub fn context_dir(&self, language: Language) -> PathBuf {
        self.templates_dir.join(language.template_dir())
    }

    fn command(&self, repo: &RepoName, git_url: &str, language: Language) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("build")
            .arg("--build-arg")
            .arg(format!("GIT_REPOSITORY_URL={}", git_url))
            .arg("-t")
            .arg(repo.as_str())
            .arg(".")
            .current_dir(self.context_dir(language))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // タイムアウトで future を捨てたら子プロセスも止める
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl BuildTool for ImageBuilder {
    async fn build(
        &self,
        repo: &RepoName,
        git_url: &str,
        language: Language,
    ) -> BuildResult<String> {
        let context = self.context_dir(language);
        if !context.is_dir() {
            return Err(BuildError::ContextNotFound(context));
        }

        tracing::info!("Building image: {}", repo.local_image());

        let mut cmd = self.command(repo, git_url, language);
        tracing::debug!("Build command: {:?}", cmd.as_std());

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| {
                BuildError::BuildFailed(format!("failed to run {}: {}", self.program, e))
            })?,
            Err(_) => {
                return Err(BuildError::BuildTimeout {
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BuildError::BuildFailed(format!(
                "{} build exited with {}\n{}",
                self.program,
                output.status,
                stderr.trim_end()
            )));
        }

        tracing::info!("Successfully built: {}", repo.local_image());
        Ok(repo.local_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// `sh build ...` はコンテキスト内の `build` ファイルをスクリプトとして実行する。
    /// docker の代わりに使い、引数とカレントディレクトリを検証する。
    fn fake_builder(script: &str, timeout: Duration) -> (tempfile::TempDir, ImageBuilder) {
        let temp_dir = tempfile::tempdir().unwrap();
        let context = temp_dir.path().join("golang");
        fs::create_dir(&context).unwrap();
        fs::write(context.join("build"), script).unwrap();

        let builder = ImageBuilder::new(temp_dir.path(), timeout).with_program("sh");
        (temp_dir, builder)
    }

    #[test]
    fn test_command_line() {
        let builder = ImageBuilder::new("docker-files", Duration::from_secs(60));
        let repo = RepoName::new("widgets").unwrap();
        let cmd = builder.command(&repo, "https://github.com/acme/widgets", Language::Golang);
        let std_cmd = cmd.as_std();

        assert_eq!(std_cmd.get_program(), "docker");
        let args: Vec<_> = std_cmd
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args,
            vec![
                "build",
                "--build-arg",
                "GIT_REPOSITORY_URL=https://github.com/acme/widgets",
                "-t",
                "widgets",
                "."
            ]
        );
        assert_eq!(
            std_cmd.get_current_dir(),
            Some(PathBuf::from("docker-files").join("golang").as_path())
        );
    }

    #[tokio::test]
    async fn test_build_success_returns_local_image() {
        let (temp_dir, builder) = fake_builder(
            "printf '%s ' \"$@\" > args.txt\n",
            Duration::from_secs(30),
        );
        let repo = RepoName::new("widgets").unwrap();

        let image = builder
            .build(&repo, "https://github.com/acme/widgets", Language::Golang)
            .await
            .unwrap();
        assert_eq!(image, "widgets:latest");

        let args = fs::read_to_string(temp_dir.path().join("golang").join("args.txt")).unwrap();
        assert!(args.contains("GIT_REPOSITORY_URL=https://github.com/acme/widgets"));
        assert!(args.contains("-t widgets ."));
    }

    #[tokio::test]
    async fn test_build_failure_carries_stderr() {
        let (_temp_dir, builder) = fake_builder(
            "echo 'step 3/7: go build failed' >&2\nexit 1\n",
            Duration::from_secs(30),
        );
        let repo = RepoName::new("widgets").unwrap();

        let err = builder
            .build(&repo, "https://github.com/acme/widgets", Language::Golang)
            .await
            .unwrap_err();
        match err {
            BuildError::BuildFailed(msg) => assert!(msg.contains("go build failed")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_build_missing_context() {
        let temp_dir = tempfile::tempdir().unwrap();
        let builder = ImageBuilder::new(temp_dir.path(), Duration::from_secs(30));
        let repo = RepoName::new("widgets").unwrap();

        let err = builder
            .build(&repo, "https://github.com/acme/widgets", Language::Golang)
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::ContextNotFound(_)));
    }

    #[tokio::test]
    async fn test_build_timeout() {
        let (_temp_dir, builder) = fake_builder("sleep 5\n", Duration::from_millis(200));
        let repo = RepoName::new("widgets").unwrap();

        let err = builder
            .build(&repo, "https://github.com/acme/widgets", Language::Golang)
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::BuildTimeout { .. }));
    }

    #[tokio::test]
    #[ignore] // Docker接続が必要なため、通常のテストではスキップ
    async fn test_build_real_docker() {
        let temp_dir = tempfile::tempdir().unwrap();
        let context = temp_dir.path().join("golang");
        fs::create_dir(&context).unwrap();
        fs::write(
            context.join("Dockerfile"),
            "FROM alpine:latest\nARG GIT_REPOSITORY_URL\nRUN echo $GIT_REPOSITORY_URL\n",
        )
        .unwrap();

        let builder = ImageBuilder::new(temp_dir.path(), Duration::from_secs(300));
        let repo = RepoName::new("repoflow-test").unwrap();
        let result = builder
            .build(&repo, "https://github.com/acme/widgets", Language::Golang)
            .await;
        assert!(result.is_ok());
    }
}
