//! デーモン設定
//!
//! クラスタ・ネットワーク・レジストリ名前空間などの外部環境の設定を
//! 1つの構造体にまとめ、起動時に検証してから各コンポーネントへ渡す。

use crate::error::{CoreError, Result};
use crate::model::RepoName;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_ENV: &str = "REPOFLOW_CONFIG";

const CONFIG_FILE_NAME: &str = "repoflow.yaml";

/// タスク定義テンプレート内でリポジトリ名に置換されるプレースホルダ
const REPO_PLACEHOLDER: &str = "{repo}";

/// デーモン全体の設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub server: ServerConfig,
    pub build: BuildConfig,
    pub registry: RegistryConfig,
    pub scheduler: SchedulerConfig,
    pub aws: AwsConfig,
}

/// HTTP サーバー設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 待ち受けアドレス
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

/// イメージビルド設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// 言語ごとのビルドテンプレート（Dockerfile）を置くディレクトリ
    pub templates_dir: PathBuf,
    /// ビルド前に実行するシェルスクリプト（未指定ならスキップ）
    pub pre_build_script: Option<PathBuf>,
    /// `docker build` のタイムアウト（秒）
    pub timeout_secs: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("docker-files"),
            pre_build_script: Some(PathBuf::from("main.sh")),
            timeout_secs: 1800,
        }
    }
}

/// コンテナレジストリ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// レジストリのホストと名前空間（例: public.ecr.aws/z7u8q2p8）
    pub namespace: String,
    /// 名前空間内の固定リポジトリ名
    pub repository: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            namespace: "public.ecr.aws/z7u8q2p8".to_string(),
            repository: "nikhil-build-server".to_string(),
        }
    }
}

impl RegistryConfig {
    /// プッシュ先のイメージ名（タグなし）
    pub fn image_base(&self) -> String {
        format!(
            "{}/{}",
            self.namespace.trim_end_matches('/'),
            self.repository
        )
    }

    /// `<namespace>/<repository>:<repoName>`
    pub fn image_for(&self, repo: &RepoName) -> String {
        format!("{}:{}", self.image_base(), repo)
    }

    /// ログインに使うレジストリサーバーのアドレス（名前空間のホスト部分）
    pub fn server_address(&self) -> &str {
        self.namespace
            .split('/')
            .next()
            .unwrap_or(self.namespace.as_str())
    }
}

/// タスクスケジューラ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub cluster: String,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub launch_type: String,
    pub assign_public_ip: bool,
    /// エンドポイントを取り出すコンテナ名
    pub container_name: String,
    /// タスク定義名のテンプレート。`{repo}` はリポジトリ名に置換される
    pub task_definition: String,
    /// タスク準備完了のポーリング設定
    pub poll: PollSettings,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cluster: "build-server".to_string(),
            subnets: vec![
                "subnet-00eea2a7cb8690fa5".to_string(),
                "subnet-0e4c5a95821911326".to_string(),
                "subnet-0d820b0342b9a5d1c".to_string(),
                "subnet-03116cd1a25440217".to_string(),
            ],
            security_groups: vec!["sg-01c3f060df732b415".to_string()],
            launch_type: "FARGATE".to_string(),
            assign_public_ip: true,
            container_name: "app".to_string(),
            task_definition: REPO_PLACEHOLDER.to_string(),
            poll: PollSettings::default(),
        }
    }
}

impl SchedulerConfig {
    /// リポジトリ名に対応するタスク定義名
    pub fn task_definition_for(&self, repo: &RepoName) -> String {
        self.task_definition.replace(REPO_PLACEHOLDER, repo.as_str())
    }
}

/// ポーリング設定（exponential backoff）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// 最大試行回数
    pub max_attempts: u32,
    /// 初期待機時間（ミリ秒）
    pub initial_delay_ms: u64,
    /// 最大待機時間（ミリ秒）
    pub max_delay_ms: u64,
    /// Exponential倍率
    pub multiplier: f64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: 12,
            initial_delay_ms: 2000,
            max_delay_ms: 15000,
            multiplier: 2.0,
        }
    }
}

impl PollSettings {
    /// 指定回数目の待機時間を計算（ミリ秒）
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        (delay as u64).min(self.max_delay_ms)
    }
}

/// AWS セッション設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// ECR Public は us-east-1 にしか存在しない
    pub region: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
        }
    }
}

impl DeployConfig {
    /// YAML ファイルから読み込む
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::ConfigLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// 設定を読み込んで検証する
    ///
    /// `explicit` が指定されていればそのファイルを使い、なければ
    /// [`find_config_file`] で探索する。見つからなければデフォルト値。
    ///
    /// 戻り値の2要素目は実際に読み込んだファイル。
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        Self::load_with_listen(explicit, None)
    }

    /// [`DeployConfig::load`] と同じだが、検証の前に `server.listen` を
    /// 上書きする（CLI の `--listen` 用）
    pub fn load_with_listen(
        explicit: Option<&Path>,
        listen: Option<String>,
    ) -> Result<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => find_config_file()?,
        };

        let mut config = match &path {
            Some(p) => {
                tracing::info!("Loading config from {}", p.display());
                Self::from_file(p)?
            }
            None => {
                tracing::info!("No config file found, using defaults");
                Self::default()
            }
        };

        if let Some(listen) = listen {
            config.server.listen = listen;
        }

        config.validate()?;
        Ok((config, path))
    }

    /// 起動時の整合性チェック
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| -> Result<()> { Err(CoreError::InvalidConfig(msg.to_string())) };

        if self.server.listen.trim().is_empty() {
            return invalid("server.listen must not be empty");
        }
        if self.build.timeout_secs == 0 {
            return invalid("build.timeout_secs must be greater than 0");
        }
        if self.registry.namespace.trim().is_empty() {
            return invalid("registry.namespace must not be empty");
        }
        if self.registry.repository.trim().is_empty() {
            return invalid("registry.repository must not be empty");
        }
        if self
            .registry
            .repository
            .chars()
            .any(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || "._-/".contains(c)))
        {
            return invalid("registry.repository contains characters not allowed in image names");
        }
        if self.scheduler.cluster.trim().is_empty() {
            return invalid("scheduler.cluster must not be empty");
        }
        if self.scheduler.subnets.is_empty() {
            return invalid("scheduler.subnets must contain at least one subnet");
        }
        if self.scheduler.container_name.trim().is_empty() {
            return invalid("scheduler.container_name must not be empty");
        }
        if self.scheduler.task_definition.trim().is_empty() {
            return invalid("scheduler.task_definition must not be empty");
        }
        if self.scheduler.poll.max_attempts == 0 {
            return invalid("scheduler.poll.max_attempts must be greater than 0");
        }
        if self.scheduler.poll.multiplier < 1.0 {
            return invalid("scheduler.poll.multiplier must be at least 1.0");
        }
        if self.aws.region.trim().is_empty() {
            return invalid("aws.region must not be empty");
        }

        Ok(())
    }
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 REPOFLOW_CONFIG (直接パス指定)
/// 2. カレントディレクトリの repoflow.yaml
/// 3. ~/.config/repoflow/repoflow.yaml
///
/// どれも存在しなければ `Ok(None)`。
pub fn find_config_file() -> Result<Option<PathBuf>> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(CoreError::ConfigLoad {
            path,
            message: format!("{} points to a file that does not exist", CONFIG_ENV),
        });
    }

    // 2. カレントディレクトリ
    let local = std::env::current_dir()?.join(CONFIG_FILE_NAME);
    if local.exists() {
        return Ok(Some(local));
    }

    // 3. グローバル設定
    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("repoflow").join(CONFIG_FILE_NAME);
        if global.exists() {
            return Ok(Some(global));
        }
    }

    Ok(None)
}
