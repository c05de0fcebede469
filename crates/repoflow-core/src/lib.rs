//! RepoFlow core
//!
//! リクエストモデル、リポジトリ名の解決、デーモン設定を提供します。

pub mod config;
pub mod error;
pub mod model;
pub mod resolver;

pub use config::{
    AwsConfig, BuildConfig, DeployConfig, PollSettings, RegistryConfig, SchedulerConfig,
    CONFIG_ENV, ServerConfig, find_config_file,
};
pub use error::{CoreError, Result};
pub use model::{
    DeployOutcome, DeployRequest, Language, RegistryCredential, RepoName, TaskEndpoint,
};
pub use resolver::resolve_repo_name;
