use anyhow::Context;
use clap::Parser;
use repoflow_build::{DockerRegistry, ImageBuilder, RegistryPublisher, ShellScript};
use repoflow_cloud::TaskLauncher;
use repoflow_cloud_aws::{EcrPublicTokenSource, EcsScheduler, load_sdk_config};
use repoflow_core::{CONFIG_ENV, DeployConfig};
use repoflowd::{AppState, DeployPipeline, router};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "repoflowd=info,repoflow_build=info,repoflow_cloud=info,repoflow_cloud_aws=info,tower_http=info";

#[derive(Parser)]
#[command(name = "repoflowd")]
#[command(about = "git URL を受け取り、ビルド・公開・起動までを行うデプロイデーモン", long_about = None)]
#[command(version)]
struct Cli {
    /// 設定ファイルのパス
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// 待ち受けアドレス（server.listen を上書き）
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let (config, _) = DeployConfig::load_with_listen(cli.config.as_deref(), cli.listen)
        .context("設定の読み込みに失敗しました")?;

    let pipeline = build_pipeline(&config).await?;
    let state = Arc::new(AppState::new(pipeline));

    let listener = TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("{} で待ち受けできません", config.server.listen))?;
    tracing::info!("repoflowd listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("repoflowd stopped");
    Ok(())
}

async fn build_pipeline(config: &DeployConfig) -> anyhow::Result<DeployPipeline> {
    let sdk_config = load_sdk_config(&config.aws).await;

    let registry = DockerRegistry::connect_local().context("Docker に接続できません")?;
    let publisher = RegistryPublisher::new(
        Arc::new(EcrPublicTokenSource::new(&sdk_config)),
        Arc::new(registry),
        config.registry.clone(),
    );

    let launcher = TaskLauncher::new(
        Arc::new(EcsScheduler::new(&sdk_config)),
        config.scheduler.clone(),
    );

    let builder = ImageBuilder::new(
        &config.build.templates_dir,
        Duration::from_secs(config.build.timeout_secs),
    );

    let mut pipeline = DeployPipeline::new(Arc::new(builder), publisher, launcher);
    match &config.build.pre_build_script {
        Some(script) => {
            tracing::info!("Pre-build script: {}", script.display());
            pipeline = pipeline.with_pre_build(Arc::new(ShellScript::new(script)));
        }
        None => tracing::info!("No pre-build script configured"),
    }

    Ok(pipeline)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
