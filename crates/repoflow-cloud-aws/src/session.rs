//! AWS session construction

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_ecs::config::Credentials;
use repoflow_core::AwsConfig;

const ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
const SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";

/// Load the shared SDK configuration for the configured region.
///
/// Static credentials from the environment take precedence when both
/// variables are set; otherwise the default provider chain is used.
pub async fn load_sdk_config(config: &AwsConfig) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

    match static_credentials_from_env() {
        Some(credentials) => {
            tracing::info!("Using static AWS credentials from environment");
            loader = loader.credentials_provider(credentials);
        }
        None => tracing::info!("Using default AWS credential provider chain"),
    }

    loader.load().await
}

fn static_credentials_from_env() -> Option<Credentials> {
    let access_key = std::env::var(ACCESS_KEY_ENV).ok().filter(|v| !v.is_empty())?;
    let secret_key = std::env::var(SECRET_KEY_ENV).ok().filter(|v| !v.is_empty())?;
    Some(Credentials::new(
        access_key,
        secret_key,
        None,
        None,
        "repoflow-env",
    ))
}
