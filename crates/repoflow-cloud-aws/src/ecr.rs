//! ECR Public authorization token source

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ecrpublic::Client;
use aws_sdk_ecrpublic::error::DisplayErrorContext;
use aws_sdk_ecrpublic::types::AuthorizationData;
use chrono::{DateTime, Utc};
use repoflow_build::{AuthorizationToken, BuildError, BuildResult, TokenSource};

/// Issues short-lived registry tokens through ECR Public
pub struct EcrPublicTokenSource {
    client: Client,
}

impl EcrPublicTokenSource {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl TokenSource for EcrPublicTokenSource {
    async fn authorization_token(&self) -> BuildResult<AuthorizationToken> {
        tracing::debug!("Requesting ECR Public authorization token");

        let output = self
            .client
            .get_authorization_token()
            .send()
            .await
            .map_err(|e| BuildError::AuthToken(DisplayErrorContext(&e).to_string()))?;

        let data = output
            .authorization_data()
            .ok_or_else(|| BuildError::AuthToken("no authorization data returned".to_string()))?;

        to_authorization_token(data)
    }
}

fn to_authorization_token(data: &AuthorizationData) -> BuildResult<AuthorizationToken> {
    let token = data
        .authorization_token()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| BuildError::AuthToken("authorization data has no token".to_string()))?;

    let expires_at = data
        .expires_at()
        .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()));

    Ok(AuthorizationToken {
        token: token.to_string(),
        expires_at,
    })
}
