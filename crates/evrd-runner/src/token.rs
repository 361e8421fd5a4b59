use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::RunnerError;

/// Abstraction over bearer-token acquisition for the control-plane API —
/// the same seam `evrd-bus` uses for the message bus, kept separate here
/// because the two calls carry different scopes.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, RunnerError>;
}

pub struct AdcTokenProvider {
    inner: Arc<dyn gcp_auth::TokenProvider>,
    scope: &'static str,
}

impl AdcTokenProvider {
    pub async fn new(scope: &'static str) -> Result<Self, RunnerError> {
        let inner = gcp_auth::provider()
            .await
            .map_err(|e| RunnerError::Internal(format!("failed to initialize ADC: {e}")))?;
        Ok(Self { inner, scope })
    }
}

#[async_trait]
impl TokenProvider for AdcTokenProvider {
    async fn token(&self) -> Result<String, RunnerError> {
        let token = self
            .inner
            .token(&[self.scope])
            .await
            .map_err(|e| RunnerError::Internal(format!("token acquisition failed: {e}")))?;
        Ok(token.as_str().to_string())
    }
}

pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, RunnerError> {
        Ok(self.0.clone())
    }
}

/// Acquires a bearer token, logging and proceeding unauthenticated on
/// failure rather than aborting the run.
pub async fn best_effort_token(provider: &dyn TokenProvider) -> Option<String> {
    match provider.token().await {
        Ok(t) => Some(t),
        Err(e) => {
            warn!(error = %e, "credential acquisition failed, proceeding unauthenticated");
            None
        }
    }
}
