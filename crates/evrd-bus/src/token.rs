use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::BusError;

/// Abstraction over bearer-token acquisition — enables test injection
/// without touching Application Default Credentials.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, BusError>;
}

/// Production token provider backed by Application Default Credentials.
pub struct AdcTokenProvider {
    inner: Arc<dyn gcp_auth::TokenProvider>,
}

impl AdcTokenProvider {
    pub async fn new() -> Result<Self, BusError> {
        let inner = gcp_auth::provider()
            .await
            .map_err(|e| BusError::Internal(format!("failed to initialize ADC: {e}")))?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl TokenProvider for AdcTokenProvider {
    async fn token(&self) -> Result<String, BusError> {
        let token = self
            .inner
            .token(&["https://www.googleapis.com/auth/pubsub"])
            .await
            .map_err(|e| BusError::Internal(format!("token acquisition failed: {e}")))?;
        Ok(token.as_str().to_string())
    }
}

/// Test/local-dev token provider — returns a fixed string without any
/// network call.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, BusError> {
        Ok(self.0.clone())
    }
}

/// Acquires a bearer token, logging and returning `None` on failure rather
/// than aborting — callers proceed unauthenticated for local dev.
pub async fn best_effort_token(provider: &dyn TokenProvider) -> Option<String> {
    match provider.token().await {
        Ok(t) => Some(t),
        Err(e) => {
            warn!(error = %e, "credential acquisition failed, proceeding unauthenticated");
            None
        }
    }
}
