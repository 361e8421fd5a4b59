use std::sync::Arc;

use async_trait::async_trait;

/// Abstraction over "is the backing store reachable" — lets the health
/// server stay ignorant of `sqlx`/Postgres and be unit-tested with a fake.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn check(&self) -> Result<(), String>;
}

#[derive(Clone)]
pub struct AppState {
    pub readiness: Arc<dyn ReadinessProbe>,
}
