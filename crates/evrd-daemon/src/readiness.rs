use async_trait::async_trait;
use evrd_api::ReadinessProbe;
use sqlx::PgPool;

pub struct PoolReadiness {
    pool: PgPool,
}

impl PoolReadiness {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadinessProbe for PoolReadiness {
    async fn check(&self) -> Result<(), String> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
