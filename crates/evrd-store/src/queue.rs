use async_trait::async_trait;
use chrono::{DateTime, Utc};
use evrd_domain::Event;

use crate::error::StoreError;

/// Durable access to `event_queue`. Implementations must honor the ordering
/// guarantee: within one `claim_pending` call, rows sharing an
/// `organization_id` come back in `created_at` order.
#[async_trait]
pub trait EventQueue: Send + Sync + 'static {
    async fn claim_pending(
        &self,
        claimant_id: &str,
        max: u32,
    ) -> Result<Vec<Event>, StoreError>;

    async fn mark_sent(&self, event_id: &str) -> Result<(), StoreError>;

    async fn mark_failed(
        &self,
        event_id: &str,
        error: &str,
        dead_letter_threshold: i32,
    ) -> Result<(), StoreError>;

    async fn mark_dead_letter(&self, event_id: &str, error: &str) -> Result<(), StoreError>;

    async fn recover_stale(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError>;
}
