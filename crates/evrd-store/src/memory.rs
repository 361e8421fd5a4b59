use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use evrd_domain::{Event, EventStatus, OrgId, ProjectId, Site, SiteId};
use tokio::sync::RwLock;

use crate::directory::SiteDirectory;
use crate::error::StoreError;
use crate::queue::EventQueue;

#[derive(Debug, Default)]
struct Inner {
    events: HashMap<String, Event>,
    sites: HashMap<SiteId, Site>,
}

/// In-memory implementation of [`EventQueue`] and [`SiteDirectory`].
///
/// All data is lost on process exit. Used by the engine's own tests and
/// anywhere a live Postgres instance is unavailable.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_event(&self, event: Event) {
        let mut guard = self.inner.write().await;
        guard.events.insert(event.event_id.clone(), event);
    }

    pub async fn insert_site(&self, site: Site) {
        let mut guard = self.inner.write().await;
        guard.sites.insert(site.site_id, site);
    }

    pub async fn get_event(&self, event_id: &str) -> Option<Event> {
        let guard = self.inner.read().await;
        guard.events.get(event_id).cloned()
    }
}

#[async_trait]
impl EventQueue for InMemoryStore {
    async fn claim_pending(&self, claimant_id: &str, max: u32) -> Result<Vec<Event>, StoreError> {
        let mut guard = self.inner.write().await;
        let mut pending: Vec<&mut Event> = guard
            .events
            .values_mut()
            .filter(|e| e.status == EventStatus::Pending)
            .collect();
        pending.sort_by(|a, b| {
            a.organization_id
                .0
                .cmp(&b.organization_id.0)
                .then(a.created_at.cmp(&b.created_at))
        });

        let mut claimed = Vec::new();
        for event in pending.into_iter().take(max as usize) {
            event.status = EventStatus::Claimed;
            event.processing_by = Some(claimant_id.to_string());
            event.claimed_at = Some(Utc::now());
            claimed.push(event.clone());
        }
        Ok(claimed)
    }

    async fn mark_sent(&self, event_id: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let event = guard
            .events
            .get_mut(event_id)
            .ok_or_else(|| StoreError::EventNotFound(event_id.to_string()))?;
        event.status = EventStatus::Sent;
        event.sent_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_failed(
        &self,
        event_id: &str,
        error: &str,
        dead_letter_threshold: i32,
    ) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let event = guard
            .events
            .get_mut(event_id)
            .ok_or_else(|| StoreError::EventNotFound(event_id.to_string()))?;
        event.attempts += 1;
        event.last_error = Some(error.to_string());
        event.status = if event.attempts >= dead_letter_threshold {
            EventStatus::DeadLetter
        } else {
            EventStatus::Failed
        };
        Ok(())
    }

    async fn mark_dead_letter(&self, event_id: &str, error: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let event = guard
            .events
            .get_mut(event_id)
            .ok_or_else(|| StoreError::EventNotFound(event_id.to_string()))?;
        event.status = EventStatus::DeadLetter;
        event.last_error = Some(error.to_string());
        Ok(())
    }

    async fn recover_stale(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut guard = self.inner.write().await;
        let mut count = 0;
        for event in guard.events.values_mut() {
            if event.status == EventStatus::Claimed
                && event.claimed_at.map_or(false, |t| t < older_than)
            {
                event.status = EventStatus::Pending;
                event.attempts += 1;
                event.processing_by = None;
                event.claimed_at = None;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl SiteDirectory for InMemoryStore {
    async fn sites_in_org(&self, org_id: OrgId) -> Result<Vec<Site>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .sites
            .values()
            .filter(|s| s.org_id == org_id)
            .cloned()
            .collect())
    }

    async fn sites_in_project(&self, project_id: ProjectId) -> Result<Vec<Site>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .sites
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn site(&self, site_id: SiteId) -> Result<Option<Site>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.sites.get(&site_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_event(id: &str, org: i64) -> Event {
        Event {
            event_id: id.to_string(),
            event_type: "acme.secret.created".to_string(),
            event_source: "test".to_string(),
            event_subject: "subj".to_string(),
            event_data: Vec::new(),
            content_type: "application/json".to_string(),
            organization_id: OrgId::new(org),
            project_id: None,
            site_id: None,
            created_at: Utc::now(),
            status: EventStatus::Pending,
            sent_at: None,
            attempts: 0,
            last_error: None,
            processing_by: None,
            claimed_at: None,
        }
    }

    #[tokio::test]
    async fn claim_pending_flips_status() {
        let store = InMemoryStore::new();
        store.insert_event(dummy_event("e1", 1)).await;

        let claimed = store.claim_pending("worker-1", 10).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].status, EventStatus::Claimed);

        let again = store.claim_pending("worker-2", 10).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn mark_failed_dead_letters_at_threshold() {
        let store = InMemoryStore::new();
        let mut e = dummy_event("e2", 1);
        e.attempts = 4;
        store.insert_event(e).await;

        store.mark_failed("e2", "boom", 5).await.unwrap();
        let after = store.get_event("e2").await.unwrap();
        assert_eq!(after.status, EventStatus::DeadLetter);
        assert_eq!(after.attempts, 5);
    }

    #[tokio::test]
    async fn recover_stale_resets_old_claims() {
        let store = InMemoryStore::new();
        let mut e = dummy_event("e3", 1);
        e.status = EventStatus::Claimed;
        e.claimed_at = Some(Utc::now() - chrono::Duration::hours(1));
        store.insert_event(e).await;

        let recovered = store.recover_stale(Utc::now() - chrono::Duration::minutes(10)).await.unwrap();
        assert_eq!(recovered, 1);
        let after = store.get_event("e3").await.unwrap();
        assert_eq!(after.status, EventStatus::Pending);
        assert_eq!(after.attempts, 1);
    }

    #[tokio::test]
    async fn sites_filtered_by_org_and_project() {
        let store = InMemoryStore::new();
        store
            .insert_site(Site {
                site_id: SiteId::new(1),
                site_public_id: "s1".to_string(),
                project_id: ProjectId::new(10),
                project_public_id: "p10".to_string(),
                org_id: OrgId::new(100),
                org_public_id: "o100".to_string(),
            })
            .await;
        store
            .insert_site(Site {
                site_id: SiteId::new(2),
                site_public_id: "s2".to_string(),
                project_id: ProjectId::new(11),
                project_public_id: "p11".to_string(),
                org_id: OrgId::new(100),
                org_public_id: "o100".to_string(),
            })
            .await;

        let in_org = store.sites_in_org(OrgId::new(100)).await.unwrap();
        assert_eq!(in_org.len(), 2);

        let in_project = store.sites_in_project(ProjectId::new(10)).await.unwrap();
        assert_eq!(in_project.len(), 1);
        assert_eq!(in_project[0].site_id, SiteId::new(1));
    }
}
