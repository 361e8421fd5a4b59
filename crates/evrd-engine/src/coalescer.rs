use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use evrd_domain::{determine_reconciliation_type, determine_scope, Event, OrgId, Scope};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::activity::{Activity, ReconciliationInput};
use crate::org_state::OrgState;

const ORG_DEBOUNCE: Duration = Duration::from_secs(2);
const OTHER_DEBOUNCE: Duration = Duration::from_secs(5);

/// Per-tenant coalescing map, the heart of the router. `accept` never
/// suspends while the lock is held; `drain` suspends only after copying
/// the bucket out and releasing the lock.
#[derive(Clone)]
pub struct Coalescer {
    map: Arc<Mutex<HashMap<OrgId, OrgState>>>,
    activity: Arc<Activity>,
}

impl Coalescer {
    pub fn new(activity: Arc<Activity>) -> Self {
        Self {
            map: Arc::new(Mutex::new(HashMap::new())),
            activity,
        }
    }

    pub async fn accept(&self, event: Event) {
        let org_id = event.organization_id;
        let event_scope = determine_scope(&event);

        let mut guard = self.map.lock().await;
        let state = guard.entry(org_id).or_insert_with(OrgState::new);

        if event_scope > state.current_scope {
            state.current_scope = event_scope;
            match event_scope {
                Scope::Project => {
                    state.current_project_id = event.project_id;
                    state.current_site_id = None;
                }
                Scope::Org => {
                    state.current_project_id = None;
                    state.current_site_id = None;
                }
                Scope::Site | Scope::Unknown => {}
            }
        } else if event_scope == Scope::Site
            && state.current_scope == Scope::Site
            && event.site_id != state.current_site_id
        {
            // Second distinct site at Site scope: widen to Project rather
            // than silently dropping the first site's identity.
            state.current_scope = Scope::Project;
            state.current_project_id = event.project_id;
            state.current_site_id = None;
        }

        state.pending_events.push(event);

        let duration = if state.current_scope == Scope::Org {
            ORG_DEBOUNCE
        } else {
            OTHER_DEBOUNCE
        };

        if let Some(old_timer) = state.timer.take() {
            old_timer.abort();
        }

        let coalescer = self.clone();
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            coalescer.drain(org_id).await;
        }));
    }

    pub async fn drain(&self, org_id: OrgId) {
        let (pending_events, scope, project_id, site_id) = {
            let mut guard = self.map.lock().await;
            let mut state = match guard.remove(&org_id) {
                Some(s) => s,
                None => return,
            };
            state.timer = None; // already firing; avoid aborting ourselves on drop
            (
                std::mem::take(&mut state.pending_events),
                state.current_scope,
                state.current_project_id,
                state.current_site_id,
            )
        };

        if pending_events.is_empty() {
            return;
        }

        let event_ids: Vec<String> = pending_events.iter().map(|e| e.event_id.clone()).collect();
        let event_types: Vec<String> = pending_events.iter().map(|e| e.event_type.clone()).collect();
        let reconciliation_type = determine_reconciliation_type(&event_types);

        let input = ReconciliationInput {
            org_id,
            project_id,
            site_id,
            event_ids,
            scope,
            reconciliation_type,
        };

        match self.activity.run(input).await {
            Ok(result) => info!(
                org_id = %org_id,
                status = result.status,
                message = result.message,
                sites_affected = result.sites_affected,
                "drain completed"
            ),
            Err(e) => error!(org_id = %org_id, error = %e, "drain failed, batch lost"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expander::Expander;
    use evrd_bus::LoggingPublisher;
    use evrd_domain::{EventStatus, OrgId, ProjectId, Site, SiteId};
    use evrd_store::InMemoryStore;
    use chrono::Utc;

    fn event(id: &str, event_type: &str, org: i64, project: Option<i64>, site: Option<i64>) -> Event {
        Event {
            event_id: id.to_string(),
            event_type: event_type.to_string(),
            event_source: "test".to_string(),
            event_subject: "subj".to_string(),
            event_data: Vec::new(),
            content_type: "application/json".to_string(),
            organization_id: OrgId::new(org),
            project_id: project.map(ProjectId::new),
            site_id: site.map(SiteId::new),
            created_at: Utc::now(),
            status: EventStatus::Pending,
            sent_at: None,
            attempts: 0,
            last_error: None,
            processing_by: None,
            claimed_at: None,
        }
    }

    async fn test_coalescer() -> (Coalescer, InMemoryStore) {
        let store = InMemoryStore::new();
        store
            .insert_site(Site {
                site_id: SiteId::new(11),
                site_public_id: "site-11".to_string(),
                project_id: ProjectId::new(3),
                project_public_id: "project-3".to_string(),
                org_id: OrgId::new(7),
                org_public_id: "org-7".to_string(),
            })
            .await;

        let expander = Expander::new(Arc::new(store.clone()));
        let publisher = Arc::new(LoggingPublisher::new());
        let activity = Arc::new(Activity::new(expander, publisher));
        (Coalescer::new(activity), store)
    }

    #[tokio::test(start_paused = true)]
    async fn s1_single_site_ssh_key_add_drains_after_five_seconds() {
        let (coalescer, _store) = test_coalescer().await;
        coalescer
            .accept(event("e1", "io.libops.site_member.created", 7, Some(3), Some(11)))
            .await;

        tokio::time::advance(Duration::from_millis(4900)).await;
        assert!(coalescer.map.lock().await.contains_key(&OrgId::new(7)));

        tokio::time::advance(Duration::from_millis(200)).await;
        tokio::task::yield_now().await;
        assert!(!coalescer.map.lock().await.contains_key(&OrgId::new(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn s2_org_scope_promotion_uses_shorter_debounce() {
        let (coalescer, _store) = test_coalescer().await;
        coalescer
            .accept(event("e2", "io.libops.organization_firewall.updated", 7, None, None))
            .await;
        coalescer
            .accept(event("e3", "io.libops.site_member.created", 7, Some(3), Some(11)))
            .await;

        {
            let guard = coalescer.map.lock().await;
            let state = guard.get(&OrgId::new(7)).unwrap();
            assert_eq!(state.current_scope, Scope::Org);
            assert_eq!(state.pending_events.len(), 2);
        }

        tokio::time::advance(Duration::from_millis(2100)).await;
        tokio::task::yield_now().await;
        assert!(!coalescer.map.lock().await.contains_key(&OrgId::new(7)));
    }

    #[tokio::test]
    async fn s3_deployment_event_dominates_classification() {
        let types = vec![
            "io.libops.deployment.triggered".to_string(),
            "io.libops.site_member.removed".to_string(),
        ];
        assert_eq!(
            determine_reconciliation_type(&types),
            evrd_domain::ReconciliationType::Deployment
        );
    }

    #[tokio::test]
    async fn scope_promotion_clears_refinements() {
        let (coalescer, _store) = test_coalescer().await;
        coalescer
            .accept(event("a", "io.libops.site_member.created", 7, Some(3), Some(11)))
            .await;
        coalescer
            .accept(event("b", "io.libops.project_member.updated", 7, Some(3), None))
            .await;

        let guard = coalescer.map.lock().await;
        let state = guard.get(&OrgId::new(7)).unwrap();
        assert_eq!(state.current_scope, Scope::Project);
        assert_eq!(state.current_project_id, Some(ProjectId::new(3)));
        assert_eq!(state.current_site_id, None);
    }

    #[tokio::test]
    async fn second_distinct_site_promotes_to_project() {
        let (coalescer, _store) = test_coalescer().await;
        coalescer
            .accept(event("a", "io.libops.site_member.created", 7, Some(3), Some(11)))
            .await;
        coalescer
            .accept(event("b", "io.libops.site_member.created", 7, Some(3), Some(12)))
            .await;

        let guard = coalescer.map.lock().await;
        let state = guard.get(&OrgId::new(7)).unwrap();
        assert_eq!(state.current_scope, Scope::Project);
        assert_eq!(state.current_project_id, Some(ProjectId::new(3)));
        assert_eq!(state.current_site_id, None);
        assert_eq!(state.pending_events.len(), 2);
    }

    #[tokio::test]
    async fn repeated_events_for_the_same_site_stay_at_site_scope() {
        let (coalescer, _store) = test_coalescer().await;
        coalescer
            .accept(event("a", "io.libops.site_member.created", 7, Some(3), Some(11)))
            .await;
        coalescer
            .accept(event("b", "io.libops.site_member.updated", 7, Some(3), Some(11)))
            .await;

        let guard = coalescer.map.lock().await;
        let state = guard.get(&OrgId::new(7)).unwrap();
        assert_eq!(state.current_scope, Scope::Site);
        assert_eq!(state.current_site_id, Some(SiteId::new(11)));
    }

    #[tokio::test]
    async fn drain_of_absent_bucket_is_a_no_op() {
        let (coalescer, _store) = test_coalescer().await;
        coalescer.drain(OrgId::new(999)).await;
    }
}
