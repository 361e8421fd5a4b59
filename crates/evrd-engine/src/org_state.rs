use evrd_domain::{Event, ProjectId, Scope, SiteId};

/// The coalescer's per-tenant bucket. Created on first accepted event for a
/// tenant; destroyed (not cleared) on drain, so a concurrent arrival during
/// drain forms a new bucket with its own timer instead of racing the one
/// being drained.
pub(crate) struct OrgState {
    pub pending_events: Vec<Event>,
    pub current_scope: Scope,
    pub current_project_id: Option<ProjectId>,
    pub current_site_id: Option<SiteId>,
    pub timer: Option<tokio::task::JoinHandle<()>>,
}

impl OrgState {
    pub fn new() -> Self {
        Self {
            pending_events: Vec::new(),
            current_scope: Scope::Unknown,
            current_project_id: None,
            current_site_id: None,
            timer: None,
        }
    }
}

impl Drop for OrgState {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
