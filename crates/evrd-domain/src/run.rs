use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{OrgId, ProjectId, SiteId};
use crate::reconciliation_type::ReconciliationType;

/// What tool the run drives: a Terraform/OpenTofu module set, or a direct
/// site-agent push. Only `Terraform` is driven by this crate's run driver;
/// `Site` runs are handled entirely by the out-of-scope site agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    Terraform,
    Site,
}

/// `pending → triggered → running → {completed, failed}`. No transition
/// escapes these arrows; a failed run is re-run only under a new `run_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Triggered,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Pending => "pending",
            RunStatus::Triggered => "triggered",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// A durable row in `reconciliations`, as exchanged with the external
/// control-plane API (GET/PUT per spec §6). This crate is a client of that
/// API, not the owner of the table — the struct is the wire shape, not a
/// locally-persisted entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationRun {
    pub run_id: String,
    pub run_type: RunType,
    pub reconciliation_type: ReconciliationType,
    pub modules: Vec<String>,
    pub target_site_ids: Vec<i64>,
    pub event_ids: Vec<String>,
    pub organization_id: Option<OrgId>,
    pub project_id: Option<ProjectId>,
    pub site_id: Option<SiteId>,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub first_event_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
}
