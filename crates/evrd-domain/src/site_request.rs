use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{OrgId, ProjectId, SiteId};
use crate::reconciliation_type::ReconciliationType;

/// A site as known to the resource expander. Carries both the internal
/// numeric id and the public id exposed to the site agent, at every level
/// of the hierarchy the request needs to address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub site_id: SiteId,
    pub site_public_id: String,
    pub project_id: ProjectId,
    pub project_public_id: String,
    pub org_id: OrgId,
    pub org_public_id: String,
}

/// One site's worth of the fan-out, published to the message bus.
///
/// Every request produced from a single coalesced batch shares one
/// `timestamp` — sites in the same batch see the same instant, not a
/// per-site clock read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteReconciliationRequest {
    pub site_public_id: String,
    pub project_public_id: String,
    pub org_public_id: String,
    pub request_type: ReconciliationType,
    pub event_ids: Vec<String>,
    pub timestamp: DateTime<Utc>,
}
