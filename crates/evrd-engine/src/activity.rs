use std::sync::Arc;

use chrono::Utc;
use evrd_domain::{OrgId, ProjectId, ReconciliationType, Scope, SiteId, SiteReconciliationRequest};
use evrd_bus::Publisher;
use tracing::warn;

use crate::error::EngineError;
use crate::expander::Expander;

/// Input to the fan-out activity, assembled from a drained bucket.
pub struct ReconciliationInput {
    pub org_id: OrgId,
    pub project_id: Option<ProjectId>,
    pub site_id: Option<SiteId>,
    pub event_ids: Vec<String>,
    pub scope: Scope,
    pub reconciliation_type: ReconciliationType,
}

/// Best-effort aggregate result of one drain's fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityResult {
    pub status: String,
    pub message: String,
    pub sites_affected: u32,
}

/// Resolves affected sites and publishes a reconciliation request for each.
/// Expander/identifier errors are fatal to the batch; per-site publish
/// failures are logged and do not abort the remaining sites.
pub struct Activity {
    expander: Expander,
    publisher: Arc<dyn Publisher>,
}

impl Activity {
    pub fn new(expander: Expander, publisher: Arc<dyn Publisher>) -> Self {
        Self { expander, publisher }
    }

    pub async fn run(&self, input: ReconciliationInput) -> Result<ActivityResult, EngineError> {
        let sites = self
            .expander
            .expand(input.scope, input.org_id, input.project_id, input.site_id)
            .await?;

        if sites.is_empty() {
            return Ok(ActivityResult {
                status: "success".to_string(),
                message: "No sites to reconcile".to_string(),
                sites_affected: 0,
            });
        }

        let timestamp = Utc::now();
        let mut published = 0u32;

        for site in &sites {
            let req = SiteReconciliationRequest {
                site_public_id: site.site_public_id.clone(),
                project_public_id: site.project_public_id.clone(),
                org_public_id: site.org_public_id.clone(),
                request_type: input.reconciliation_type,
                event_ids: input.event_ids.clone(),
                timestamp,
            };

            match self.publisher.publish_site_reconciliation(&req).await {
                Ok(message_id) => {
                    published += 1;
                    tracing::debug!(site_id = %site.site_id, message_id, "published");
                }
                Err(e) => {
                    warn!(site_id = %site.site_id, error = %e, "publish failed, continuing batch");
                }
            }
        }

        Ok(ActivityResult {
            status: "success".to_string(),
            message: format!("Published {published}"),
            sites_affected: published,
        })
    }
}
