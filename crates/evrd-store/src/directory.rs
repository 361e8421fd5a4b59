use async_trait::async_trait;
use evrd_domain::{OrgId, ProjectId, Site, SiteId};

use crate::error::StoreError;

/// Read-only view over the site/project/org hierarchy used by the resource
/// expander. Must tolerate a site disappearing between lookup and publish —
/// callers are expected to address a now-dead site and let downstream be
/// idempotent about it.
#[async_trait]
pub trait SiteDirectory: Send + Sync + 'static {
    async fn sites_in_org(&self, org_id: OrgId) -> Result<Vec<Site>, StoreError>;
    async fn sites_in_project(&self, project_id: ProjectId) -> Result<Vec<Site>, StoreError>;
    async fn site(&self, site_id: SiteId) -> Result<Option<Site>, StoreError>;
}
