use std::sync::Arc;

use evrd_domain::{OrgId, ProjectId, Scope, Site, SiteId};
use evrd_store::SiteDirectory;

use crate::error::EngineError;

/// Given a drain's `(scope, org, project?, site?)`, resolves the set of
/// sites that must be reconciled. Read-only; tolerates a site disappearing
/// between lookup and publish.
pub struct Expander {
    directory: Arc<dyn SiteDirectory>,
}

impl Expander {
    pub fn new(directory: Arc<dyn SiteDirectory>) -> Self {
        Self { directory }
    }

    pub async fn expand(
        &self,
        scope: Scope,
        org_id: OrgId,
        project_id: Option<ProjectId>,
        site_id: Option<SiteId>,
    ) -> Result<Vec<Site>, EngineError> {
        match scope {
            Scope::Org => Ok(self.directory.sites_in_org(org_id).await?),
            Scope::Project => {
                let project_id = project_id.ok_or_else(|| {
                    EngineError::MissingIdentifier(
                        "project scope refined without project_id".to_string(),
                    )
                })?;
                Ok(self.directory.sites_in_project(project_id).await?)
            }
            Scope::Site => {
                let site_id = site_id.ok_or_else(|| {
                    EngineError::MissingIdentifier(
                        "site scope refined without site_id".to_string(),
                    )
                })?;
                Ok(self.directory.site(site_id).await?.into_iter().collect())
            }
            Scope::Unknown => Ok(Vec::new()),
        }
    }
}
