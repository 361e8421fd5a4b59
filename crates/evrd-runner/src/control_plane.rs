use evrd_domain::{OrgId, ProjectId, ReconciliationRun, RunStatus, SiteId};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::RunnerError;
use crate::token::{best_effort_token, TokenProvider};

/// Client for the external control-plane API named in spec.md §6. This
/// crate does not own the `reconciliations` table; it reads and writes it
/// exclusively through this client.
pub struct ControlPlaneClient {
    base_url: String,
    client: Client,
    token: Box<dyn TokenProvider>,
}

#[derive(Serialize)]
struct StatusUpdate<'a> {
    status: &'a str,
    error_message: Option<&'a str>,
}

#[derive(Serialize)]
struct TfvarsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    organization_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    site_id: Option<i64>,
}

impl ControlPlaneClient {
    pub fn new(base_url: impl Into<String>, token: Box<dyn TokenProvider>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
            token,
        }
    }

    async fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match best_effort_token(self.token.as_ref()).await {
            Some(t) => builder.bearer_auth(t),
            None => builder,
        }
    }

    pub async fn fetch_run(&self, run_id: &str) -> Result<ReconciliationRun, RunnerError> {
        let url = format!(
            "{}/admin/reconciliation/runs/{run_id}",
            self.base_url.trim_end_matches('/')
        );
        let req = self.authed(self.client.get(&url)).await;
        let resp = req
            .send()
            .await
            .map_err(|e| RunnerError::ControlPlane(format!("GET {url}: {e}")))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RunnerError::RunNotFound(run_id.to_string()));
        }
        if !resp.status().is_success() {
            return Err(RunnerError::ControlPlane(format!(
                "GET {url} returned {}",
                resp.status()
            )));
        }

        resp.json::<ReconciliationRun>()
            .await
            .map_err(|e| RunnerError::ControlPlane(format!("decode run {run_id}: {e}")))
    }

    pub async fn update_status(
        &self,
        run_id: &str,
        status: RunStatus,
        error_message: Option<&str>,
    ) -> Result<(), RunnerError> {
        let url = format!(
            "{}/admin/reconciliation/runs/{run_id}/status",
            self.base_url.trim_end_matches('/')
        );
        let body = StatusUpdate {
            status: &status.to_string(),
            error_message,
        };
        debug!(run_id, status = %status, "updating run status");
        let req = self.authed(self.client.put(&url)).await.json(&body);
        let resp = req
            .send()
            .await
            .map_err(|e| RunnerError::ControlPlane(format!("PUT {url}: {e}")))?;

        if !resp.status().is_success() {
            return Err(RunnerError::ControlPlane(format!(
                "PUT {url} returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    pub async fn generate_tfvars(
        &self,
        organization_id: Option<OrgId>,
        project_id: Option<ProjectId>,
        site_id: Option<SiteId>,
    ) -> Result<Value, RunnerError> {
        let url = format!(
            "{}/admin/reconciliation/generate-tfvars",
            self.base_url.trim_end_matches('/')
        );
        let body = TfvarsRequest {
            organization_id: organization_id.map(|v| v.0),
            project_id: project_id.map(|v| v.0),
            site_id: site_id.map(|v| v.0),
        };
        let req = self.authed(self.client.post(&url)).await.json(&body);
        let resp = req
            .send()
            .await
            .map_err(|e| RunnerError::ControlPlane(format!("POST {url}: {e}")))?;

        if !resp.status().is_success() {
            return Err(RunnerError::ControlPlane(format!(
                "POST {url} returned {}",
                resp.status()
            )));
        }

        let parsed: Value = resp
            .json()
            .await
            .map_err(|e| RunnerError::ControlPlane(format!("decode tfvars response: {e}")))?;

        parsed
            .get("tfvars")
            .cloned()
            .ok_or_else(|| RunnerError::ControlPlane("response missing 'tfvars' field".into()))
    }
}
