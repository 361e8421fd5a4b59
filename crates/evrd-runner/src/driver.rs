use std::path::PathBuf;

use evrd_domain::{RunStatus, RunType};
use tracing::{error, info};

use crate::control_plane::ControlPlaneClient;
use crate::error::RunnerError;
use crate::iac;

/// Drives a single reconciliation run end to end, per the state machine
/// `pending → triggered → running → {completed, failed}`. A failed run is
/// never retried under the same `run_id`; the caller must mint a new one.
pub struct RunDriver {
    control_plane: ControlPlaneClient,
    binary: String,
    work_dir: PathBuf,
    dry_run: bool,
}

impl RunDriver {
    pub fn new(control_plane: ControlPlaneClient, binary: impl Into<String>, work_dir: PathBuf, dry_run: bool) -> Self {
        Self {
            control_plane,
            binary: binary.into(),
            work_dir,
            dry_run,
        }
    }

    pub async fn execute(&self, run_id: &str) -> Result<(), RunnerError> {
        let run = self.control_plane.fetch_run(run_id).await?;

        if run.run_type != RunType::Terraform {
            error!(run_id, run_type = ?run.run_type, "run type is not handled by this driver");
            let error_message = format!("run_type {:?} is not driven by evrd-run, only Terraform", run.run_type);
            self.control_plane
                .update_status(run_id, RunStatus::Failed, Some(&error_message))
                .await?;
            return Err(RunnerError::Internal(error_message));
        }

        self.control_plane
            .update_status(run_id, RunStatus::Running, None)
            .await?;
        info!(run_id, "run transitioned to running");

        let tfvars = self
            .control_plane
            .generate_tfvars(run.organization_id, run.project_id, run.site_id)
            .await?;

        for module in &run.modules {
            let module_dir = self.work_dir.join(run_id).join(module);
            tokio::fs::create_dir_all(&module_dir).await?;

            let vars_path = module_dir.join("vars.auto.tfvars.json");
            let vars_body = serde_json::to_vec_pretty(&tfvars)
                .map_err(|e| RunnerError::Internal(format!("serialize tfvars: {e}")))?;
            tokio::fs::write(&vars_path, vars_body).await?;

            let (code, log) = iac::run_module(&self.binary, &module_dir, "apply", self.dry_run).await?;

            if code != 0 {
                let error_message = format!("module {module} exited {code}:\n{}", truncate(&log, 4000));
                error!(run_id, module, code, "module failed, aborting run");
                self.control_plane
                    .update_status(run_id, RunStatus::Failed, Some(&error_message))
                    .await?;
                return Err(RunnerError::ModuleFailed { module: module.clone(), code });
            }

            info!(run_id, module, "module succeeded");
        }

        self.control_plane
            .update_status(run_id, RunStatus::Completed, None)
            .await?;
        info!(run_id, "run completed");
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        s
    } else {
        &s[..max]
    }
}
