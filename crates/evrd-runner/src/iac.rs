use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::RunnerError;

const TIMEOUT_SECS: u64 = 1800;

/// Runs `terraform`/`tofu` inside `workspace`, capturing combined
/// stdout+stderr. Returns `(exit_code, combined_log)`.
///
/// `apply_or_plan` selects between `apply -auto-approve` and `plan` for
/// dry-run mode; `init` always runs unconditionally first.
pub async fn run_module(
    binary: &str,
    workspace: &Path,
    apply_or_plan: &str,
    dry_run: bool,
) -> Result<(i32, String), RunnerError> {
    let mut log = String::new();

    let (init_code, init_log) = run_step(binary, workspace, &["init", "-no-color"]).await?;
    log.push_str("=== init ===\n");
    log.push_str(&init_log);
    if init_code != 0 {
        return Ok((init_code, log));
    }

    let step_name = if dry_run { "plan" } else { apply_or_plan };
    let args: Vec<&str> = if dry_run {
        vec!["plan", "-no-color"]
    } else {
        vec![apply_or_plan, "-auto-approve", "-no-color"]
    };

    if dry_run {
        log.push_str("\n=== dry-run: substituting plan for apply ===\n");
    }

    let (code, out) = run_step(binary, workspace, &args).await?;
    log.push_str(&format!("\n=== {step_name} ===\n"));
    log.push_str(&out);

    Ok((code, log))
}

async fn run_step(binary: &str, workspace: &Path, args: &[&str]) -> Result<(i32, String), RunnerError> {
    info!(binary, ?args, workspace = %workspace.display(), "running IaC command");

    let mut cmd = Command::new(binary);
    cmd.args(args)
        .current_dir(workspace)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .env("TF_IN_AUTOMATION", "1")
        .env("TF_INPUT", "0");

    let mut child = cmd
        .spawn()
        .map_err(|e| RunnerError::Spawn { binary: binary.to_string(), source: e })?;

    let stdout = child.stdout.take().expect("stdout piped");
    let stderr = child.stderr.take().expect("stderr piped");

    let mut log = String::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();

    let tx1 = tx.clone();
    let stdout_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let _ = tx1.send(line);
        }
    });

    let tx2 = tx.clone();
    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let _ = tx2.send(line);
        }
    });

    drop(tx);

    let collect = async {
        while let Some(line) = rx.recv().await {
            debug!(target: "evrd::iac", "{}", line);
            log.push_str(&line);
            log.push('\n');
        }
    };
    let timed_out = tokio::time::timeout(Duration::from_secs(TIMEOUT_SECS), collect)
        .await
        .is_err();

    stdout_task.await.ok();
    stderr_task.await.ok();

    if timed_out {
        let _ = child.kill().await;
        return Err(RunnerError::TimedOut {
            binary: binary.to_string(),
            step: args.first().copied().unwrap_or("").to_string(),
            secs: TIMEOUT_SECS,
        });
    }

    let status = child
        .wait()
        .await
        .map_err(|e| RunnerError::Internal(format!("wait {binary}: {e}")))?;

    let code = status.code().unwrap_or(-1);
    if code != 0 {
        warn!(binary, code, "IaC command exited non-zero");
    }
    Ok((code, log))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_step_captures_stdout_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let (code, log) = run_step("sh", dir.path(), &["-c", "echo hello"]).await.unwrap();
        assert_eq!(code, 0);
        assert!(log.contains("hello"));
    }

    #[tokio::test]
    async fn run_step_captures_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let (code, log) = run_step("sh", dir.path(), &["-c", "echo boom >&2; exit 2"])
            .await
            .unwrap();
        assert_eq!(code, 2);
        assert!(log.contains("boom"));
    }
}
