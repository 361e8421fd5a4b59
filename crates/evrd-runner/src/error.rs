use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("control-plane request failed: {0}")]
    ControlPlane(String),

    #[error("run {0} not found")]
    RunNotFound(String),

    #[error("failed to spawn IaC binary {binary}: {source}")]
    Spawn {
        binary: String,
        source: std::io::Error,
    },

    #[error("module {module} exited with code {code}")]
    ModuleFailed { module: String, code: i32 },

    #[error("{binary} {step} timed out after {secs}s")]
    TimedOut {
        binary: String,
        step: String,
        secs: u64,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}
