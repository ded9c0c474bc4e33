use thiserror::Error;
use tokio::time::Instant;

use crate::core::domain::CommandSpec;

#[mockall::automock]
#[async_trait::async_trait]
pub trait Executor: std::fmt::Debug + Send + Sync {
    /// Runs one command to completion, feeding `stdin` and closing it.
    /// The process tree is terminated if `deadline` passes first.
    async fn execute(
        &self,
        command: &CommandSpec,
        stdin: &str,
        deadline: Instant,
    ) -> Result<RunResult, RunError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunResult {
    /// Exit code, or -1 when the process was killed by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("deadline exceeded")]
    TimedOut,
    #[error("{msg}")]
    Internal { msg: String },
}
