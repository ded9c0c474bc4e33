use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;
use tokio::time::Instant;

use crate::{
    config::Config,
    constants::{TIMED_OUT_MSG, UNKNOWN_ERROR_MSG},
    core::{
        domain::{CommandTemplate, Execution, ExecutionResult, ExecutionState, Invocation, LanguageSpec},
        registry::ToolchainRegistry,
        traits::{
            executor::{Executor, RunError, RunResult},
            probe::ToolchainProbe,
        },
    },
    native::{
        executor::NativeExecutor,
        platform::{self, HostPlatform},
        probe::PathProbe,
        workspace::Workspace,
    },
};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Language {0} not supported.")]
    UnsupportedLanguage(String),
    #[error("{}", TIMED_OUT_MSG)]
    TimedOut,
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{msg}")]
    Internal { msg: String },
}

impl From<RunError> for ExecError {
    fn from(e: RunError) -> Self {
        match e {
            RunError::TimedOut => ExecError::TimedOut,
            RunError::Internal { msg } => ExecError::Internal { msg },
        }
    }
}

/// Compiles (when the language needs it) and runs one snippet per call.
#[derive(Clone, Debug)]
pub struct Orchestrator {
    config: Config,
    registry: &'static ToolchainRegistry,
    executor: Arc<dyn Executor>,
    probe: Arc<dyn ToolchainProbe>,
    platform: &'static dyn HostPlatform,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        executor: Arc<dyn Executor>,
        probe: Arc<dyn ToolchainProbe>,
    ) -> Self {
        Self {
            config,
            registry: ToolchainRegistry::builtin(),
            executor,
            probe,
            platform: platform::host(),
        }
    }

    /// Orchestrator driving the host toolchains found on `PATH`.
    pub fn native(config: Config) -> Self {
        Self::new(config, Arc::new(NativeExecutor::default()), Arc::new(PathProbe))
    }

    pub fn available_languages(&self) -> Vec<&'static str> {
        self.registry.list_available(self.probe.as_ref())
    }

    #[tracing::instrument(skip(self, code, stdin))]
    pub async fn run(&self, code: &str, stdin: &str, language: &str) -> ExecutionResult {
        let (result, execution) = self.run_traced(code, stdin, language).await;
        tracing::info!(
            execution = %execution.id,
            language = %execution.language,
            success = result.is_success(),
            "Execution finished"
        );
        result
    }

    /// Same as [`Orchestrator::run`], also returning the execution record.
    pub async fn run_traced(
        &self,
        code: &str,
        stdin: &str,
        language: &str,
    ) -> (ExecutionResult, Execution) {
        let execution = Execution::new(language);

        let Some(spec) = self.registry.lookup(language) else {
            let error = ExecError::UnsupportedLanguage(language.to_string());
            return (
                ExecutionResult::failure(error.to_string()),
                execution.change_state(ExecutionState::CleanedUp),
            );
        };

        let guarded = AssertUnwindSafe(self.execute(spec, code, stdin, execution.clone()));
        match guarded.catch_unwind().await {
            Ok(finished) => finished,
            Err(panic) => {
                let msg = panic_message(panic.as_ref());
                tracing::error!(execution = %execution.id, "Execution panicked: {}", msg);
                // The workspace guard already released everything while unwinding.
                (
                    ExecutionResult::failure(msg),
                    execution.change_state(ExecutionState::CleanedUp),
                )
            }
        }
    }

    async fn execute(
        &self,
        spec: &LanguageSpec,
        code: &str,
        stdin: &str,
        execution: Execution,
    ) -> (ExecutionResult, Execution) {
        let workspace = match Workspace::stage(&self.config.work_dir, spec, code, self.platform) {
            Ok(workspace) => workspace,
            Err(e) => {
                tracing::error!("Failed to stage {} source: {}", spec.id, e);
                return (
                    ExecutionResult::failure(ExecError::from(e).to_string()),
                    execution.change_state(ExecutionState::CleanedUp),
                );
            }
        };
        let execution = execution
            .change_state(ExecutionState::Staged)
            .change_state(ExecutionState::Invoked);

        let deadline = Instant::now() + self.config.timeout;
        let outcome = self
            .invoke(&spec.invocation, &workspace, stdin, deadline)
            .await
            .map_err(ExecError::from);

        let (result, state) = classify(outcome);
        let execution = execution.change_state(state);

        let cleanup = workspace.cleanup();
        let execution = execution.change_state(ExecutionState::CleanedUp);

        match cleanup {
            Ok(()) => (result, execution),
            Err(e) => {
                tracing::error!("Failed to clean up {} workspace: {}", spec.id, e);
                (ExecutionResult::failure(e.to_string()), execution)
            }
        }
    }

    /// Runs the recipe against the staged workspace. A failed compile step
    /// is returned as is and the run step is skipped. Both steps share one
    /// deadline, and compiler diagnostics precede the run step's stderr.
    async fn invoke(
        &self,
        invocation: &Invocation,
        workspace: &Workspace,
        stdin: &str,
        deadline: Instant,
    ) -> Result<RunResult, RunError> {
        match invocation {
            Invocation::SingleStep(run) => self.step(run, workspace, stdin, deadline).await,
            Invocation::CompileThenRun { compile, run } => {
                let compiled = self.step(compile, workspace, "", deadline).await?;
                if !compiled.success() {
                    tracing::debug!("Compile step exited with {}", compiled.status);
                    return Ok(compiled);
                }
                let mut ran = self.step(run, workspace, stdin, deadline).await?;
                if !compiled.stderr.is_empty() {
                    ran.stderr.insert_str(0, &compiled.stderr);
                }
                Ok(ran)
            }
        }
    }

    async fn step(
        &self,
        template: &CommandTemplate,
        workspace: &Workspace,
        stdin: &str,
        deadline: Instant,
    ) -> Result<RunResult, RunError> {
        let command = template.render(workspace.paths(), self.probe.as_ref());
        self.executor.execute(&command, stdin, deadline).await
    }
}

/// Maps a finished invocation onto the two-outcome result.
pub fn classify(outcome: Result<RunResult, ExecError>) -> (ExecutionResult, ExecutionState) {
    match outcome {
        Ok(run) if run.success() => (ExecutionResult::Success(run.stdout), ExecutionState::Succeeded),
        Ok(run) if run.stderr.is_empty() => (
            ExecutionResult::failure(UNKNOWN_ERROR_MSG),
            ExecutionState::Failed,
        ),
        Ok(run) => (ExecutionResult::Failure(run.stderr), ExecutionState::Failed),
        Err(ExecError::TimedOut) => (
            ExecutionResult::failure(TIMED_OUT_MSG),
            ExecutionState::TimedOut,
        ),
        Err(e) => {
            tracing::error!("Internal error during execution: {}", e);
            (ExecutionResult::failure(e.to_string()), ExecutionState::Failed)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "Execution panicked".to_string()
    }
}
