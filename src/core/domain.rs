use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::traits::probe::ToolchainProbe;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Staging {
    /// One temporary file named `<random><extension>`.
    File,
    /// A dedicated directory holding `<entry><extension>`, for toolchains that
    /// bind the entry point name to the file name.
    Directory { entry: &'static str },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Program {
    /// Toolchain executable, given as candidate names tried in order.
    Toolchain(&'static [&'static str]),
    /// The native binary produced by the compile step.
    Artifact,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arg {
    Lit(&'static str),
    Source,
    Artifact,
    WorkDir,
    Entry,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandTemplate {
    pub program: Program,
    pub args: &'static [Arg],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Invocation {
    SingleStep(CommandTemplate),
    CompileThenRun {
        compile: CommandTemplate,
        run: CommandTemplate,
    },
}

impl Invocation {
    /// Every toolchain executable the recipe needs, in step order.
    pub fn toolchains(&self) -> Vec<&'static [&'static str]> {
        let steps = match self {
            Invocation::SingleStep(run) => vec![run],
            Invocation::CompileThenRun { compile, run } => vec![compile, run],
        };
        steps
            .into_iter()
            .filter_map(|step| match step.program {
                Program::Toolchain(candidates) => Some(candidates),
                Program::Artifact => None,
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LanguageSpec {
    pub id: &'static str,
    pub source_extension: &'static str,
    pub staging: Staging,
    pub invocation: Invocation,
}

impl LanguageSpec {
    /// A language is available when every toolchain executable it invokes
    /// can be located right now.
    pub fn is_available(&self, probe: &dyn ToolchainProbe) -> bool {
        self.invocation
            .toolchains()
            .into_iter()
            .all(|candidates| candidates.iter().any(|name| probe.locate(name).is_some()))
    }
}

/// Paths of one staged workspace, substituted into command templates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedPaths {
    pub source: PathBuf,
    pub artifact: PathBuf,
    pub dir: PathBuf,
    pub entry: Option<&'static str>,
    pub cwd: Option<PathBuf>,
}

impl CommandTemplate {
    pub fn render(&self, paths: &StagedPaths, probe: &dyn ToolchainProbe) -> CommandSpec {
        let program = match self.program {
            Program::Toolchain(candidates) => resolve_toolchain(candidates, probe),
            Program::Artifact => paths.artifact.clone(),
        };

        let args = self
            .args
            .iter()
            .map(|arg| match arg {
                Arg::Lit(value) => OsString::from(value),
                Arg::Source => paths.source.clone().into_os_string(),
                Arg::Artifact => paths.artifact.clone().into_os_string(),
                Arg::WorkDir => paths.dir.clone().into_os_string(),
                Arg::Entry => OsString::from(paths.entry.unwrap_or_default()),
            })
            .collect();

        CommandSpec {
            program,
            args,
            cwd: paths.cwd.clone(),
        }
    }
}

// An unresolved toolchain keeps its bare name so the spawn fails with the
// OS error for the missing executable.
fn resolve_toolchain(candidates: &[&str], probe: &dyn ToolchainProbe) -> PathBuf {
    candidates
        .iter()
        .find_map(|name| probe.locate(name))
        .unwrap_or_else(|| PathBuf::from(candidates.first().copied().unwrap_or_default()))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn program_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ExecutionRequest {
    pub code: String,
    pub stdin: String,
    pub language: String,
}

impl Default for ExecutionRequest {
    fn default() -> Self {
        Self {
            code: String::new(),
            stdin: String::new(),
            language: "python".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ExecutionResult {
    #[serde(rename = "output")]
    Success(String),
    #[serde(rename = "error")]
    Failure(String),
}

impl ExecutionResult {
    pub fn failure<S: Into<String>>(msg: S) -> Self {
        ExecutionResult::Failure(msg.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub available_languages: Vec<&'static str>,
    pub message: &'static str,
}

impl HealthReport {
    pub fn healthy(available_languages: Vec<&'static str>) -> Self {
        Self {
            status: "healthy",
            available_languages,
            message: "Backend is running and ready to execute code.",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionState {
    Pending,
    Staged,
    Invoked,
    Succeeded,
    Failed,
    TimedOut,
    CleanedUp,
}

impl ExecutionState {
    pub fn can_transition_to(self, next: ExecutionState) -> bool {
        use ExecutionState::*;

        match (self, next) {
            (CleanedUp, _) => false,
            (_, CleanedUp) => true,
            (Pending, Staged) | (Staged, Invoked) => true,
            (Invoked, Succeeded | Failed | TimedOut) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ExecutionState::CleanedUp
    }
}

#[derive(Clone, Debug)]
pub struct Execution {
    pub id: Uuid,
    pub language: String,
    pub state: ExecutionState,
    pub history: Vec<ExecutionState>,
}

impl Execution {
    pub fn new(language: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            language: language.to_string(),
            state: ExecutionState::Pending,
            history: vec![ExecutionState::Pending],
        }
    }

    pub fn change_state(&self, new_state: ExecutionState) -> Self {
        debug_assert!(
            self.state.can_transition_to(new_state),
            "illegal transition {:?} -> {:?}",
            self.state,
            new_state
        );
        tracing::debug!(
            execution = %self.id,
            language = %self.language,
            "State: {:?} -> {:?}",
            self.state,
            new_state
        );

        let mut history = self.history.clone();
        history.push(new_state);
        Self {
            state: new_state,
            history,
            ..self.clone()
        }
    }
}
