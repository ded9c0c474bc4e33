use std::path::PathBuf;

use crate::core::traits::probe::ToolchainProbe;

/// Looks executables up on the current `PATH`.
#[derive(Clone, Debug, Default)]
pub struct PathProbe;

impl ToolchainProbe for PathProbe {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}
