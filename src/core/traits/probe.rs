use std::path::PathBuf;

/// Locates toolchain executables on the host. Consulted on every call, never
/// cached, so toolchains installed or removed at runtime are picked up.
#[mockall::automock]
pub trait ToolchainProbe: std::fmt::Debug + Send + Sync {
    fn locate(&self, program: &str) -> Option<PathBuf>;
}
