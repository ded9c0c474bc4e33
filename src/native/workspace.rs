use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir, TempPath};

use crate::{
    constants::STAGING_PREFIX,
    core::domain::{LanguageSpec, StagedPaths, Staging},
    native::platform::HostPlatform,
};

#[derive(Debug)]
enum Layout {
    File(TempPath),
    Directory(TempDir),
}

/// Staged source of exactly one execution. Every artifact is removed by
/// [`Workspace::cleanup`], or on drop if cleanup never ran.
#[derive(Debug)]
pub struct Workspace {
    layout: Option<Layout>,
    paths: StagedPaths,
}

impl Workspace {
    pub fn stage(
        base_dir: &Path,
        spec: &LanguageSpec,
        code: &str,
        platform: &dyn HostPlatform,
    ) -> io::Result<Self> {
        fs::create_dir_all(base_dir)?;

        match spec.staging {
            Staging::File => {
                let mut file = Builder::new()
                    .prefix(STAGING_PREFIX)
                    .suffix(spec.source_extension)
                    .tempfile_in(base_dir)?;
                file.write_all(code.as_bytes())?;
                file.flush()?;

                let path = file.into_temp_path();
                let source = path.to_path_buf();
                let artifact = append_suffix(&source, platform.binary_suffix());
                let dir = source
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| base_dir.to_path_buf());

                Ok(Self {
                    layout: Some(Layout::File(path)),
                    paths: StagedPaths {
                        source,
                        artifact,
                        dir,
                        entry: None,
                        cwd: None,
                    },
                })
            }
            Staging::Directory { entry } => {
                let dir = Builder::new().prefix(STAGING_PREFIX).tempdir_in(base_dir)?;
                let source = dir.path().join(format!("{entry}{}", spec.source_extension));
                fs::write(&source, code)?;

                let paths = StagedPaths {
                    artifact: dir.path().join(format!("{entry}{}", platform.binary_suffix())),
                    source,
                    dir: dir.path().to_path_buf(),
                    entry: Some(entry),
                    cwd: Some(dir.path().to_path_buf()),
                };

                Ok(Self {
                    layout: Some(Layout::Directory(dir)),
                    paths,
                })
            }
        }
    }

    pub fn paths(&self) -> &StagedPaths {
        &self.paths
    }

    pub fn cleanup(mut self) -> io::Result<()> {
        self.release()
    }

    fn release(&mut self) -> io::Result<()> {
        match self.layout.take() {
            Some(Layout::File(source)) => {
                let source_removed = source.close();
                let artifact_removed = remove_if_exists(&self.paths.artifact);
                source_removed.and(artifact_removed)
            }
            Some(Layout::Directory(dir)) => dir.close(),
            None => Ok(()),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(
                "Failed to remove workspace {}: {}",
                self.paths.source.display(),
                e
            );
        }
    }
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
