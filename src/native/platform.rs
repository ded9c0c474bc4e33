use std::io;
use std::process::Command;

/// Host OS capabilities the executor and workspace depend on.
pub trait HostPlatform: std::fmt::Debug + Send + Sync {
    /// Appended to the staged source path to name the compiled binary.
    fn binary_suffix(&self) -> &'static str;

    /// Prepares a command so that its whole process tree can later be
    /// terminated through the child's pid.
    fn isolate(&self, command: &mut Command);

    /// Kills the process tree rooted at `pid`. A tree that is already gone
    /// is not an error.
    fn terminate_tree(&self, pid: u32) -> io::Result<()>;
}

pub fn host() -> &'static dyn HostPlatform {
    #[cfg(unix)]
    {
        &Posix
    }
    #[cfg(windows)]
    {
        &Windows
    }
}

#[cfg(unix)]
#[derive(Debug)]
pub struct Posix;

#[cfg(unix)]
impl HostPlatform for Posix {
    fn binary_suffix(&self) -> &'static str {
        ".out"
    }

    fn isolate(&self, command: &mut Command) {
        use std::os::unix::process::CommandExt;

        // Child leads a new process group whose id equals its pid.
        command.process_group(0);
    }

    fn terminate_tree(&self, pid: u32) -> io::Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        let pgid = i32::try_from(pid).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(io::Error::from(errno)),
        }
    }
}

#[cfg(windows)]
#[derive(Debug)]
pub struct Windows;

#[cfg(windows)]
impl HostPlatform for Windows {
    fn binary_suffix(&self) -> &'static str {
        ".exe"
    }

    fn isolate(&self, _command: &mut Command) {}

    fn terminate_tree(&self, pid: u32) -> io::Result<()> {
        // taskkill exits non-zero when the tree is already gone
        Command::new("taskkill")
            .args(["/F", "/T", "/PID", &pid.to_string()])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|_| ())
    }
}
