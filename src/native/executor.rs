use std::io;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::time::{Instant, timeout_at};

use crate::{
    core::{
        domain::CommandSpec,
        traits::executor::{Executor, RunError, RunResult},
    },
    native::platform::{self, HostPlatform},
};

#[derive(Clone, Debug)]
pub struct NativeExecutor {
    platform: &'static dyn HostPlatform,
}

impl Default for NativeExecutor {
    fn default() -> Self {
        Self::new(platform::host())
    }
}

impl NativeExecutor {
    pub fn new(platform: &'static dyn HostPlatform) -> Self {
        NativeExecutor { platform }
    }

    fn spawn(&self, command: &CommandSpec) -> io::Result<Child> {
        let mut std_cmd = std::process::Command::new(&command.program);
        std_cmd
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.cwd {
            std_cmd.current_dir(dir);
        }
        self.platform.isolate(&mut std_cmd);

        Command::from(std_cmd).kill_on_drop(true).spawn()
    }

    async fn terminate(&self, child: &mut Child, pid: Option<u32>) {
        if let Some(pid) = pid {
            if let Err(e) = self.platform.terminate_tree(pid) {
                tracing::error!("Failed to terminate process tree {}: {}", pid, e);
            }
        }
        // Reaps the direct child; a no-op if it already exited.
        let _ = child.kill().await;
    }
}

#[async_trait::async_trait]
impl Executor for NativeExecutor {
    async fn execute(
        &self,
        command: &CommandSpec,
        stdin: &str,
        deadline: Instant,
    ) -> Result<RunResult, RunError> {
        tracing::debug!("Spawning: {}", command);

        let mut child = self.spawn(command).map_err(|e| RunError::Internal {
            msg: format!("Failed to run {}: {}", command.program_name(), e),
        })?;
        let pid = child.id();

        // Written from a separate task so a child that never reads its input
        // cannot block output collection. Dropping the pipe sends EOF.
        let writer = child.stdin.take().map(|mut pipe| {
            let input = stdin.as_bytes().to_vec();
            tokio::spawn(async move {
                if let Err(e) = pipe.write_all(&input).await {
                    tracing::debug!("Child stopped reading stdin: {}", e);
                }
            })
        });
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let outcome = timeout_at(deadline, collect_output(&mut child, stdout, stderr)).await;

        if let Some(writer) = writer {
            writer.abort();
        }

        match outcome {
            Ok(Ok((status, stdout, stderr))) => {
                // Anything the program left behind in its group goes too.
                if let Some(pid) = pid {
                    if let Err(e) = self.platform.terminate_tree(pid) {
                        tracing::warn!("Failed to reap process group {}: {}", pid, e);
                    }
                }
                Ok(RunResult {
                    status: status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&stdout).to_string(),
                    stderr: String::from_utf8_lossy(&stderr).to_string(),
                })
            }
            Ok(Err(e)) => {
                self.terminate(&mut child, pid).await;
                Err(RunError::Internal {
                    msg: format!("Failed to collect output of {}: {}", command.program_name(), e),
                })
            }
            Err(_) => {
                tracing::info!("Deadline exceeded, killing {}", command.program_name());
                self.terminate(&mut child, pid).await;
                Err(RunError::TimedOut)
            }
        }
    }
}

async fn collect_output(
    child: &mut Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
) -> io::Result<(ExitStatus, Vec<u8>, Vec<u8>)> {
    tokio::try_join!(child.wait(), read_pipe(stdout), read_pipe(stderr))
}

async fn read_pipe<R>(pipe: Option<R>) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}
