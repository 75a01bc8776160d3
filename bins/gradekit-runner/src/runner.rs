/// Command Runner - Subprocess Execution for Graded Commands
///
/// **Core Responsibility:**
/// Run a shell command under a wall-clock timeout with a fixed environment
/// and report how it ended.
///
/// **Critical Architectural Boundary:**
/// - Runner knows HOW to execute (shell, process group, timeout)
/// - Runner does NOT parse reports
/// - Runner does NOT assign scores
/// - Runner returns raw stdout or a typed failure for the executor to classify
use crate::config::CommandEnv;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

const SHELL: &str = "/bin/sh";

/// Exit status POSIX shells use when a command cannot be found
const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// How long output pipes may stay open after leftover processes are killed
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Ways a command can fail to complete successfully
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("unable to locate executable file: {0}")]
    ExecutableNotFound(String),

    #[error("command exited with code {code:?}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("failed to run command: {0}")]
    Io(#[from] std::io::Error),
}

/// How a command is run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub timeout: Duration,
    pub env: CommandEnv,
    /// Pass stdout/stderr through to this process instead of capturing them
    pub inherit_stdio: bool,
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion.
    ///
    /// Returns captured stdout (empty when stdio is inherited). On timeout
    /// the child has been killed before this returns.
    async fn run(&self, command: &str, options: &RunOptions) -> Result<Vec<u8>, CommandError>;
}

/// Runs commands through `/bin/sh -c`
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, options: &RunOptions) -> Result<Vec<u8>, CommandError> {
        let mut cmd = Command::new(SHELL);
        cmd.arg("-c")
            .arg(command)
            .env_clear()
            .envs(options.env.iter())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if options.inherit_stdio {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        // Own process group so a timeout can take down everything the shell started
        #[cfg(unix)]
        cmd.process_group(0);

        debug!(command = %command, timeout_ms = options.timeout.as_millis() as u64, "Spawning command");

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CommandError::ExecutableNotFound(SHELL.to_string()));
            }
            Err(e) => return Err(CommandError::Io(e)),
        };

        let deadline = Instant::now() + options.timeout;
        let pid = child.id();
        let stdout_task = child.stdout.take().map(drain);
        let stderr_task = child.stderr.take().map(drain);

        // HARD TIMEOUT: the child is killed and reaped before we report it
        let status = match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(command = %command, timeout_ms = options.timeout.as_millis() as u64, "Command timed out, killing it");
                terminate(&mut child, pid).await;
                return Err(CommandError::Timeout(options.timeout));
            }
        };

        // Background processes may still hold the pipes; same deadline applies
        let stdout = collect(stdout_task, deadline, pid).await;
        let stderr = collect(stderr_task, deadline, pid).await;

        debug!(command = %command, code = ?status.code(), "Command exited");

        if status.success() {
            return Ok(stdout);
        }

        match status.code() {
            Some(EXIT_COMMAND_NOT_FOUND) => Err(CommandError::ExecutableNotFound(executable_name(command))),
            code => Err(CommandError::NonZeroExit {
                code,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            }),
        }
    }
}

/// First word of a shell command, used to name a missing executable
pub fn executable_name(command: &str) -> String {
    shell_words::split(command)
        .ok()
        .and_then(|words| words.into_iter().next())
        .unwrap_or_else(|| command.trim().to_string())
}

fn drain<R>(mut pipe: R) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            warn!(error = %e, "Failed to read command output");
        }
        buf
    })
}

async fn collect(task: Option<JoinHandle<Vec<u8>>>, deadline: Instant, pid: Option<u32>) -> Vec<u8> {
    let Some(mut task) = task else {
        return Vec::new();
    };

    if let Ok(joined) = tokio::time::timeout_at(deadline, &mut task).await {
        return joined.unwrap_or_default();
    }

    warn!("Command output still open at deadline, killing leftover processes");
    kill_process_group(pid);

    match tokio::time::timeout(DRAIN_GRACE, &mut task).await {
        Ok(joined) => joined.unwrap_or_default(),
        Err(_) => {
            // Writer escaped the process group
            task.abort();
            Vec::new()
        }
    }
}

async fn terminate(child: &mut Child, pid: Option<u32>) {
    kill_process_group(pid);
    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill timed-out command");
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        // SAFETY: killpg only sends a signal; the group was created for this child
        let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
        if rc != 0 {
            debug!(pid, error = %std::io::Error::last_os_error(), "killpg failed");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
