use std::io::ErrorKind;
use std::time::{Duration, SystemTime};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::task::JoinHandle;

use crate::execution::{
    ExecutionResult, ProcessExecutor, ProcessExitStatus, ProcessOutput, ProcessSpawnRequest,
    ProcessWaitFuture, RunningProcess,
};
use crate::models::{CoreError, CoreErrorKind, StageAction};

/// How long output pipes are drained after the direct child exits.
const DRAIN_WINDOW: Duration = Duration::from_millis(250);
const REAP_WINDOW: Duration = Duration::from_secs(1);

/// Runs commands as children in their own process group.
pub struct TokioProcessExecutor;

impl ProcessExecutor for TokioProcessExecutor {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>> {
        let command = &request.command;
        let program = command.program_name();

        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args)
            .envs(&command.env)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .process_group(0);
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|error| spawn_error(request.action, &command.program, &program, error))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        Ok(Box::new(TokioRunningProcess {
            pid: child.id(),
            child,
            stdout,
            stderr,
            program,
            started_at: SystemTime::now(),
            timeout: request.timeout,
            action: request.action,
        }))
    }
}

struct TokioRunningProcess {
    child: Child,
    pid: Option<u32>,
    stdout: JoinHandle<Vec<u8>>,
    stderr: JoinHandle<Vec<u8>>,
    program: String,
    started_at: SystemTime,
    timeout: Option<Duration>,
    action: StageAction,
}

impl RunningProcess for TokioRunningProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn wait(self: Box<Self>) -> ProcessWaitFuture {
        let Self {
            mut child,
            pid,
            stdout,
            stderr,
            program,
            started_at,
            timeout,
            action,
        } = *self;

        Box::pin(async move {
            let waited = match timeout {
                Some(limit) => tokio::time::timeout(limit, child.wait()).await.ok(),
                None => Some(child.wait().await),
            };

            let Some(status) = waited else {
                // `brew services` and pg_ctl leave helpers in the group; take them all down.
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                let _ = tokio::time::timeout(REAP_WINDOW, child.wait()).await;
                stdout.abort();
                let stderr = collect(stderr).await;
                return Err(timeout_error(action, &program, timeout, &stderr));
            };

            let status = status.map_err(|error| {
                CoreError::for_action(
                    action,
                    CoreErrorKind::ProcessFailure,
                    format!("failed to wait for {program}: {error}"),
                )
            })?;

            Ok(ProcessOutput {
                status: match status.code() {
                    Some(code) => ProcessExitStatus::ExitCode(code),
                    None => ProcessExitStatus::Terminated,
                },
                stdout: collect(stdout).await,
                stderr: collect(stderr).await,
                started_at,
                finished_at: SystemTime::now(),
            })
        })
    }
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer).await;
        }
        buffer
    })
}

/// Detached grandchildren can hold a pipe open long after the child exits, so
/// reading stops after [`DRAIN_WINDOW`].
async fn collect(reader: JoinHandle<Vec<u8>>) -> Vec<u8> {
    match tokio::time::timeout(DRAIN_WINDOW, reader).await {
        Ok(Ok(buffer)) => buffer,
        _ => Vec::new(),
    }
}

fn kill_process_group(pid: u32) {
    let group = -(pid as libc::pid_t);
    // ESRCH means the group already exited.
    if unsafe { libc::kill(group, libc::SIGKILL) } != 0 {
        let error = std::io::Error::last_os_error();
        if error.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pid, error = %error, "failed to kill timed-out process group");
        }
    }
}

fn spawn_error(
    action: StageAction,
    path: &std::path::Path,
    program: &str,
    error: std::io::Error,
) -> CoreError {
    let base = CoreError::for_action(
        action,
        CoreErrorKind::ProcessFailure,
        format!("failed to start {}: {error}", path.display()),
    );
    match error.kind() {
        ErrorKind::NotFound => base.with_hint(format!(
            "install {program} or make sure {} is the right path",
            path.display()
        )),
        ErrorKind::PermissionDenied => {
            base.with_hint(format!("{} is not executable", path.display()))
        }
        _ => base,
    }
}

fn timeout_error(
    action: StageAction,
    program: &str,
    limit: Option<Duration>,
    stderr: &[u8],
) -> CoreError {
    let limit = limit.unwrap_or_default();
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    let message = if stderr.is_empty() {
        format!("{program} timed out after {}ms", limit.as_millis())
    } else {
        format!("{program} timed out after {}ms: {stderr}", limit.as_millis())
    };
    CoreError::for_action(action, CoreErrorKind::Timeout, message)
}
