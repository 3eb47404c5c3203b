use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::{Duration, SystemTime};

use crate::models::{CoreError, CoreErrorKind, StageAction};

pub mod tokio_process;

pub use tokio_process::TokioProcessExecutor;

pub type ExecutionResult<T> = Result<T, CoreError>;

pub type ProcessWaitFuture = Pin<Box<dyn Future<Output = ExecutionResult<ProcessOutput>> + Send>>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    /// Program name without its directory, for matching and log lines.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    pub fn validate(&self, action: StageAction) -> ExecutionResult<()> {
        if self.program.as_os_str().is_empty() {
            return Err(invalid_input(action, "command program path must not be empty"));
        }

        if self
            .args
            .iter()
            .any(|arg| arg.is_empty() || arg.contains('\0'))
        {
            return Err(invalid_input(
                action,
                "command args must be non-empty and must not contain NUL bytes",
            ));
        }

        if self
            .env
            .iter()
            .any(|(key, value)| key.is_empty() || key.contains('\0') || value.contains('\0'))
        {
            return Err(invalid_input(
                action,
                "environment keys and values must be non-empty and must not contain NUL bytes",
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessSpawnRequest {
    pub action: StageAction,
    pub command: CommandSpec,
    pub timeout: Option<Duration>,
}

impl ProcessSpawnRequest {
    pub fn new(action: StageAction, command: CommandSpec) -> Self {
        Self {
            action,
            command,
            timeout: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> ExecutionResult<()> {
        self.command.validate(self.action)?;

        if let Some(timeout) = self.timeout
            && timeout.is_zero()
        {
            return Err(invalid_input(
                self.action,
                "timeout must be greater than zero when provided",
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessExitStatus {
    ExitCode(i32),
    Terminated,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessOutput {
    pub status: ProcessExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == ProcessExitStatus::ExitCode(0)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn elapsed(&self) -> Duration {
        self.finished_at
            .duration_since(self.started_at)
            .unwrap_or_default()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// One-line description of a failed run, suitable for warnings.
    pub fn failure_summary(&self) -> String {
        let stderr = self.stderr_text();
        let stderr = stderr.trim();
        match (self.status, stderr.is_empty()) {
            (ProcessExitStatus::ExitCode(code), true) => format!("exited with code {code}"),
            (ProcessExitStatus::ExitCode(code), false) => {
                format!("exited with code {code}: {stderr}")
            }
            (ProcessExitStatus::Terminated, _) => "terminated by signal".to_string(),
        }
    }
}

pub trait RunningProcess: Send {
    fn pid(&self) -> Option<u32>;

    fn wait(self: Box<Self>) -> ProcessWaitFuture;
}

pub trait ProcessExecutor: Send + Sync {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>>;
}

/// Validates and spawns the request, then waits for it whatever its exit status.
pub async fn run_to_completion(
    executor: &dyn ProcessExecutor,
    request: ProcessSpawnRequest,
) -> ExecutionResult<ProcessOutput> {
    request.validate()?;

    let action = request.action;
    let program = request.command.program_name();
    tracing::debug!(
        ?action,
        program = %request.command.program.display(),
        args = ?request.command.args,
        "running command"
    );

    let process = executor.spawn(request)?;
    let pid = process.pid();
    let output = process.wait().await?;

    tracing::debug!(
        ?action,
        program = %program,
        pid = ?pid,
        status = ?output.status,
        elapsed_ms = output.elapsed().as_millis() as u64,
        "command finished"
    );
    Ok(output)
}

/// Runs the request and returns stdout, failing on a non-zero exit.
pub async fn run_and_collect_stdout(
    executor: &dyn ProcessExecutor,
    request: ProcessSpawnRequest,
) -> ExecutionResult<String> {
    let action = request.action;
    let output = run_to_completion(executor, request).await?;

    match output.status {
        ProcessExitStatus::ExitCode(0) => String::from_utf8(output.stdout).map_err(|error| {
            CoreError::for_action(
                action,
                CoreErrorKind::ParseFailure,
                format!("process stdout is not valid UTF-8: {error}"),
            )
        }),
        ProcessExitStatus::ExitCode(_) | ProcessExitStatus::Terminated => Err(CoreError::for_action(
            action,
            CoreErrorKind::ProcessFailure,
            format!("process {}", output.failure_summary()),
        )),
    }
}

fn invalid_input(action: StageAction, message: &str) -> CoreError {
    CoreError::for_action(action, CoreErrorKind::InvalidInput, message)
}
