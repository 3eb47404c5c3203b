use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::execution::{
    CommandSpec, ProcessExecutor, ProcessSpawnRequest, run_and_collect_stdout, run_to_completion,
};
use crate::models::{CoreError, CoreErrorKind, StageAction};
use crate::sources::SourceResult;
use crate::sources::homebrew::HomebrewSource;

const HOMEBREW_BIN_DIRS: &str = "/opt/homebrew/bin:/usr/local/bin";
const SERVICE_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

pub struct ProcessHomebrewSource {
    executor: Arc<dyn ProcessExecutor>,
    brew: PathBuf,
}

impl ProcessHomebrewSource {
    pub fn new(executor: Arc<dyn ProcessExecutor>) -> Self {
        Self::with_program(executor, "brew")
    }

    pub fn with_program(executor: Arc<dyn ProcessExecutor>, brew: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            brew: brew.into(),
        }
    }

    fn request(
        &self,
        action: StageAction,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> ProcessSpawnRequest {
        // Login shells from GUI launchers miss the Homebrew prefixes, so add them explicitly.
        let path = std::env::var("PATH").unwrap_or_default();
        let command = CommandSpec::new(&self.brew)
            .args(args)
            .env("PATH", format!("{HOMEBREW_BIN_DIRS}:{path}"))
            .env("HOMEBREW_NO_AUTO_UPDATE", "1");

        ProcessSpawnRequest::new(action, command).timeout(SERVICE_COMMAND_TIMEOUT)
    }
}

impl HomebrewSource for ProcessHomebrewSource {
    async fn installed_versions(&self, formula: &str) -> SourceResult<Option<String>> {
        let request = self.request(StageAction::ProbeInstalled, ["list", "--versions", formula]);
        let output = run_to_completion(self.executor.as_ref(), request).await?;

        if !output.success() {
            return Ok(None);
        }

        let stdout = output.stdout_text();
        let line = stdout.lines().map(str::trim).find(|line| !line.is_empty());
        Ok(line.map(str::to_owned))
    }

    async fn formula_prefix(&self, formula: &str) -> SourceResult<PathBuf> {
        let request = self.request(StageAction::ResolvePrefix, ["--prefix", formula]);
        let stdout = run_and_collect_stdout(self.executor.as_ref(), request).await?;
        let prefix = stdout.trim();

        if prefix.is_empty() {
            return Err(CoreError::for_action(
                StageAction::ResolvePrefix,
                CoreErrorKind::ParseFailure,
                format!("brew --prefix {formula} printed no path"),
            ));
        }

        Ok(PathBuf::from(prefix))
    }

    async fn list_services(&self) -> SourceResult<String> {
        let request = self.request(StageAction::ListServices, ["services", "list", "--json"]);
        run_and_collect_stdout(self.executor.as_ref(), request).await
    }

    async fn start_service(&self, formula: &str) -> SourceResult<()> {
        let request = self.request(StageAction::StartService, ["services", "start", formula]);
        run_and_collect_stdout(self.executor.as_ref(), request)
            .await
            .map(|_| ())
    }

    async fn stop_service(&self, formula: &str) -> SourceResult<()> {
        let request = self.request(StageAction::StopService, ["services", "stop", formula]);
        run_and_collect_stdout(self.executor.as_ref(), request)
            .await
            .map(|_| ())
    }
}
