use std::path::PathBuf;

use serde::Serialize;

use crate::config::BootstrapConfig;
use crate::execution::{CommandSpec, ProcessExecutor, ProcessSpawnRequest, run_to_completion};
use crate::models::{CoreError, CoreErrorKind, StageAction, WorkflowWarning};
use crate::persistence::env_file::{self, LoadOutcome};
use crate::sources::{HomebrewSource, PostgresSource};
use crate::workflow::{PrepareReport, Workflow};

/// An isolated interpreter environment whose `bin` directory leads `PATH` for child processes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActivatedEnvironment {
    pub root: PathBuf,
    pub bin_dir: PathBuf,
    pub python: PathBuf,
    path_var: String,
}

impl ActivatedEnvironment {
    pub fn apply(&self, command: CommandSpec) -> CommandSpec {
        command
            .env("VIRTUAL_ENV", self.root.to_string_lossy())
            .env("PATH", self.path_var.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct BootstrapReport {
    pub environment: PathBuf,
    pub configuration_loaded: bool,
    pub prepare: PrepareReport,
    pub warnings: Vec<WorkflowWarning>,
}

/// Fail-fast composition: activate → install → load configuration → prepare → verify.
/// Nothing is rolled back when a step fails.
pub struct Bootstrapper<'a> {
    executor: &'a dyn ProcessExecutor,
    config: &'a BootstrapConfig,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(executor: &'a dyn ProcessExecutor, config: &'a BootstrapConfig) -> Self {
        Self { executor, config }
    }

    pub fn activate(&self) -> Result<ActivatedEnvironment, CoreError> {
        let root = self.config.resolve(&self.config.venv_dir);
        let bin_dir = root.join("bin");
        let python = bin_dir.join("python");

        if !python.is_file() {
            return Err(CoreError::for_action(
                StageAction::ActivateEnvironment,
                CoreErrorKind::EnvironmentMissing,
                format!("no Python interpreter at {}", python.display()),
            )
            .with_hint(format!("python3 -m venv {}", self.config.venv_dir.display())));
        }

        let inherited = std::env::var("PATH").unwrap_or_default();
        let path_var = if inherited.is_empty() {
            bin_dir.to_string_lossy().to_string()
        } else {
            format!("{}:{inherited}", bin_dir.display())
        };

        tracing::info!(environment = %root.display(), "activated virtual environment");
        Ok(ActivatedEnvironment {
            root,
            bin_dir,
            python,
            path_var,
        })
    }

    pub async fn install_dependencies(
        &self,
        environment: &ActivatedEnvironment,
    ) -> Result<(), CoreError> {
        let manifest = self.config.resolve(&self.config.requirements);
        if !manifest.is_file() {
            return Err(CoreError::for_action(
                StageAction::InstallDependencies,
                CoreErrorKind::Configuration,
                format!("dependency manifest {} not found", manifest.display()),
            ));
        }

        tracing::info!(manifest = %manifest.display(), "installing dependencies");
        let command = environment
            .apply(CommandSpec::new(&environment.python))
            .args(["-m", "pip", "install", "-r"])
            .arg(manifest.to_string_lossy())
            .env("PIP_DISABLE_PIP_VERSION_CHECK", "1")
            .working_dir(&self.config.project_root);
        let request = ProcessSpawnRequest::new(StageAction::InstallDependencies, command);

        let output = run_to_completion(self.executor, request).await?;
        if !output.success() {
            return Err(CoreError::for_action(
                StageAction::InstallDependencies,
                CoreErrorKind::ProcessFailure,
                format!("pip install {}", output.failure_summary()),
            ));
        }
        Ok(())
    }

    /// Loads the key/value file into the process environment; a missing file is a warning.
    pub fn load_configuration(
        &self,
        warnings: &mut Vec<WorkflowWarning>,
    ) -> Result<bool, CoreError> {
        let path = self.config.resolve(&self.config.env_file);
        match env_file::load_into_process(&path)? {
            LoadOutcome::Loaded { path } => {
                tracing::info!(path = %path.display(), "loaded configuration");
                Ok(true)
            }
            LoadOutcome::Missing { path } => {
                let warning = WorkflowWarning::ConfigFileMissing { path };
                tracing::warn!("{warning}");
                warnings.push(warning);
                Ok(false)
            }
        }
    }

    pub async fn run_verification(
        &self,
        environment: &ActivatedEnvironment,
    ) -> Result<(), CoreError> {
        let script = self.config.resolve(&self.config.verify_script);
        tracing::info!(script = %script.display(), "running verification entry point");

        let command = environment
            .apply(CommandSpec::new(&environment.python))
            .arg(script.to_string_lossy())
            .working_dir(&self.config.project_root);
        let request = ProcessSpawnRequest::new(StageAction::RunVerification, command);

        let output = run_to_completion(self.executor, request).await?;
        for line in output.stdout_text().lines().filter(|line| !line.trim().is_empty()) {
            tracing::info!(target: "pgprep::verify", "{line}");
        }

        if !output.success() {
            return Err(CoreError::for_action(
                StageAction::RunVerification,
                CoreErrorKind::ProcessFailure,
                format!("{} {}", script.display(), output.failure_summary()),
            ));
        }
        Ok(())
    }

    /// `build_workflow` runs after the configuration file is loaded, so it can read
    /// connection settings from the environment.
    pub async fn run<H, P, F>(&self, build_workflow: F) -> Result<BootstrapReport, CoreError>
    where
        H: HomebrewSource,
        P: PostgresSource,
        F: FnOnce() -> Result<Workflow<H, P>, CoreError>,
    {
        let mut warnings = Vec::new();

        let environment = self.activate()?;
        self.install_dependencies(&environment).await?;
        let configuration_loaded = self.load_configuration(&mut warnings)?;

        let workflow = build_workflow()?;
        let prepare = workflow.prepare().await?;

        self.run_verification(&environment).await?;

        Ok(BootstrapReport {
            environment: environment.root,
            configuration_loaded,
            prepare,
            warnings,
        })
    }
}
