//! The environment-preparation workflow: probe → ensure running → ensure
//! database → verify, plus its teardown, reset and status companions.

pub mod bootstrap;
pub mod poll;
pub mod prober;
pub mod provisioner;
pub mod service;
pub mod verifier;

use serde::Serialize;

use crate::config::WorkflowConfig;
use crate::models::{
    CoreError, DropOutcome, ProvisionOutcome, ResolvedInstallation, ServiceOutcome, ServiceState,
    StopOutcome, VerificationOutcome, WorkflowWarning,
};
use crate::sources::{HomebrewSource, PostgresSource};

pub use bootstrap::{ActivatedEnvironment, BootstrapReport, Bootstrapper};
pub use poll::{PollOutcome, PollPolicy, poll_until};
pub use prober::InstallationProber;
pub use provisioner::DatabaseProvisioner;
pub use service::ServiceController;
pub use verifier::ConnectionVerifier;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PrepareReport {
    pub installation: ResolvedInstallation,
    pub service: ServiceOutcome,
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped: Option<DropOutcome>,
    pub provision: ProvisionOutcome,
    pub verification: VerificationOutcome,
    pub warnings: Vec<WorkflowWarning>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TeardownReport {
    pub installation: ResolvedInstallation,
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped: Option<DropOutcome>,
    pub service: StopOutcome,
    pub warnings: Vec<WorkflowWarning>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct StatusReport {
    pub installation: ResolvedInstallation,
    pub service: ServiceState,
    pub database: String,
    /// Unknown while the service is not running.
    pub database_exists: Option<bool>,
}

pub struct Workflow<H: HomebrewSource, P: PostgresSource> {
    homebrew: H,
    postgres: P,
    config: WorkflowConfig,
}

impl<H: HomebrewSource, P: PostgresSource> Workflow<H, P> {
    pub fn new(homebrew: H, postgres: P, config: WorkflowConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            homebrew,
            postgres,
            config,
        })
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub async fn probe(&self) -> Result<ResolvedInstallation, CoreError> {
        InstallationProber::new(&self.homebrew)
            .probe(&self.config.variants)
            .await
    }

    fn controller(&self) -> ServiceController<'_, H, P> {
        ServiceController::new(&self.homebrew, &self.postgres, &self.config.connection)
    }

    fn provisioner<'a>(
        &'a self,
        installation: &'a ResolvedInstallation,
    ) -> DatabaseProvisioner<'a, P> {
        DatabaseProvisioner::new(&self.postgres, installation, &self.config.connection)
    }

    pub async fn prepare(&self) -> Result<PrepareReport, CoreError> {
        self.run_prepare(false).await
    }

    /// Like [`Workflow::prepare`], but drops the target database before recreating it.
    pub async fn reset(&self) -> Result<PrepareReport, CoreError> {
        self.run_prepare(true).await
    }

    async fn run_prepare(&self, drop_first: bool) -> Result<PrepareReport, CoreError> {
        let mut warnings = Vec::new();
        let database = self.config.database.as_str();

        let installation = self.probe().await?;
        let service = self
            .controller()
            .ensure_running(&installation, &self.config.readiness, &mut warnings)
            .await?;

        let provisioner = self.provisioner(&installation);
        let dropped = if drop_first {
            Some(provisioner.drop_if_exists(database).await?)
        } else {
            None
        };
        let provision = provisioner.ensure_exists(database).await?;

        let verification = ConnectionVerifier::new(
            &self.postgres,
            &installation,
            &self.config.connection,
        )
        .verify(database, &mut warnings)
        .await;

        Ok(PrepareReport {
            installation,
            service,
            database: database.to_string(),
            dropped,
            provision,
            verification,
            warnings,
        })
    }

    /// Stops the service; with `drop_database`, drops the target database first.
    pub async fn teardown(&self, drop_database: bool) -> Result<TeardownReport, CoreError> {
        let mut warnings = Vec::new();
        let database = self.config.database.as_str();

        let installation = self.probe().await?;
        let controller = self.controller();

        let dropped = if !drop_database {
            None
        } else if controller.state(&installation).await?.is_running() {
            Some(self.provisioner(&installation).drop_if_exists(database).await?)
        } else {
            let warning = WorkflowWarning::DropSkipped {
                database: database.to_string(),
                detail: "the service is not running".to_string(),
            };
            tracing::warn!("{warning}");
            warnings.push(warning);
            None
        };

        let service = controller
            .ensure_stopped(&installation, self.config.stop_grace, &mut warnings)
            .await?;

        Ok(TeardownReport {
            installation,
            database: database.to_string(),
            dropped,
            service,
            warnings,
        })
    }

    /// Read-only: never starts, creates or stops anything.
    pub async fn status(&self) -> Result<StatusReport, CoreError> {
        let installation = self.probe().await?;
        let service = self.controller().state(&installation).await?;

        let database_exists = if service.is_running() {
            Some(
                self.provisioner(&installation)
                    .exists(&self.config.database)
                    .await?,
            )
        } else {
            None
        };

        Ok(StatusReport {
            installation,
            service,
            database: self.config.database.clone(),
            database_exists,
        })
    }
}
