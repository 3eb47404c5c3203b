use std::time::Duration;

use crate::models::{
    ConnectionParams, CoreError, CoreErrorKind, Readiness, ResolvedInstallation, ServiceOutcome,
    ServiceState, StageAction, StopOutcome, WorkflowWarning,
};
use crate::sources::{HomebrewSource, PostgresSource, parse_service_list, service_state};
use crate::workflow::poll::{PollOutcome, PollPolicy, poll_until};

pub struct ServiceController<'a, H: HomebrewSource, P: PostgresSource> {
    homebrew: &'a H,
    postgres: &'a P,
    connection: &'a ConnectionParams,
}

impl<'a, H: HomebrewSource, P: PostgresSource> ServiceController<'a, H, P> {
    pub fn new(homebrew: &'a H, postgres: &'a P, connection: &'a ConnectionParams) -> Self {
        Self {
            homebrew,
            postgres,
            connection,
        }
    }

    pub async fn state(
        &self,
        installation: &ResolvedInstallation,
    ) -> Result<ServiceState, CoreError> {
        let raw = self.homebrew.list_services().await?;
        let entries = parse_service_list(&raw)?;
        Ok(service_state(&entries, &installation.variant))
    }

    /// Starts the service unless the registry already reports it running.
    ///
    /// Warnings for a server that is still initializing are pushed onto `warnings`.
    pub async fn ensure_running(
        &self,
        installation: &ResolvedInstallation,
        readiness: &PollPolicy,
        warnings: &mut Vec<WorkflowWarning>,
    ) -> Result<ServiceOutcome, CoreError> {
        if self.state(installation).await?.is_running() {
            tracing::info!(variant = %installation.variant, "service already running");
            return Ok(ServiceOutcome::AlreadyRunning);
        }

        tracing::info!(variant = %installation.variant, "starting service");
        // A failing start command is fatal only when no status check confirms the service.
        let start_failure = match self.homebrew.start_service(&installation.variant).await {
            Ok(()) => None,
            Err(error) => {
                tracing::warn!(
                    variant = %installation.variant,
                    error = %error.message,
                    "start command failed, checking whether the service came up"
                );
                Some(format!(
                    "brew services start {} failed: {}",
                    installation.variant, error.message
                ))
            }
        };
        let start_failure = start_failure.as_deref();

        let readiness = if self.postgres.has_readiness_probe(installation) {
            self.await_probe(installation, readiness, start_failure, warnings)
                .await?
        } else {
            self.await_registry(installation, readiness, start_failure)
                .await?
        };

        Ok(ServiceOutcome::Started { readiness })
    }

    async fn await_probe(
        &self,
        installation: &ResolvedInstallation,
        policy: &PollPolicy,
        start_failure: Option<&str>,
        warnings: &mut Vec<WorkflowWarning>,
    ) -> Result<Readiness, CoreError> {
        let outcome = poll_until(policy, |attempt| async move {
            let ready = match self
                .postgres
                .readiness_probe(installation, self.connection)
                .await
            {
                Ok(ready) => ready,
                Err(error) => {
                    tracing::debug!(attempt, error = %error, "readiness probe failed to run");
                    false
                }
            };
            Ok::<bool, CoreError>(ready)
        })
        .await?;

        match outcome {
            PollOutcome::Satisfied { attempts } => {
                tracing::info!(
                    variant = %installation.variant,
                    attempts,
                    "server accepting connections"
                );
                Ok(Readiness::Ready { attempts })
            }
            PollOutcome::Exhausted { attempts } => {
                if let Some(failure) = start_failure
                    && !self.state(installation).await?.is_running()
                {
                    return Err(start_error(format!(
                        "{failure}; {} did not accept connections after {attempts} checks \
                         and is not reported as started",
                        installation.variant
                    ))
                    .with_hint(service_hint(&installation.variant)));
                }
                let warning = WorkflowWarning::ReadinessPending {
                    variant: installation.variant.clone(),
                    attempts,
                };
                tracing::warn!("{warning}");
                warnings.push(warning);
                Ok(Readiness::StillInitializing { attempts })
            }
        }
    }

    /// Without `pg_isready` the registry is the only signal; it must show the service started.
    async fn await_registry(
        &self,
        installation: &ResolvedInstallation,
        policy: &PollPolicy,
        start_failure: Option<&str>,
    ) -> Result<Readiness, CoreError> {
        tracing::info!(
            variant = %installation.variant,
            "no readiness probe installed, checking service registry"
        );
        let outcome = poll_until(policy, |_| async move {
            let state = self.state(installation).await?;
            Ok::<bool, CoreError>(state.is_running())
        })
        .await?;

        match outcome {
            PollOutcome::Satisfied { attempts } => Ok(Readiness::RegistryConfirmed { attempts }),
            PollOutcome::Exhausted { attempts } => {
                let unconfirmed = format!(
                    "{} is not reported as started after {attempts} registry checks",
                    installation.variant
                );
                let message = match start_failure {
                    Some(failure) => format!("{failure}; {unconfirmed}"),
                    None => unconfirmed,
                };
                Err(start_error(message).with_hint(service_hint(&installation.variant)))
            }
        }
    }

    /// Stops the service if it is running. Failure to confirm is a warning.
    pub async fn ensure_stopped(
        &self,
        installation: &ResolvedInstallation,
        grace: Duration,
        warnings: &mut Vec<WorkflowWarning>,
    ) -> Result<StopOutcome, CoreError> {
        if !self.state(installation).await?.is_running() {
            tracing::info!(variant = %installation.variant, "service not running");
            return Ok(StopOutcome::NotRunning);
        }

        tracing::info!(variant = %installation.variant, "stopping service");
        let outcome = match self.homebrew.stop_service(&installation.variant).await {
            Ok(()) => {
                if !grace.is_zero() {
                    tokio::time::sleep(grace).await;
                }
                match self.state(installation).await {
                    Ok(state) if !state.is_running() => StopOutcome::Stopped,
                    Ok(_) => StopOutcome::Unconfirmed {
                        detail: "registry still reports the service as started".to_string(),
                    },
                    Err(error) => StopOutcome::Unconfirmed {
                        detail: error.message,
                    },
                }
            }
            Err(error) => StopOutcome::Unconfirmed {
                detail: error.message,
            },
        };

        if let StopOutcome::Unconfirmed { detail } = &outcome {
            let warning = WorkflowWarning::ServiceStop {
                variant: installation.variant.clone(),
                detail: detail.clone(),
            };
            tracing::warn!("{warning}");
            warnings.push(warning);
        }

        Ok(outcome)
    }
}

fn service_hint(variant: &str) -> String {
    format!("check `brew services info {variant}` and the server log")
}

fn start_error(message: String) -> CoreError {
    CoreError::for_action(StageAction::StartService, CoreErrorKind::ServiceStart, message)
}
