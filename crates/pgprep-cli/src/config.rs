use std::path::Path;
use std::sync::Arc;

use pgprep_core::config::{DEFAULT_DATABASE, WorkflowConfig};
use pgprep_core::execution::ProcessExecutor;
use pgprep_core::models::{CoreError, DatabaseUrl};
use pgprep_core::persistence::env_file::{self, LoadOutcome};
use pgprep_core::sources::{ProcessHomebrewSource, ProcessPostgresSource};
use pgprep_core::workflow::{PollPolicy, Workflow};

use crate::cli::WorkflowArgs;

pub type ProcessWorkflow = Workflow<ProcessHomebrewSource, ProcessPostgresSource>;

/// Loads the configuration file for the non-bootstrap commands; a missing file is fine.
pub fn load_env_file(path: &Path) -> Result<(), CoreError> {
    match env_file::load_into_process(path)? {
        LoadOutcome::Loaded { path } => {
            tracing::debug!(path = %path.display(), "loaded configuration");
        }
        LoadOutcome::Missing { path } => {
            tracing::debug!(path = %path.display(), "no configuration file");
        }
    }
    Ok(())
}

/// Reads the connection string from the environment, so it must run after
/// [`load_env_file`].
pub fn build_workflow(
    executor: Arc<dyn ProcessExecutor>,
    args: &WorkflowArgs,
) -> Result<ProcessWorkflow, CoreError> {
    let url = DatabaseUrl::from_env().transpose()?;
    let config = workflow_config(args, url.as_ref());

    Workflow::new(
        ProcessHomebrewSource::with_program(executor.clone(), &args.brew),
        ProcessPostgresSource::new(executor),
        config,
    )
}

/// `--database` wins over the database named in the connection string.
pub fn workflow_config(args: &WorkflowArgs, url: Option<&DatabaseUrl>) -> WorkflowConfig {
    let database = args
        .database
        .clone()
        .or_else(|| url.and_then(DatabaseUrl::database))
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

    let mut config = WorkflowConfig::new(database).with_readiness(PollPolicy {
        max_attempts: args.readiness_attempts,
        ..PollPolicy::default()
    });

    let variants: Vec<String> = args
        .variants
        .iter()
        .map(|variant| variant.trim().to_string())
        .filter(|variant| !variant.is_empty())
        .collect();
    if !variants.is_empty() {
        config = config.with_variants(variants);
    }

    if let Some(url) = url {
        tracing::debug!(url = %url, "using connection string");
        config = config.with_connection(url.connection_params());
    }

    config
}
