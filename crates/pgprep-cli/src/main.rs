mod cli;
mod config;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use pgprep_core::config::BootstrapConfig;
use pgprep_core::execution::{ProcessExecutor, TokioProcessExecutor};
use pgprep_core::models::CoreError;
use pgprep_core::persistence::env_file;
use pgprep_core::workflow::Bootstrapper;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report::error(&error);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_directives = match verbose {
        0 => "pgprep=info,pgprep_core=info",
        1 => "pgprep=debug,pgprep_core=debug",
        _ => "pgprep=trace,pgprep_core=trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CoreError> {
    let executor: Arc<dyn ProcessExecutor> = Arc::new(TokioProcessExecutor);

    match cli.command {
        Command::Prepare => {
            config::load_env_file(&cli.env_file)?;
            let workflow = config::build_workflow(executor, &cli.workflow)?;
            report::prepare(&workflow.prepare().await?, cli.json)
        }
        Command::Reset => {
            config::load_env_file(&cli.env_file)?;
            let workflow = config::build_workflow(executor, &cli.workflow)?;
            report::prepare(&workflow.reset().await?, cli.json)
        }
        Command::Teardown { drop_database } => {
            config::load_env_file(&cli.env_file)?;
            let workflow = config::build_workflow(executor, &cli.workflow)?;
            report::teardown(&workflow.teardown(drop_database).await?, cli.json)
        }
        Command::Status => {
            config::load_env_file(&cli.env_file)?;
            let workflow = config::build_workflow(executor, &cli.workflow)?;
            report::status(&workflow.status().await?, cli.json)
        }
        Command::Bootstrap(args) => {
            let bootstrap = BootstrapConfig {
                project_root: PathBuf::from("."),
                venv_dir: args.venv,
                requirements: args.requirements,
                env_file: cli.env_file,
                verify_script: args.verify_script,
            };
            let report = Bootstrapper::new(executor.as_ref(), &bootstrap)
                .run(|| config::build_workflow(executor.clone(), &cli.workflow))
                .await?;
            report::bootstrap(&report, cli.json)
        }
        Command::UseDatabase { name } => {
            let switch = env_file::switch_database(&cli.env_file, &name)?;
            report::database_switch(&switch, &cli.env_file, cli.json)
        }
    }
}
