use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pgprep")]
#[command(version)]
#[command(
    about = "Prepares a Homebrew-managed PostgreSQL server and database for local development",
    long_about = None
)]
pub struct Cli {
    /// Key/value configuration file holding DATABASE_URL
    #[arg(long, global = true, env = "PGPREP_ENV_FILE", default_value = ".env")]
    pub env_file: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Print the workflow report as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub workflow: WorkflowArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct WorkflowArgs {
    /// Target database (default: the database named in DATABASE_URL, else hrvibe_test)
    #[arg(long, global = true, env = "PGPREP_DATABASE")]
    pub database: Option<String>,

    /// Acceptable formulae, newest first, comma separated
    #[arg(long, global = true, env = "PGPREP_VARIANTS", value_delimiter = ',')]
    pub variants: Vec<String>,

    /// Homebrew executable
    #[arg(long, global = true, env = "PGPREP_BREW", default_value = "brew")]
    pub brew: PathBuf,

    /// Readiness checks after starting the service, one second apart
    #[arg(
        long,
        global = true,
        env = "PGPREP_READINESS_ATTEMPTS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..=300)
    )]
    pub readiness_attempts: u32,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Probe the installation, start the service, create the database and verify it
    Prepare,
    /// Stop the service
    Teardown {
        /// Drop the target database before stopping
        #[arg(long)]
        drop_database: bool,
    },
    /// Drop and recreate the target database
    Reset,
    /// Prepare the Python environment and the database, then run the verification script
    Bootstrap(BootstrapArgs),
    /// Report installation, service and database state without changing anything
    Status,
    /// Point DATABASE_URL in the configuration file at another database
    UseDatabase {
        /// Database name to switch to
        name: String,
    },
}

#[derive(Args, Debug)]
pub struct BootstrapArgs {
    /// Virtual environment directory
    #[arg(long, default_value = ".venv")]
    pub venv: PathBuf,

    /// Dependency manifest installed with pip
    #[arg(long, default_value = "requirements.txt")]
    pub requirements: PathBuf,

    /// Script run with the environment's interpreter once the database is ready
    #[arg(long, default_value = "local_db/test_database.py")]
    pub verify_script: PathBuf,
}
