//! Explicit configuration handed to every workflow stage.

use std::path::PathBuf;
use std::time::Duration;

use crate::models::{ConnectionParams, CoreError, CoreErrorKind};
use crate::workflow::poll::PollPolicy;

/// Newest first; the unversioned formula is the last resort.
pub const DEFAULT_VARIANTS: &[&str] = &[
    "postgresql@17",
    "postgresql@16",
    "postgresql@15",
    "postgresql@14",
    "postgresql",
];

pub const DEFAULT_DATABASE: &str = "hrvibe_test";

pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(2);

/// Postgres truncates identifiers longer than this.
const MAX_DATABASE_NAME_BYTES: usize = 63;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkflowConfig {
    pub variants: Vec<String>,
    pub database: String,
    pub connection: ConnectionParams,
    pub readiness: PollPolicy,
    pub stop_grace: Duration,
}

impl WorkflowConfig {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            variants: DEFAULT_VARIANTS.iter().map(|v| (*v).to_string()).collect(),
            database: database.into(),
            connection: ConnectionParams::default(),
            readiness: PollPolicy::default(),
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    pub fn with_variants(mut self, variants: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.variants = variants.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_connection(mut self, connection: ConnectionParams) -> Self {
        self.connection = connection;
        self
    }

    pub fn with_readiness(mut self, readiness: PollPolicy) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn with_stop_grace(mut self, stop_grace: Duration) -> Self {
        self.stop_grace = stop_grace;
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.variants.is_empty() {
            return Err(invalid("at least one package variant must be configured"));
        }
        if self
            .variants
            .iter()
            .any(|variant| variant.trim().is_empty() || variant.starts_with('-'))
        {
            return Err(invalid("package variants must be non-empty formula names"));
        }
        validate_database_name(&self.database)?;
        self.readiness.validate()
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE)
    }
}

pub fn validate_database_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(invalid("database name must not be empty"));
    }
    if name.contains('\0') {
        return Err(invalid("database name must not contain NUL bytes"));
    }
    if name.starts_with('-') {
        return Err(invalid(&format!(
            "database name '{name}' would be read as a command-line option"
        )));
    }
    if name.len() > MAX_DATABASE_NAME_BYTES {
        return Err(invalid(&format!(
            "database name must be at most {MAX_DATABASE_NAME_BYTES} bytes"
        )));
    }
    Ok(())
}

/// Paths used by the environment bootstrap workflow, relative to the project root.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BootstrapConfig {
    pub project_root: PathBuf,
    pub venv_dir: PathBuf,
    pub requirements: PathBuf,
    pub env_file: PathBuf,
    pub verify_script: PathBuf,
}

impl BootstrapConfig {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            venv_dir: PathBuf::from(".venv"),
            requirements: PathBuf::from("requirements.txt"),
            env_file: PathBuf::from(".env"),
            verify_script: PathBuf::from("local_db/test_database.py"),
        }
    }

    pub fn resolve(&self, path: &std::path::Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

fn invalid(message: &str) -> CoreError {
    CoreError::new(CoreErrorKind::InvalidInput, message)
}
