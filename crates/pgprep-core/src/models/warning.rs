use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use serde::Serialize;

/// Conditions that are reported to the operator but never halt a workflow.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowWarning {
    ServiceStop { variant: String, detail: String },
    ReadinessPending { variant: String, attempts: u32 },
    Connection { database: String, detail: String },
    DropSkipped { database: String, detail: String },
    ConfigFileMissing { path: PathBuf },
}

impl Display for WorkflowWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceStop { variant, detail } => {
                write!(f, "could not confirm that {variant} stopped: {detail}")
            }
            Self::ReadinessPending { variant, attempts } => write!(
                f,
                "{variant} did not report ready after {attempts} attempts; it may still be initializing"
            ),
            Self::Connection { database, detail } => {
                write!(f, "verification query against {database} failed: {detail}")
            }
            Self::DropSkipped { database, detail } => {
                write!(f, "database {database} was not dropped: {detail}")
            }
            Self::ConfigFileMissing { path } => {
                write!(f, "configuration file {} not found", path.display())
            }
        }
    }
}
