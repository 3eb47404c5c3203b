pub mod connection;
pub mod error;
pub mod installation;
pub mod outcome;
pub mod stage;
pub mod warning;

pub use connection::{ConnectionParams, DatabaseUrl};
pub use error::{CoreError, CoreErrorKind};
pub use installation::ResolvedInstallation;
pub use outcome::{
    DropOutcome, ProvisionOutcome, Readiness, ServiceOutcome, ServiceState, StopOutcome,
    VerificationOutcome,
};
pub use stage::{Stage, StageAction};
pub use warning::WorkflowWarning;
