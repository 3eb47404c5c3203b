use serde::Serialize;

/// Registry state of a service at the time it was queried.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Running,
    Stopped,
    Other(String),
}

impl ServiceState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ServiceOutcome {
    AlreadyRunning,
    Started { readiness: Readiness },
}

/// Terminal state of the readiness poll after a start command.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Readiness {
    /// `pg_isready` accepted a connection.
    Ready { attempts: u32 },
    /// No readiness probe is installed; the service registry reports the service as started.
    RegistryConfirmed { attempts: u32 },
    /// `pg_isready` never succeeded within the attempt budget.
    StillInitializing { attempts: u32 },
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StopOutcome {
    NotRunning,
    Stopped,
    Unconfirmed { detail: String },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionOutcome {
    AlreadyExists,
    Created,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropOutcome {
    Absent,
    Dropped,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Verified,
    Unreachable { detail: String },
}
