use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Probe,
    Service,
    Provision,
    Verify,
    Bootstrap,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageAction {
    ProbeInstalled,
    ResolvePrefix,
    ListServices,
    StartService,
    StopService,
    ReadinessProbe,
    ListDatabases,
    CreateDatabase,
    DropDatabase,
    ExecuteQuery,
    ActivateEnvironment,
    InstallDependencies,
    LoadConfiguration,
    RunVerification,
}

impl StageAction {
    pub fn stage(self) -> Stage {
        match self {
            Self::ProbeInstalled | Self::ResolvePrefix => Stage::Probe,
            Self::ListServices | Self::StartService | Self::StopService | Self::ReadinessProbe => {
                Stage::Service
            }
            Self::ListDatabases | Self::CreateDatabase | Self::DropDatabase => Stage::Provision,
            Self::ExecuteQuery => Stage::Verify,
            Self::ActivateEnvironment
            | Self::InstallDependencies
            | Self::LoadConfiguration
            | Self::RunVerification => Stage::Bootstrap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Stage, StageAction};

    #[test]
    fn actions_map_to_owning_stage() {
        assert_eq!(StageAction::ProbeInstalled.stage(), Stage::Probe);
        assert_eq!(StageAction::ReadinessProbe.stage(), Stage::Service);
        assert_eq!(StageAction::DropDatabase.stage(), Stage::Provision);
        assert_eq!(StageAction::ExecuteQuery.stage(), Stage::Verify);
        assert_eq!(StageAction::RunVerification.stage(), Stage::Bootstrap);
    }
}
