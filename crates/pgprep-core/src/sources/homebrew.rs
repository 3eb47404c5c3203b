use std::future::Future;
use std::path::PathBuf;

use serde::Deserialize;

use crate::models::{CoreError, CoreErrorKind, ServiceState, StageAction};
use crate::sources::SourceResult;

/// The package-manager surface the prober and service controller rely on.
pub trait HomebrewSource: Send + Sync {
    /// `Some(versions line)` when the formula is installed, `None` otherwise.
    fn installed_versions(
        &self,
        formula: &str,
    ) -> impl Future<Output = SourceResult<Option<String>>> + Send;

    fn formula_prefix(&self, formula: &str) -> impl Future<Output = SourceResult<PathBuf>> + Send;

    /// Raw `brew services list --json` output.
    fn list_services(&self) -> impl Future<Output = SourceResult<String>> + Send;

    fn start_service(&self, formula: &str) -> impl Future<Output = SourceResult<()>> + Send;

    fn stop_service(&self, formula: &str) -> impl Future<Output = SourceResult<()>> + Send;
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl ServiceEntry {
    pub fn state(&self) -> ServiceState {
        match self.status.as_deref().map(str::trim) {
            Some("started") => ServiceState::Running,
            Some("stopped" | "none") | None => ServiceState::Stopped,
            Some(other) => ServiceState::Other(other.to_string()),
        }
    }
}

pub fn parse_service_list(output: &str) -> SourceResult<Vec<ServiceEntry>> {
    let trimmed = output.trim();
    // Homebrew prints nothing at all when no formula defines a service.
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(trimmed).map_err(|error| {
        CoreError::for_action(
            StageAction::ListServices,
            CoreErrorKind::ParseFailure,
            format!("unable to parse brew services JSON: {error}"),
        )
    })
}

/// State of `formula` in the registry; formulae without an entry count as stopped.
pub fn service_state(entries: &[ServiceEntry], formula: &str) -> ServiceState {
    entries
        .iter()
        .find(|entry| entry.name == formula)
        .map(ServiceEntry::state)
        .unwrap_or(ServiceState::Stopped)
}

#[cfg(test)]
mod tests {
    use super::{parse_service_list, service_state};
    use crate::models::{CoreErrorKind, ServiceState};

    const SERVICES_FIXTURE: &str = r#"[
      {"name":"postgresql@14","status":"started","user":"dev","file":"/Users/dev/Library/LaunchAgents/homebrew.mxcl.postgresql@14.plist","exit_code":0},
      {"name":"postgresql@16","status":"none","user":null,"file":"/opt/homebrew/opt/postgresql@16/homebrew.mxcl.postgresql@16.plist","exit_code":null},
      {"name":"redis","status":"error","user":"dev","file":"/Users/dev/Library/LaunchAgents/homebrew.mxcl.redis.plist","exit_code":78}
    ]"#;

    #[test]
    fn parses_registry_fixture() {
        let entries = parse_service_list(SERVICES_FIXTURE).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "postgresql@14");
        assert_eq!(entries[1].status.as_deref(), Some("none"));
    }

    #[test]
    fn matches_service_by_exact_name() {
        let entries = parse_service_list(SERVICES_FIXTURE).unwrap();
        assert_eq!(service_state(&entries, "postgresql@14"), ServiceState::Running);
        assert_eq!(service_state(&entries, "postgresql@16"), ServiceState::Stopped);
        assert_eq!(
            service_state(&entries, "redis"),
            ServiceState::Other("error".to_string())
        );
        assert_eq!(service_state(&entries, "postgresql"), ServiceState::Stopped);
    }

    #[test]
    fn empty_registry_output_has_no_entries() {
        assert!(parse_service_list("\n").unwrap().is_empty());
    }

    #[test]
    fn malformed_registry_output_is_parse_failure() {
        let error = parse_service_list("Name Status User File").unwrap_err();
        assert_eq!(error.kind, CoreErrorKind::ParseFailure);
    }
}
