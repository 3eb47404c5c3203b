use std::future::Future;

use crate::models::{ConnectionParams, ResolvedInstallation};
use crate::sources::SourceResult;

pub const READINESS_PROBE: &str = "pg_isready";
pub const MAINTENANCE_DATABASE: &str = "postgres";

/// The database CLI surface used by the service controller, provisioner and verifier.
pub trait PostgresSource: Send + Sync {
    fn has_readiness_probe(&self, installation: &ResolvedInstallation) -> bool;

    /// `true` when the server accepts connections.
    fn readiness_probe(
        &self,
        installation: &ResolvedInstallation,
        connection: &ConnectionParams,
    ) -> impl Future<Output = SourceResult<bool>> + Send;

    /// Raw unaligned `psql -l` output.
    fn list_databases(
        &self,
        installation: &ResolvedInstallation,
        connection: &ConnectionParams,
    ) -> impl Future<Output = SourceResult<String>> + Send;

    fn create_database(
        &self,
        installation: &ResolvedInstallation,
        connection: &ConnectionParams,
        name: &str,
    ) -> impl Future<Output = SourceResult<()>> + Send;

    fn drop_database(
        &self,
        installation: &ResolvedInstallation,
        connection: &ConnectionParams,
        name: &str,
    ) -> impl Future<Output = SourceResult<()>> + Send;

    /// Runs `sql` against `database` and returns tuples-only output.
    fn execute_query(
        &self,
        installation: &ResolvedInstallation,
        connection: &ConnectionParams,
        database: &str,
        sql: &str,
    ) -> impl Future<Output = SourceResult<String>> + Send;
}

/// Extracts database names from `psql -l -t -A -F '|'` output.
///
/// Multi-line access-privilege cells continue on lines without a field
/// separator; those lines are skipped.
pub fn parse_database_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_once('|'))
        .map(|(name, _)| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}
