use std::sync::Arc;
use std::time::Duration;

use crate::execution::{
    CommandSpec, ProcessExecutor, ProcessSpawnRequest, run_and_collect_stdout, run_to_completion,
};
use crate::models::{ConnectionParams, ResolvedInstallation, StageAction};
use crate::sources::SourceResult;
use crate::sources::postgres::{MAINTENANCE_DATABASE, PostgresSource, READINESS_PROBE};

const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);
const READINESS_TIMEOUT_SECS: u64 = 3;

pub struct ProcessPostgresSource {
    executor: Arc<dyn ProcessExecutor>,
}

impl ProcessPostgresSource {
    pub fn new(executor: Arc<dyn ProcessExecutor>) -> Self {
        Self { executor }
    }
}

impl PostgresSource for ProcessPostgresSource {
    fn has_readiness_probe(&self, installation: &ResolvedInstallation) -> bool {
        installation.tool(READINESS_PROBE).is_file()
    }

    async fn readiness_probe(
        &self,
        installation: &ResolvedInstallation,
        connection: &ConnectionParams,
    ) -> SourceResult<bool> {
        let command = with_connection(
            CommandSpec::new(installation.tool(READINESS_PROBE))
                .args(["-q", "-t", READINESS_TIMEOUT_SECS.to_string().as_str()]),
            connection,
        );
        let request = ProcessSpawnRequest::new(StageAction::ReadinessProbe, command)
            .timeout(Duration::from_secs(READINESS_TIMEOUT_SECS + 2));

        // pg_isready exits 1 while the server rejects connections during startup
        // and 2 when nothing answers; both mean "not ready yet".
        let output = run_to_completion(self.executor.as_ref(), request).await?;
        Ok(output.success())
    }

    async fn list_databases(
        &self,
        installation: &ResolvedInstallation,
        connection: &ConnectionParams,
    ) -> SourceResult<String> {
        let command = with_connection(
            CommandSpec::new(installation.tool("psql"))
                .args(["-X", "-w", "-l", "-q", "-t", "-A", "-F", "|"])
                .args(["-d", MAINTENANCE_DATABASE]),
            connection,
        );
        let request = ProcessSpawnRequest::new(StageAction::ListDatabases, command)
            .timeout(CLIENT_TIMEOUT);
        run_and_collect_stdout(self.executor.as_ref(), request).await
    }

    async fn create_database(
        &self,
        installation: &ResolvedInstallation,
        connection: &ConnectionParams,
        name: &str,
    ) -> SourceResult<()> {
        let command = with_connection(
            CommandSpec::new(installation.tool("createdb")).arg("-w"),
            connection,
        )
        .arg(name);
        let request = ProcessSpawnRequest::new(StageAction::CreateDatabase, command)
            .timeout(CLIENT_TIMEOUT);
        run_and_collect_stdout(self.executor.as_ref(), request)
            .await
            .map(|_| ())
    }

    async fn drop_database(
        &self,
        installation: &ResolvedInstallation,
        connection: &ConnectionParams,
        name: &str,
    ) -> SourceResult<()> {
        let command = with_connection(
            CommandSpec::new(installation.tool("dropdb")).arg("-w"),
            connection,
        )
        .arg(name);
        let request = ProcessSpawnRequest::new(StageAction::DropDatabase, command)
            .timeout(CLIENT_TIMEOUT);
        run_and_collect_stdout(self.executor.as_ref(), request)
            .await
            .map(|_| ())
    }

    async fn execute_query(
        &self,
        installation: &ResolvedInstallation,
        connection: &ConnectionParams,
        database: &str,
        sql: &str,
    ) -> SourceResult<String> {
        let command = with_connection(
            CommandSpec::new(installation.tool("psql"))
                .args(["-X", "-w", "-q", "-t", "-A", "-v", "ON_ERROR_STOP=1"])
                .args(["-d", database, "-c", sql]),
            connection,
        );
        let request =
            ProcessSpawnRequest::new(StageAction::ExecuteQuery, command).timeout(CLIENT_TIMEOUT);
        run_and_collect_stdout(self.executor.as_ref(), request).await
    }
}

fn with_connection(mut command: CommandSpec, connection: &ConnectionParams) -> CommandSpec {
    if let Some(host) = &connection.host {
        command = command.args(["-h", host.as_str()]);
    }
    if let Some(port) = connection.port {
        command = command.args(["-p".to_string(), port.to_string()]);
    }
    if let Some(user) = &connection.user {
        command = command.args(["-U", user.as_str()]);
    }
    if let Some(password) = &connection.password {
        command = command.env("PGPASSWORD", password.as_str());
    }
    command
}
