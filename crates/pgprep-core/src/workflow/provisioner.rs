use crate::config::validate_database_name;
use crate::models::{
    ConnectionParams, CoreError, CoreErrorKind, DropOutcome, ProvisionOutcome,
    ResolvedInstallation, StageAction,
};
use crate::sources::{PostgresSource, parse_database_list};

pub struct DatabaseProvisioner<'a, P: PostgresSource> {
    postgres: &'a P,
    installation: &'a ResolvedInstallation,
    connection: &'a ConnectionParams,
}

impl<'a, P: PostgresSource> DatabaseProvisioner<'a, P> {
    pub fn new(
        postgres: &'a P,
        installation: &'a ResolvedInstallation,
        connection: &'a ConnectionParams,
    ) -> Self {
        Self {
            postgres,
            installation,
            connection,
        }
    }

    pub async fn list(&self) -> Result<Vec<String>, CoreError> {
        let raw = self
            .postgres
            .list_databases(self.installation, self.connection)
            .await?;
        Ok(parse_database_list(&raw))
    }

    /// Exact, case-sensitive membership test.
    pub async fn exists(&self, name: &str) -> Result<bool, CoreError> {
        Ok(self.list().await?.iter().any(|existing| existing == name))
    }

    /// Creates `name` unless it already exists.
    pub async fn ensure_exists(&self, name: &str) -> Result<ProvisionOutcome, CoreError> {
        validate_database_name(name)?;

        if self.exists(name).await? {
            tracing::info!(database = name, "database already exists");
            return Ok(ProvisionOutcome::AlreadyExists);
        }

        tracing::info!(database = name, "creating database");
        self.postgres
            .create_database(self.installation, self.connection, name)
            .await
            .map_err(|error| {
                provisioning_error(
                    StageAction::CreateDatabase,
                    format!("createdb {name} failed: {}", error.message),
                )
            })?;

        Ok(ProvisionOutcome::Created)
    }

    /// Drops `name` if present.
    pub async fn drop_if_exists(&self, name: &str) -> Result<DropOutcome, CoreError> {
        validate_database_name(name)?;

        if !self.exists(name).await? {
            tracing::info!(database = name, "database absent, nothing to drop");
            return Ok(DropOutcome::Absent);
        }

        tracing::info!(database = name, "dropping database");
        self.postgres
            .drop_database(self.installation, self.connection, name)
            .await
            .map_err(|error| {
                provisioning_error(
                    StageAction::DropDatabase,
                    format!("dropdb {name} failed: {}", error.message),
                )
                .with_hint("close open connections to the database and retry")
            })?;

        Ok(DropOutcome::Dropped)
    }
}

fn provisioning_error(action: StageAction, message: String) -> CoreError {
    CoreError::for_action(action, CoreErrorKind::Provisioning, message)
}
