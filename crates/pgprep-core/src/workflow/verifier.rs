use crate::models::{ConnectionParams, ResolvedInstallation, VerificationOutcome, WorkflowWarning};
use crate::sources::PostgresSource;

const PROBE_QUERY: &str = "SELECT 1";

pub struct ConnectionVerifier<'a, P: PostgresSource> {
    postgres: &'a P,
    installation: &'a ResolvedInstallation,
    connection: &'a ConnectionParams,
}

impl<'a, P: PostgresSource> ConnectionVerifier<'a, P> {
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

    /// Advisory only: a failed query becomes a warning, never an error.
    pub async fn verify(
        &self,
        database: &str,
        warnings: &mut Vec<WorkflowWarning>,
    ) -> VerificationOutcome {
        let result = self
            .postgres
            .execute_query(self.installation, self.connection, database, PROBE_QUERY)
            .await;

        let outcome = match result {
            Ok(output) if output.trim() == "1" => VerificationOutcome::Verified,
            Ok(output) => VerificationOutcome::Unreachable {
                detail: format!("unexpected query output {:?}", output.trim()),
            },
            Err(error) => VerificationOutcome::Unreachable {
                detail: error.message,
            },
        };

        match &outcome {
            VerificationOutcome::Verified => {
                tracing::info!(database, "connection verified");
            }
            VerificationOutcome::Unreachable { detail } => {
                let warning = WorkflowWarning::Connection {
                    database: database.to_string(),
                    detail: detail.clone(),
                };
                tracing::warn!("{warning}");
                warnings.push(warning);
            }
        }

        outcome
    }
}
