pub mod homebrew;
pub mod homebrew_process;
pub mod postgres;
pub mod postgres_process;

pub use homebrew::{HomebrewSource, ServiceEntry, parse_service_list, service_state};
pub use homebrew_process::ProcessHomebrewSource;
pub use postgres::{PostgresSource, parse_database_list};
pub use postgres_process::ProcessPostgresSource;

pub type SourceResult<T> = Result<T, crate::models::CoreError>;
