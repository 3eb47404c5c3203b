mod common;

use common::{FakeHost, config};
use pgprep_core::models::{DropOutcome, StopOutcome, WorkflowWarning};

const VARIANTS: &[&str] = &["pg@15", "pg@14", "pg"];

#[tokio::test]
async fn stops_running_service() {
    let host = FakeHost::new();
    host.install("pg@14", "14.10", true);
    host.state().running.insert("pg@14".to_string());

    let report = host
        .workflow(config("hrbive_test", VARIANTS))
        .teardown(false)
        .await
        .unwrap();

    assert_eq!(report.service, StopOutcome::Stopped);
    assert_eq!(report.dropped, None);
    assert!(report.warnings.is_empty());
    assert!(!host.state().running.contains("pg@14"));
}

#[tokio::test]
async fn stopped_service_is_left_alone() {
    let host = FakeHost::new();
    host.install("pg@14", "14.10", true);

    let report = host
        .workflow(config("hrbive_test", VARIANTS))
        .teardown(false)
        .await
        .unwrap();

    assert_eq!(report.service, StopOutcome::NotRunning);
    assert_eq!(host.count("brew", &["services", "stop"]), 0);
}

#[tokio::test]
async fn unconfirmed_stop_is_a_warning() {
    let host = FakeHost::new();
    host.install("pg@14", "14.10", true);
    host.state().running.insert("pg@14".to_string());
    host.state().stop_takes_effect = false;

    let report = host
        .workflow(config("hrbive_test", VARIANTS))
        .teardown(false)
        .await
        .expect("unconfirmed stop is not fatal");

    assert!(matches!(report.service, StopOutcome::Unconfirmed { .. }));
    assert!(matches!(
        report.warnings.as_slice(),
        [WorkflowWarning::ServiceStop { variant, .. }] if variant == "pg@14"
    ));
}

#[tokio::test]
async fn drop_database_runs_before_stop() {
    let host = FakeHost::new();
    host.install("pg@14", "14.10", true);
    host.state().running.insert("pg@14".to_string());
    host.state().databases.insert("hrbive_test".to_string());

    let report = host
        .workflow(config("hrbive_test", VARIANTS))
        .teardown(true)
        .await
        .unwrap();

    assert_eq!(report.dropped, Some(DropOutcome::Dropped));
    assert_eq!(report.service, StopOutcome::Stopped);
    assert!(!host.databases().contains("hrbive_test"));

    let order: Vec<String> = host
        .commands()
        .into_iter()
        .filter(|command| {
            command.starts_with("dropdb", &[]) || command.starts_with("brew", &["services", "stop"])
        })
        .map(|command| command.program)
        .collect();
    assert_eq!(order, vec!["dropdb", "brew"]);
}

#[tokio::test]
async fn drop_is_skipped_when_service_is_down() {
    let host = FakeHost::new();
    host.install("pg@14", "14.10", true);

    let report = host
        .workflow(config("hrbive_test", VARIANTS))
        .teardown(true)
        .await
        .unwrap();

    assert_eq!(report.dropped, None);
    assert_eq!(report.service, StopOutcome::NotRunning);
    assert!(matches!(
        report.warnings.as_slice(),
        [WorkflowWarning::DropSkipped { .. }]
    ));
    assert_eq!(host.count("dropdb", &[]), 0);
}

#[tokio::test]
async fn dropping_absent_database_is_not_an_error() {
    let host = FakeHost::new();
    host.install("pg@14", "14.10", true);
    host.state().running.insert("pg@14".to_string());

    let report = host
        .workflow(config("hrbive_test", VARIANTS))
        .teardown(true)
        .await
        .unwrap();

    assert_eq!(report.dropped, Some(DropOutcome::Absent));
    assert_eq!(host.count("dropdb", &[]), 0);
}
