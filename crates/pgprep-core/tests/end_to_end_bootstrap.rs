mod common;

use std::fs;

use common::{FakeHost, config};
use pgprep_core::config::BootstrapConfig;
use pgprep_core::models::{CoreErrorKind, ProvisionOutcome, Stage, WorkflowWarning};
use pgprep_core::workflow::Bootstrapper;

const VARIANTS: &[&str] = &["pg@15", "pg@14", "pg"];

fn project(host: &FakeHost, env_contents: Option<&str>) -> BootstrapConfig {
    let root = host.root();
    fs::create_dir_all(root.join(".venv/bin")).unwrap();
    fs::write(root.join(".venv/bin/python"), "#!/bin/sh\n").unwrap();
    fs::write(root.join("requirements.txt"), "psycopg2-binary\npython-dotenv\n").unwrap();
    fs::create_dir_all(root.join("local_db")).unwrap();
    fs::write(root.join("local_db/test_database.py"), "print('ok')\n").unwrap();
    if let Some(contents) = env_contents {
        fs::write(root.join(".env"), contents).unwrap();
    }
    BootstrapConfig::new(root)
}

#[tokio::test]
async fn bootstrap_runs_every_step_in_order() {
    let host = FakeHost::new();
    host.install("pg@14", "14.10", true);
    let bootstrap = project(
        &host,
        Some("PGPREP_BOOTSTRAP_ORDER_MARKER=loaded\n"),
    );

    let report = Bootstrapper::new(&host, &bootstrap)
        .run(|| Ok(host.workflow(config("hrbive_test", VARIANTS))))
        .await
        .expect("bootstrap should succeed");

    assert!(report.configuration_loaded);
    assert!(report.warnings.is_empty());
    assert_eq!(report.environment, host.root().join(".venv"));
    assert_eq!(report.prepare.provision, ProvisionOutcome::Created);
    assert_eq!(
        std::env::var("PGPREP_BOOTSTRAP_ORDER_MARKER").as_deref(),
        Ok("loaded")
    );

    let commands = host.commands();
    let pip = commands
        .iter()
        .position(|command| command.starts_with("python", &["-m", "pip", "install", "-r"]))
        .expect("pip install issued");
    let createdb = commands
        .iter()
        .position(|command| command.program == "createdb")
        .expect("createdb issued");
    let verify = commands
        .iter()
        .rposition(|command| command.program == "python")
        .expect("verification issued");
    assert!(pip < createdb && createdb < verify);

    let verify_command = &commands[verify];
    assert!(verify_command.args[0].ends_with("local_db/test_database.py"));
    let venv = host.root().join(".venv").to_string_lossy().into_owned();
    assert_eq!(verify_command.env.get("VIRTUAL_ENV"), Some(&venv));
    let path = verify_command.env.get("PATH").expect("PATH set");
    assert!(path.starts_with(&format!("{venv}/bin")), "{path}");
}

#[tokio::test]
async fn missing_virtualenv_is_fatal_before_any_command() {
    let host = FakeHost::new();
    host.install("pg@14", "14.10", true);
    let bootstrap = BootstrapConfig::new(host.root());

    let error = Bootstrapper::new(&host, &bootstrap)
        .run(|| Ok(host.workflow(config("hrbive_test", VARIANTS))))
        .await
        .expect_err("no virtualenv");

    assert_eq!(error.kind, CoreErrorKind::EnvironmentMissing);
    assert_eq!(error.stage, Some(Stage::Bootstrap));
    assert_eq!(error.hint.as_deref(), Some("python3 -m venv .venv"));
    assert!(host.commands().is_empty());
}

#[tokio::test]
async fn failed_dependency_install_halts_before_database_work() {
    let host = FakeHost::new();
    host.install("pg@14", "14.10", true);
    host.state().pip_succeeds = false;
    let bootstrap = project(&host, None);

    let error = Bootstrapper::new(&host, &bootstrap)
        .run(|| Ok(host.workflow(config("hrbive_test", VARIANTS))))
        .await
        .expect_err("pip failure is fatal");

    assert_eq!(error.kind, CoreErrorKind::ProcessFailure);
    assert!(error.message.contains("No matching distribution"), "{}", error.message);
    assert_eq!(host.count("brew", &[]), 0);
}

#[tokio::test]
async fn missing_manifest_is_a_configuration_error() {
    let host = FakeHost::new();
    let bootstrap = project(&host, None);
    fs::remove_file(host.root().join("requirements.txt")).unwrap();

    let error = Bootstrapper::new(&host, &bootstrap)
        .run(|| Ok(host.workflow(config("hrbive_test", VARIANTS))))
        .await
        .unwrap_err();

    assert_eq!(error.kind, CoreErrorKind::Configuration);
    assert!(host.commands().is_empty());
}

#[tokio::test]
async fn missing_env_file_is_only_a_warning() {
    let host = FakeHost::new();
    host.install("pg@14", "14.10", true);
    let bootstrap = project(&host, None);

    let report = Bootstrapper::new(&host, &bootstrap)
        .run(|| Ok(host.workflow(config("hrbive_test", VARIANTS))))
        .await
        .expect("missing .env is not fatal");

    assert!(!report.configuration_loaded);
    assert_eq!(
        report.warnings,
        vec![WorkflowWarning::ConfigFileMissing {
            path: host.root().join(".env")
        }]
    );
}

#[tokio::test]
async fn failing_verification_script_is_fatal() {
    let host = FakeHost::new();
    host.install("pg@14", "14.10", true);
    host.state().verify_succeeds = false;
    let bootstrap = project(&host, None);

    let error = Bootstrapper::new(&host, &bootstrap)
        .run(|| Ok(host.workflow(config("hrbive_test", VARIANTS))))
        .await
        .expect_err("verification failure is fatal");

    assert_eq!(error.kind, CoreErrorKind::ProcessFailure);
    assert_eq!(error.stage, Some(Stage::Bootstrap));
    assert!(host.databases().contains("hrbive_test"));
}
