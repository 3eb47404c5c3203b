use std::path::Path;

use pgprep_core::models::{
    CoreError, CoreErrorKind, DropOutcome, ProvisionOutcome, Readiness, ResolvedInstallation,
    ServiceOutcome, ServiceState, Stage, StopOutcome, VerificationOutcome, WorkflowWarning,
};
use pgprep_core::persistence::env_file::DatabaseSwitch;
use pgprep_core::workflow::{BootstrapReport, PrepareReport, StatusReport, TeardownReport};
use serde::Serialize;

#[derive(Serialize)]
struct SwitchSummary<'a> {
    env_file: &'a Path,
    key: &'a str,
    previous: String,
    current: String,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CoreError> {
    let rendered = serde_json::to_string_pretty(value).map_err(|error| {
        CoreError::new(
            CoreErrorKind::Internal,
            format!("failed to serialize report: {error}"),
        )
    })?;
    println!("{rendered}");
    Ok(())
}

pub fn prepare(report: &PrepareReport, json: bool) -> Result<(), CoreError> {
    if json {
        return print_json(report);
    }
    print_installation(&report.installation);
    println!("service       {}", describe_service(&report.service));
    if let Some(dropped) = report.dropped {
        println!("reset         {}", describe_drop(dropped, &report.database));
    }
    println!(
        "database      {} {}",
        report.database,
        match report.provision {
            ProvisionOutcome::AlreadyExists => "already exists",
            ProvisionOutcome::Created => "created",
        }
    );
    match &report.verification {
        VerificationOutcome::Verified => println!("verification  SELECT 1 succeeded"),
        VerificationOutcome::Unreachable { .. } => println!("verification  failed"),
    }
    print_warnings(&report.warnings);
    Ok(())
}

pub fn teardown(report: &TeardownReport, json: bool) -> Result<(), CoreError> {
    if json {
        return print_json(report);
    }
    print_installation(&report.installation);
    if let Some(dropped) = report.dropped {
        println!("database      {}", describe_drop(dropped, &report.database));
    }
    let service = match &report.service {
        StopOutcome::NotRunning => "not running".to_string(),
        StopOutcome::Stopped => "stopped".to_string(),
        StopOutcome::Unconfirmed { detail } => format!("stop not confirmed ({detail})"),
    };
    println!("service       {service}");
    print_warnings(&report.warnings);
    Ok(())
}

pub fn status(report: &StatusReport, json: bool) -> Result<(), CoreError> {
    if json {
        return print_json(report);
    }
    print_installation(&report.installation);
    let service = match &report.service {
        ServiceState::Running => "running",
        ServiceState::Stopped => "stopped",
        ServiceState::Other(status) => status.as_str(),
    };
    println!("service       {service}");
    let database = match report.database_exists {
        Some(true) => "present",
        Some(false) => "absent",
        None => "unknown (service not running)",
    };
    println!("database      {} {database}", report.database);
    Ok(())
}

pub fn bootstrap(report: &BootstrapReport, json: bool) -> Result<(), CoreError> {
    if json {
        return print_json(report);
    }
    println!("environment   {}", report.environment.display());
    if !report.configuration_loaded {
        println!("configuration not loaded");
    }
    prepare(&report.prepare, false)?;
    print_warnings(&report.warnings);
    println!("bootstrap complete");
    Ok(())
}

pub fn database_switch(
    switch: &DatabaseSwitch,
    env_file: &Path,
    json: bool,
) -> Result<(), CoreError> {
    let summary = SwitchSummary {
        env_file,
        key: switch.key,
        previous: switch.previous.redacted(),
        current: switch.current.redacted(),
    };
    if json {
        return print_json(&summary);
    }
    println!("{} in {}", summary.key, env_file.display());
    println!("  from {}", summary.previous);
    println!("  to   {}", summary.current);
    Ok(())
}

pub fn error(error: &CoreError) {
    match error.stage {
        Some(stage) => eprintln!("error ({}): {}", stage_label(stage), error.message),
        None => eprintln!("error: {}", error.message),
    }
    if let Some(hint) = &error.hint {
        eprintln!("hint: {hint}");
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Probe => "installation",
        Stage::Service => "service",
        Stage::Provision => "database",
        Stage::Verify => "verification",
        Stage::Bootstrap => "bootstrap",
    }
}

fn print_installation(installation: &ResolvedInstallation) {
    match &installation.version {
        Some(version) => println!(
            "installation  {} {version} ({})",
            installation.variant,
            installation.prefix.display()
        ),
        None => println!(
            "installation  {} ({})",
            installation.variant,
            installation.prefix.display()
        ),
    }
}

fn describe_service(outcome: &ServiceOutcome) -> String {
    match outcome {
        ServiceOutcome::AlreadyRunning => "already running".to_string(),
        ServiceOutcome::Started { readiness } => match readiness {
            Readiness::Ready { attempts } => {
                format!("started, accepting connections after {attempts} check(s)")
            }
            Readiness::RegistryConfirmed { attempts } => {
                format!("started, confirmed by service registry after {attempts} check(s)")
            }
            Readiness::StillInitializing { attempts } => {
                format!("started, not ready after {attempts} check(s)")
            }
        },
    }
}

fn describe_drop(outcome: DropOutcome, database: &str) -> String {
    match outcome {
        DropOutcome::Absent => format!("{database} absent, nothing dropped"),
        DropOutcome::Dropped => format!("{database} dropped"),
    }
}

fn print_warnings(warnings: &[WorkflowWarning]) {
    for warning in warnings {
        println!("warning       {warning}");
    }
}
