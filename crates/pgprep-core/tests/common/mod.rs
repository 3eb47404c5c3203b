//! A routing fake executor that emulates Homebrew, the Postgres CLI tools and a
//! virtualenv Python against in-memory state.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use pgprep_core::config::WorkflowConfig;
use pgprep_core::execution::{
    ExecutionResult, ProcessExecutor, ProcessExitStatus, ProcessOutput, ProcessSpawnRequest,
    ProcessWaitFuture, RunningProcess,
};
use pgprep_core::sources::{ProcessHomebrewSource, ProcessPostgresSource};
use pgprep_core::workflow::{PollPolicy, Workflow};
use tempfile::TempDir;

pub struct HostState {
    pub installed: BTreeMap<String, String>,
    pub running: BTreeSet<String>,
    pub start_takes_effect: bool,
    pub start_fails: bool,
    pub stop_takes_effect: bool,
    pub ready: bool,
    pub databases: BTreeSet<String>,
    pub create_fails: bool,
    pub query_succeeds: bool,
    pub pip_succeeds: bool,
    pub verify_succeeds: bool,
    pub commands: Vec<RecordedCommand>,
}

#[derive(Clone, Debug)]
pub struct RecordedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl RecordedCommand {
    pub fn starts_with(&self, program: &str, args: &[&str]) -> bool {
        self.program == program
            && self.args.len() >= args.len()
            && self.args.iter().zip(args).all(|(left, right)| left == right)
    }
}

#[derive(Clone)]
pub struct FakeHost {
    root: Arc<TempDir>,
    state: Arc<Mutex<HostState>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            root: Arc::new(TempDir::new().expect("temp dir")),
            state: Arc::new(Mutex::new(HostState {
                installed: BTreeMap::new(),
                running: BTreeSet::new(),
                start_takes_effect: true,
                start_fails: false,
                stop_takes_effect: true,
                ready: true,
                databases: ["postgres", "template0", "template1"]
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
                create_fails: false,
                query_succeeds: true,
                pip_succeeds: true,
                verify_succeeds: true,
                commands: Vec::new(),
            })),
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().expect("host state lock")
    }

    pub fn prefix(&self, formula: &str) -> PathBuf {
        self.root().join("opt").join(formula)
    }

    /// Installs `formula`; with `readiness_probe`, also places `bin/pg_isready` on disk.
    pub fn install(&self, formula: &str, version: &str, readiness_probe: bool) -> &Self {
        self.state()
            .installed
            .insert(formula.to_string(), version.to_string());

        let bin_dir = self.prefix(formula).join("bin");
        std::fs::create_dir_all(&bin_dir).expect("create bin dir");
        if readiness_probe {
            std::fs::write(bin_dir.join("pg_isready"), "#!/bin/sh\n").expect("write probe");
        }
        self
    }

    pub fn count(&self, program: &str, args: &[&str]) -> usize {
        self.state()
            .commands
            .iter()
            .filter(|command| command.starts_with(program, args))
            .count()
    }

    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.state().commands.clone()
    }

    pub fn databases(&self) -> BTreeSet<String> {
        self.state().databases.clone()
    }

    pub fn workflow(
        &self,
        config: WorkflowConfig,
    ) -> Workflow<ProcessHomebrewSource, ProcessPostgresSource> {
        let executor: Arc<dyn ProcessExecutor> = Arc::new(self.clone());
        Workflow::new(
            ProcessHomebrewSource::new(executor.clone()),
            ProcessPostgresSource::new(executor),
            config,
        )
        .expect("valid workflow config")
    }

    fn route(&self, program: &str, args: &[String]) -> ProcessOutput {
        let mut state = self.state();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        match program {
            "brew" => match args.as_slice() {
                ["list", "--versions", formula] => match state.installed.get(*formula) {
                    Some(version) => ok(format!("{formula} {version}\n")),
                    None => exit(1, ""),
                },
                ["--prefix", formula] => ok(format!("{}\n", self.prefix(formula).display())),
                ["services", "list", "--json"] => ok(services_json(&state)),
                ["services", "start", formula] => {
                    if state.start_takes_effect {
                        state.running.insert((*formula).to_string());
                    }
                    if state.start_fails {
                        return exit(1, "Bootstrap failed: 5: Input/output error (launchctl)");
                    }
                    ok(format!("==> Successfully started `{formula}`\n"))
                }
                ["services", "stop", formula] => {
                    if state.stop_takes_effect {
                        state.running.remove(*formula);
                    }
                    ok(format!("Stopping `{formula}`... (might take a while)\n"))
                }
                _ => exit(1, "Error: Unknown command"),
            },
            "pg_isready" => {
                if state.ready {
                    ok(String::new())
                } else {
                    exit(2, "")
                }
            }
            "psql" if args.contains(&"-l") => ok(state
                .databases
                .iter()
                .map(|name| format!("{name}|dev|UTF8|libc|en_US.UTF-8|en_US.UTF-8|||\n"))
                .collect()),
            "psql" if args.contains(&"-c") => {
                let database = flag_value(&args, "-d").unwrap_or_default();
                if state.query_succeeds && state.databases.contains(database) {
                    ok("1\n".to_string())
                } else {
                    exit(
                        2,
                        &format!("psql: error: FATAL:  database \"{database}\" does not exist"),
                    )
                }
            }
            "createdb" => {
                let name = args.last().copied().unwrap_or_default().to_string();
                if state.create_fails {
                    return exit(1, "createdb: error: permission denied to create database");
                }
                if !state.databases.insert(name.clone()) {
                    return exit(
                        1,
                        &format!("createdb: error: database \"{name}\" already exists"),
                    );
                }
                ok(String::new())
            }
            "dropdb" => {
                let name = args.last().copied().unwrap_or_default();
                state.databases.remove(name);
                ok(String::new())
            }
            "python" => match args.as_slice() {
                ["-m", "pip", ..] if state.pip_succeeds => ok("Successfully installed\n".into()),
                ["-m", "pip", ..] => exit(1, "ERROR: No matching distribution found"),
                _ if state.verify_succeeds => ok("ALL TESTS PASSED!\n".into()),
                _ => exit(1, "Database connection failed"),
            },
            _ => exit(127, "command not found"),
        }
    }
}

impl ProcessExecutor for FakeHost {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>> {
        let program = request.command.program_name();
        let output = self.route(&program, &request.command.args);

        self.state().commands.push(RecordedCommand {
            program,
            args: request.command.args.clone(),
            env: request.command.env.clone(),
        });

        Ok(Box::new(FakeProcess { output }))
    }
}

struct FakeProcess {
    output: ProcessOutput,
}

impl RunningProcess for FakeProcess {
    fn pid(&self) -> Option<u32> {
        Some(9999)
    }

    fn wait(self: Box<Self>) -> ProcessWaitFuture {
        let output = self.output;
        Box::pin(async move { Ok(output) })
    }
}

pub fn config(database: &str, variants: &[&str]) -> WorkflowConfig {
    WorkflowConfig::new(database)
        .with_variants(variants.iter().copied())
        .with_readiness(PollPolicy::immediate(3))
        .with_stop_grace(std::time::Duration::ZERO)
}

fn services_json(state: &HostState) -> String {
    let entries: Vec<String> = state
        .installed
        .keys()
        .map(|name| {
            let status = if state.running.contains(name) {
                "started"
            } else {
                "none"
            };
            format!(r#"{{"name":"{name}","status":"{status}","user":"dev","exit_code":0}}"#)
        })
        .collect();
    format!("[{}]", entries.join(","))
}

fn flag_value<'a>(args: &[&'a str], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| *arg == flag)
        .and_then(|index| args.get(index + 1).copied())
}

fn ok(stdout: String) -> ProcessOutput {
    output(0, stdout.into_bytes(), Vec::new())
}

fn exit(code: i32, stderr: &str) -> ProcessOutput {
    output(code, Vec::new(), stderr.as_bytes().to_vec())
}

fn output(code: i32, stdout: Vec<u8>, stderr: Vec<u8>) -> ProcessOutput {
    let now = SystemTime::now();
    ProcessOutput {
        status: ProcessExitStatus::ExitCode(code),
        stdout,
        stderr,
        started_at: now,
        finished_at: now,
    }
}
