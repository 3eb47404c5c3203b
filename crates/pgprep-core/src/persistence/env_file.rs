//! The `.env` key/value file shared with the application that consumes the database.

use std::path::{Path, PathBuf};

use crate::config::validate_database_name;
use crate::models::connection::{DATABASE_URL_LOCAL_VAR, DATABASE_URL_VAR};
use crate::models::{CoreError, CoreErrorKind, DatabaseUrl, StageAction};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LoadOutcome {
    Loaded { path: PathBuf },
    Missing { path: PathBuf },
}

/// Loads `path` into the process environment without overriding variables that
/// are already set.
pub fn load_into_process(path: &Path) -> Result<LoadOutcome, CoreError> {
    if !path.is_file() {
        return Ok(LoadOutcome::Missing {
            path: path.to_path_buf(),
        });
    }

    dotenvy::from_path(path).map_err(|error| {
        config_error(format!("failed to load {}: {error}", path.display()))
    })?;

    Ok(LoadOutcome::Loaded {
        path: path.to_path_buf(),
    })
}

/// Reads `key` from the file without touching the process environment.
pub fn read_value(path: &Path, key: &str) -> Result<Option<String>, CoreError> {
    if !path.is_file() {
        return Ok(None);
    }

    let entries = dotenvy::from_path_iter(path).map_err(|error| {
        config_error(format!("failed to read {}: {error}", path.display()))
    })?;

    for entry in entries {
        let (name, value) = entry.map_err(|error| {
            config_error(format!("failed to parse {}: {error}", path.display()))
        })?;
        if name == key {
            return Ok(Some(value));
        }
    }

    Ok(None)
}

/// Sets `key` to `value`, replacing existing assignments in place and keeping
/// every other line untouched. The file is created when missing.
pub fn set_value(path: &Path, key: &str, value: &str) -> Result<(), CoreError> {
    let existing = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(error) => {
            return Err(config_error(format!(
                "failed to read {}: {error}",
                path.display()
            )));
        }
    };

    let rendered_value = quote_if_needed(value);
    let mut replaced = false;
    let mut lines: Vec<String> = existing
        .lines()
        .map(|line| match assignment_prefix(line, key) {
            Some(prefix) => {
                replaced = true;
                format!("{prefix}{key}={rendered_value}")
            }
            None => line.to_string(),
        })
        .collect();

    if !replaced {
        lines.push(format!("{key}={rendered_value}"));
    }

    let mut contents = lines.join("\n");
    contents.push('\n');

    std::fs::write(path, contents)
        .map_err(|error| config_error(format!("failed to write {}: {error}", path.display())))
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DatabaseSwitch {
    pub key: &'static str,
    pub previous: DatabaseUrl,
    pub current: DatabaseUrl,
}

/// Points the persisted connection string at `database`.
///
/// `DATABASE_URL_LOCAL` is updated when the file defines it, since it takes
/// precedence for local tooling; otherwise `DATABASE_URL` is updated.
pub fn switch_database(path: &Path, database: &str) -> Result<DatabaseSwitch, CoreError> {
    validate_database_name(database)?;

    // Blank values fall through, matching `DatabaseUrl::from_env`.
    let non_blank = |key: &str| -> Result<Option<String>, CoreError> {
        Ok(read_value(path, key)?.filter(|raw| !raw.trim().is_empty()))
    };
    let (key, raw) = match non_blank(DATABASE_URL_LOCAL_VAR)? {
        Some(raw) => (DATABASE_URL_LOCAL_VAR, raw),
        None => match non_blank(DATABASE_URL_VAR)? {
            Some(raw) => (DATABASE_URL_VAR, raw),
            None => {
                return Err(config_error(format!(
                    "{} defines no {DATABASE_URL_VAR}",
                    path.display()
                ))
                .with_hint(format!(
                    "add {DATABASE_URL_VAR}=postgresql://<user>@localhost:5432/{database} to {}",
                    path.display()
                )));
            }
        },
    };

    let previous = DatabaseUrl::parse(&raw)?;
    let current = previous.with_database(database);
    set_value(path, key, current.as_str())?;

    tracing::info!(key, from = %previous, to = %current, "updated connection string");
    Ok(DatabaseSwitch {
        key,
        previous,
        current,
    })
}

/// Returns the text before `KEY=` (an optional `export ` and indentation) when
/// `line` assigns `key`.
fn assignment_prefix<'l>(line: &'l str, key: &str) -> Option<&'l str> {
    let trimmed = line.trim_start();
    let rest = trimmed
        .strip_prefix("export ")
        .map(str::trim_start)
        .unwrap_or(trimmed);

    let after_key = rest.strip_prefix(key)?;
    if !after_key.trim_start().starts_with('=') {
        return None;
    }

    Some(&line[..line.len() - rest.len()])
}

/// Unquoted values are subject to `$VAR` substitution and `#` comments when loaded.
fn quote_if_needed(value: &str) -> String {
    let plain = !value
        .chars()
        .any(|ch| ch.is_whitespace() || matches!(ch, '#' | '"' | '\'' | '$' | '\\'));
    if plain {
        value.to_string()
    } else if !value.contains('\'') {
        format!("'{value}'")
    } else {
        let escaped = value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$");
        format!("\"{escaped}\"")
    }
}

fn config_error(message: String) -> CoreError {
    CoreError::for_action(
        StageAction::LoadConfiguration,
        CoreErrorKind::Configuration,
        message,
    )
}
