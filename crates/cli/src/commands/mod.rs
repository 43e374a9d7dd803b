pub(crate) mod diff;
pub(crate) mod reconcile;
pub(crate) mod snapshot;

use std::path::Path;
use std::process;
use std::sync::Arc;

use rolesync_core::{EngineConfig, MembershipEvent};
use rolesync_storage::JsonFileBackend;
use serde::Deserialize;

use crate::{report_error, OutputFormat};

/// An event file holds one event or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum EventFile {
    One(MembershipEvent),
    Many(Vec<MembershipEvent>),
}

pub(crate) fn load_config(path: &Path, output: OutputFormat, quiet: bool) -> Arc<EngineConfig> {
    match EngineConfig::from_path(path) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            report_error(&format!("configuration error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn open_store(path: &Path, output: OutputFormat, quiet: bool) -> Arc<JsonFileBackend> {
    match JsonFileBackend::open(path) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            let msg = format!("error opening store '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn read_events(path: &Path, output: OutputFormat, quiet: bool) -> Vec<MembershipEvent> {
    let content = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match serde_json::from_str::<EventFile>(&content) {
        Ok(EventFile::One(event)) => vec![event],
        Ok(EventFile::Many(events)) => events,
        Err(e) => {
            let msg = format!("error parsing event in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn print_json(value: &serde_json::Value) {
    let pretty =
        serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("serialization error: {}", e));
    println!("{}", pretty);
}
