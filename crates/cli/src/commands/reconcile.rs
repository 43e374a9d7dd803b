use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use rolesync_core::{drain, Orchestrator, Traced};

use super::{load_config, open_store, print_json, read_events};
use crate::platform::FilePlatform;
use crate::{report_error, OutputFormat};

pub(crate) struct ReconcileOptions<'a> {
    pub config: &'a Path,
    pub store: &'a Path,
    pub platform: &'a Path,
    pub events: &'a [PathBuf],
    pub output: OutputFormat,
    pub quiet: bool,
}

/// Run every event through the engine in file order, then write the platform
/// state back. Exits 1 if any run failed.
pub(crate) async fn cmd_reconcile(opts: ReconcileOptions<'_>) {
    let output = opts.output;
    let quiet = opts.quiet;

    let config = load_config(opts.config, output, quiet);
    let backend = open_store(opts.store, output, quiet);
    let platform = match FilePlatform::open(opts.platform) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    let mut queue: VecDeque<_> = opts
        .events
        .iter()
        .flat_map(|path| read_events(path, output, quiet))
        .collect();

    let engine = match Orchestrator::from_config(config, backend, platform.clone(), platform.clone())
    {
        Ok(orchestrator) => Traced::new(orchestrator),
        Err(e) => {
            report_error(&format!("configuration error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let verdicts = drain(&mut queue, &engine).await;

    // Grants already issued stick even when a later step fails.
    if let Err(e) = platform.save() {
        report_error(&e.to_string(), output, quiet);
        process::exit(1);
    }

    match output {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = verdicts
                .iter()
                .map(|(event, verdict)| {
                    let mut entry = verdict.to_json();
                    entry["resource"] = serde_json::json!(event.resource);
                    entry["group"] = serde_json::json!(event.group);
                    entry
                })
                .collect();
            print_json(&serde_json::Value::Array(entries));
        }
        OutputFormat::Text => {
            for (event, verdict) in &verdicts {
                if verdict.is_failed() || !quiet {
                    println!("{}: {}", event.group, verdict);
                }
            }
        }
    }

    if verdicts.iter().any(|(_, verdict)| verdict.is_failed()) {
        process::exit(1);
    }
}
