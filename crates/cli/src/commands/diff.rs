use std::path::Path;
use std::process;

use rolesync_core::{preview, ChunkCodec, SnapshotError, SnapshotStore};

use super::{load_config, open_store, print_json, read_events};
use crate::{report_error, OutputFormat};

/// Dry run: load each event's snapshot and print the delta.
pub(crate) async fn cmd_diff(
    config_path: &Path,
    store_path: &Path,
    event_path: &Path,
    output: OutputFormat,
    quiet: bool,
) {
    let config = load_config(config_path, output, quiet);
    let backend = open_store(store_path, output, quiet);
    let snapshots = ChunkCodec::new(config.chunk_width)
        .map_err(SnapshotError::from)
        .and_then(|codec| SnapshotStore::new(backend, codec));
    let snapshots = match snapshots {
        Ok(s) => s.with_scan_ceiling(config.scan_ceiling),
        Err(e) => {
            report_error(&format!("snapshot error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let mut results = Vec::new();
    for event in read_events(event_path, output, quiet) {
        match preview(&*config, &snapshots, &event).await {
            Ok(delta) => results.push((event, delta)),
            Err(e) => {
                let msg = format!("diff failed for '{}' [{}]: {}", event.group, e.class(), e);
                report_error(&msg, output, quiet);
                process::exit(1);
            }
        }
    }

    match output {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = results
                .iter()
                .map(|(event, delta)| {
                    serde_json::json!({
                        "resource": event.resource,
                        "group": event.group,
                        "to_add": delta.to_add,
                        "to_remove": delta.to_remove,
                    })
                })
                .collect();
            print_json(&serde_json::Value::Array(entries));
        }
        OutputFormat::Text => {
            for (event, delta) in &results {
                println!("{}:", event.group);
                for member in &delta.to_add {
                    println!("  + {}", member);
                }
                for member in &delta.to_remove {
                    println!("  - {}", member);
                }
                if delta.is_empty() && !quiet {
                    println!("  (no changes)");
                }
            }
        }
    }
}

