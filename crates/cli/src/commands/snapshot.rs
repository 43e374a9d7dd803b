use std::path::Path;
use std::process;

use rolesync_core::config::DEFAULT_CHUNK_WIDTH;
use rolesync_core::{ChunkCodec, SnapshotError, SnapshotStore};
use rolesync_storage::ChunkRecord;

use super::{open_store, print_json};
use crate::{report_error, OutputFormat};

pub(crate) async fn cmd_show(
    store_path: &Path,
    table: &str,
    group: &str,
    output: OutputFormat,
    quiet: bool,
) {
    let backend = open_store(store_path, output, quiet);
    // Width only matters for writes; any valid codec reads every snapshot.
    let snapshots = ChunkCodec::new(DEFAULT_CHUNK_WIDTH)
        .map_err(SnapshotError::from)
        .and_then(|codec| SnapshotStore::new(backend, codec));
    let snapshots = match snapshots {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("snapshot error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let records = match snapshots.read_chunks(table, group).await {
        Ok(chunks) => chunks.len(),
        Err(e) => {
            report_error(&format!("snapshot error: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let members = match snapshots.load(table, group).await {
        Ok(members) => members,
        Err(e) => {
            report_error(&format!("snapshot error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "table": table,
            "group": group,
            "records": records,
            "members": members,
        })),
        OutputFormat::Text => {
            if records == 0 {
                if !quiet {
                    eprintln!("no snapshot recorded for '{}'", group);
                }
                return;
            }
            for member in &members {
                println!("{}", member);
            }
            if !quiet {
                eprintln!(
                    "{} member(s) in {} record(s)",
                    members.len(),
                    records
                );
            }
        }
    }
}

pub(crate) fn cmd_encode(
    file: &Path,
    width: usize,
    group: Option<&str>,
    output: OutputFormat,
    quiet: bool,
) {
    let content = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading '{}': {}", file.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let members: Vec<String> = match serde_json::from_str(&content) {
        Ok(m) => m,
        Err(e) => {
            let msg = format!(
                "error parsing member list in '{}': {}",
                file.display(),
                e
            );
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let codec = match ChunkCodec::new(width) {
        Ok(codec) => codec,
        Err(e) => {
            report_error(&format!("encode error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let encoded = match group {
        Some(g) => codec.records(g, &members).map(Encoded::Keyed),
        None => codec.encode(&members).map(Encoded::Bare),
    };
    let encoded = match encoded {
        Ok(encoded) => encoded,
        Err(e) => {
            report_error(&format!("encode error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match (output, encoded) {
        (OutputFormat::Json, Encoded::Keyed(records)) => print_json(&serde_json::json!(records)),
        (OutputFormat::Json, Encoded::Bare(chunks)) => print_json(&serde_json::json!(chunks)),
        (OutputFormat::Text, Encoded::Keyed(records)) => {
            for record in &records {
                println!("{}\t{}", record.key, record.value);
            }
        }
        (OutputFormat::Text, Encoded::Bare(chunks)) => {
            for chunk in &chunks {
                println!("{}", chunk);
            }
        }
    }
}

enum Encoded {
    Keyed(Vec<ChunkRecord>),
    Bare(Vec<String>),
}
