mod commands;
mod platform;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use rolesync_core::config::DEFAULT_CHUNK_WIDTH;
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Group membership to role grant reconciliation.
#[derive(Parser)]
#[command(
    name = "rolesync",
    version,
    about = "Group membership to role grant reconciliation"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log engine activity to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or produce chunked member-list snapshots
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },

    /// Show the grants and revokes an event would cause, without applying them
    Diff {
        /// Path to the engine TOML configuration
        #[arg(long)]
        config: PathBuf,
        /// Path to the JSON snapshot store
        #[arg(long)]
        store: PathBuf,
        /// Path to the membership event JSON file
        event: PathBuf,
    },

    /// Reconcile role grants for one or more membership events
    Reconcile {
        /// Path to the engine TOML configuration
        #[arg(long)]
        config: PathBuf,
        /// Path to the JSON snapshot store
        #[arg(long)]
        store: PathBuf,
        /// Path to the platform roles JSON file (updated in place)
        #[arg(long)]
        platform: PathBuf,
        /// Membership event JSON files, processed in order
        #[arg(required = true)]
        events: Vec<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SnapshotCommands {
    /// Print the member list recorded for a group
    Show {
        /// Path to the JSON snapshot store
        #[arg(long)]
        store: PathBuf,
        /// Snapshot table name
        #[arg(long)]
        table: String,
        /// Directory group name
        group: String,
    },

    /// Split a JSON member list into fixed-width records
    Encode {
        /// Maximum characters per record
        #[arg(long, default_value_t = DEFAULT_CHUNK_WIDTH)]
        width: usize,
        /// Prefix each record with its storage key for this group
        #[arg(long)]
        group: Option<String>,
        /// Path to a JSON array of member identifiers
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Snapshot { command } => match command {
            SnapshotCommands::Show {
                store,
                table,
                group,
            } => {
                let rt = runtime(cli.output, cli.quiet);
                rt.block_on(commands::snapshot::cmd_show(
                    &store, &table, &group, cli.output, cli.quiet,
                ));
            }
            SnapshotCommands::Encode { width, group, file } => {
                commands::snapshot::cmd_encode(&file, width, group.as_deref(), cli.output, cli.quiet);
            }
        },
        Commands::Diff {
            config,
            store,
            event,
        } => {
            let rt = runtime(cli.output, cli.quiet);
            rt.block_on(commands::diff::cmd_diff(
                &config, &store, &event, cli.output, cli.quiet,
            ));
        }
        Commands::Reconcile {
            config,
            store,
            platform,
            events,
        } => {
            let rt = runtime(cli.output, cli.quiet);
            rt.block_on(commands::reconcile::cmd_reconcile(
                commands::reconcile::ReconcileOptions {
                    config: &config,
                    store: &store,
                    platform: &platform,
                    events: &events,
                    output: cli.output,
                    quiet: cli.quiet,
                },
            ));
        }
    }
}

/// Logs go to stderr so stdout stays parseable. `RUST_LOG` wins over flags.
fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = match (verbose, quiet) {
        (true, _) => "debug",
        (false, true) => "error",
        (false, false) => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn runtime(output: OutputFormat, quiet: bool) -> tokio::runtime::Runtime {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            report_error(&format!("failed to start runtime: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
