mod commands;
mod config;
mod logging;
mod outbox;

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use formwork_eval::FormData;
use formwork_interchange::FormMetadata;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Formwork form metadata toolchain.
#[derive(Parser)]
#[command(name = "formwork", version, about = "Formwork form metadata toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check form metadata against the schema and its integrity rules
    Check {
        /// Path to the form metadata JSON file
        metadata: PathBuf,
    },

    /// Show the derived state of every field for a data snapshot
    State {
        /// Path to the form metadata JSON file
        metadata: PathBuf,
        /// Path to the data snapshot JSON file
        #[arg(long)]
        data: PathBuf,
    },

    /// Validate a data snapshot against a form
    Validate {
        /// Path to the form metadata JSON file
        metadata: PathBuf,
        /// Path to the data snapshot JSON file
        #[arg(long)]
        data: PathBuf,
    },

    /// Evaluate a formula
    Calc {
        /// Formula source, e.g. "round(amount * 1.19, 2)"
        formula: String,
        /// Path to a data snapshot JSON file providing field values
        #[arg(long)]
        data: Option<PathBuf>,
    },

    /// Validate a snapshot and append it to an outbox file
    Submit {
        /// Form id, resolved as <registry>/<form-id>.json
        form_id: String,
        /// Directory holding form metadata files
        #[arg(long, default_value = "forms")]
        registry: PathBuf,
        /// Path to the data snapshot JSON file
        #[arg(long)]
        data: PathBuf,
        /// File accepted submissions are appended to, one JSON object per line
        #[arg(long, default_value = "outbox.jsonl")]
        outbox: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let settings = match config::load(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            report_error(&e, cli.output, cli.quiet);
            process::exit(1);
        }
    };
    if let Err(e) = logging::init_logging(cli.verbose, settings.logging.level.as_deref()) {
        report_error(&e, cli.output, cli.quiet);
        process::exit(1);
    }

    match cli.command {
        Commands::Check { metadata } => {
            commands::check::cmd_check(&metadata, cli.output, cli.quiet);
        }
        Commands::State { metadata, data } => {
            commands::state::cmd_state(&metadata, &data, &settings.engine, cli.output, cli.quiet);
        }
        Commands::Validate { metadata, data } => {
            commands::validate::cmd_validate(&metadata, &data, cli.output, cli.quiet);
        }
        Commands::Calc { formula, data } => {
            commands::calc::cmd_calc(
                &formula,
                data.as_deref(),
                &settings.engine,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Submit {
            form_id,
            registry,
            data,
            outbox,
        } => {
            commands::submit::cmd_submit(
                &form_id,
                &registry,
                &data,
                &outbox,
                settings.engine,
                cli.output,
                cli.quiet,
            );
        }
    }
}

// ──────────────────────────────────────────────
// Shared helpers
// ──────────────────────────────────────────────

/// Read and parse a JSON file, reporting and exiting on failure.
pub(crate) fn read_json(path: &Path, output: OutputFormat, quiet: bool) -> serde_json::Value {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn load_metadata(path: &Path, output: OutputFormat, quiet: bool) -> FormMetadata {
    let doc = read_json(path, output, quiet);
    match formwork_interchange::from_interchange(&doc) {
        Ok(m) => m,
        Err(e) => {
            let msg = format!("invalid form metadata in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn load_data(path: &Path, output: OutputFormat, quiet: bool) -> FormData {
    let doc = read_json(path, output, quiet);
    match FormData::from_json(&doc) {
        Ok(d) => d,
        Err(e) => {
            let msg = format!("invalid data snapshot in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// Print a JSON value to stdout.
pub(crate) fn print_json(value: &serde_json::Value) {
    let pretty = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
    println!("{}", pretty);
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
