mod check;
mod config;
mod inputs;
mod run;
mod schema;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use zkplay_abi::Abi;

use crate::config::Config;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Front-end for compiling and running zkSNARK programs.
#[derive(Parser)]
#[command(
    name = "zkplay",
    version,
    about = "Front-end for compiling and running zkSNARK programs"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a zkplay.toml config file (defaults to ./zkplay.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the validation schema of every ABI input
    Schema {
        /// Path to an ABI JSON file (or compiled artifacts carrying an "abi" field)
        abi: PathBuf,
    },

    /// Check input values against an ABI without running anything
    Check {
        /// Path to an ABI JSON file (or compiled artifacts carrying an "abi" field)
        abi: PathBuf,
        /// Input value as NAME=VALUE (repeatable)
        #[arg(short = 'i', long = "input", value_name = "NAME=VALUE")]
        inputs: Vec<String>,
        /// JSON object mapping input names to values
        #[arg(long = "inputs", value_name = "FILE")]
        inputs_file: Option<PathBuf>,
    },

    /// Compile a program with an engine process and run it
    Run {
        /// Path to the program source file
        source: PathBuf,
        /// Engine command (overrides [engine].command from the config)
        #[arg(long)]
        engine: Option<String>,
        /// Argument passed to the engine command (repeatable)
        #[arg(long = "engine-arg", value_name = "ARG", allow_hyphen_values = true)]
        engine_args: Vec<String>,
        /// Input value as NAME=VALUE (repeatable)
        #[arg(short = 'i', long = "input", value_name = "NAME=VALUE")]
        inputs: Vec<String>,
        /// JSON object mapping input names to values
        #[arg(long = "inputs", value_name = "FILE")]
        inputs_file: Option<PathBuf>,
        /// Stop after compiling
        #[arg(long)]
        compile_only: bool,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Schema { abi } => {
            schema::cmd_schema(&abi, cli.output, cli.quiet);
        }
        Commands::Check {
            abi,
            inputs,
            inputs_file,
        } => {
            check::cmd_check(
                &abi,
                &inputs,
                inputs_file.as_deref(),
                cli.output,
                cli.quiet,
            );
        }
        Commands::Run {
            source,
            engine,
            engine_args,
            inputs,
            inputs_file,
            compile_only,
        } => {
            let config = match Config::load(cli.config.as_deref()) {
                Ok(c) => c,
                Err(e) => {
                    report_error(&e.to_string(), cli.output, cli.quiet);
                    process::exit(1);
                }
            };
            let opts = run::RunOptions {
                source,
                engine,
                engine_args,
                inputs,
                inputs_file,
                compile_only,
            };
            run::cmd_run(opts, config, cli.output, cli.quiet);
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the default `warn` filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// ──────────────────────────────────────────────
// Shared helpers
// ──────────────────────────────────────────────

/// Read an ABI from a file, exiting with an error report on failure.
///
/// Accepts either a bare ABI object or compiled artifacts with an `"abi"`
/// field.
pub(crate) fn load_abi(path: &Path, output: OutputFormat, quiet: bool) -> Abi {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let json: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("invalid JSON in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let node = match json.get("abi") {
        Some(abi) if json.get("inputs").is_none() => abi,
        _ => &json,
    };
    match Abi::from_json(node) {
        Ok(abi) => abi,
        Err(e) => {
            let msg = format!("unusable ABI in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// Pretty-print a JSON value to stdout.
pub(crate) fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("error serializing output: {}", e),
    }
}

/// Report an error in the appropriate output format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            let body = serde_json::json!({ "error": msg });
            eprintln!("{}", body);
        }
    }
}
