//! jsonql CLI - Run a JSON request against a configured data source
//!
//! Usage:
//!   jsonql [--config <file>] [--source <name>] <request | @file>
//!
//! Examples:
//!   jsonql --config jsonql.toml '{"select": "users", "limit": [0, 10]}'
//!   jsonql --source reports @request.json
//!   RUST_LOG=jsonql=debug jsonql '{"struct": "orders"}'

use clap::Parser;
use jsonql::config::Settings;
use jsonql::translation::Translator;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jsonql")]
#[command(about = "jsonql - Translate JSON query requests into SQL and run them")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to $JSONQL_CONFIG, ./jsonql.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data source used when the request names none
    #[arg(short, long)]
    source: Option<String>,

    /// Print the result on one line
    #[arg(long)]
    compact: bool,

    /// JSON request, or @path to read it from a file
    request: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let mut settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(source) = cli.source {
        settings.default_datasource = Some(source);
    }

    let request = match cli.request.strip_prefix('@') {
        Some(path) => match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => cli.request,
    };

    let translator = match Translator::from_settings(settings) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error opening data sources: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let summary = match translator.translate(&request) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let data = summary.data();
    let output = if cli.compact {
        serde_json::to_string(&data)
    } else {
        serde_json::to_string_pretty(&data)
    };
    match output {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing result: {}", e);
            ExitCode::FAILURE
        }
    }
}
