//! CLI tool to bind a fixed-length data file against a TOML model.
//!
//! Usage:
//!   fixedlen-run <model.toml> <input.data>
//!   fixedlen-run <model.toml> <input.data> --root Payment -o out.json
//!
//! Bound records are written as JSON; without `-o` they go to stdout.

use clap::Parser;
use fixedlen_rs::{FixedLengthFormat, TransformRegistry, load_model_file};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Bind a fixed-length data file and print the records as JSON.
#[derive(Parser)]
#[command(name = "fixedlen-run")]
struct Cli {
    /// Model definition file (.toml)
    model: PathBuf,

    /// Input data file (fixed-length records, or /dev/stdin)
    input: PathBuf,

    /// Root record type; defaults to the first record in the model
    #[arg(short, long)]
    root: Option<String>,

    /// Locale for number parsing and formatting (e.g. de_DE)
    #[arg(short, long)]
    locale: Option<String>,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log compilation and record counts on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = match load_model_file(&cli.model, &TransformRegistry::with_builtins()) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error loading model '{}': {e}", cli.model.display());
            return ExitCode::FAILURE;
        }
    };

    let root = match cli.root.clone().or_else(|| registry.first().map(|r| r.name.clone())) {
        Some(root) => root,
        None => {
            eprintln!("Model '{}' declares no record types", cli.model.display());
            return ExitCode::FAILURE;
        }
    };

    let mut format = match FixedLengthFormat::new(&registry, &root) {
        Ok(format) => format,
        Err(e) => {
            eprintln!("Error compiling record type '{root}': {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(locale) = &cli.locale {
        format = format.with_locale(locale.as_str());
    }

    let input = match fs::File::open(&cli.input) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error reading input file '{}': {e}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };

    let result = match format.unmarshal(input) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Bind error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let json = match serde_json::to_string_pretty(&result) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error encoding output: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(out_path) = &cli.output {
        if let Some(parent) = Path::new(out_path).parent()
            && !parent.as_os_str().is_empty()
            && fs::create_dir_all(parent).is_err()
        {
            eprintln!("Error creating output directory for '{}'", out_path.display());
            return ExitCode::FAILURE;
        }
        if let Err(e) = fs::write(out_path, format!("{json}\n")) {
            eprintln!("Error writing output file '{}': {e}", out_path.display());
            return ExitCode::FAILURE;
        }
    } else if let Err(e) = writeln!(io::stdout(), "{json}") {
        eprintln!("Error writing output: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        root = %root,
        entries = result.entries.len(),
        header = result.header.is_some(),
        footer = result.footer.is_some(),
        "done"
    );
    ExitCode::SUCCESS
}
