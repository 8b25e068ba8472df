//! DPL CLI

use clap::{Args, Parser, Subcommand};
use dpl::error::{format_runtime_error, report_error};
use dpl::interp::{exec_in, root_namespace};
use dpl::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dpl", version, about = "DPL - a small embeddable scripting language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a DPL script
    Run {
        /// Script to run
        file: PathBuf,
        #[command(flatten)]
        exec: ExecOptions,
    },
    /// Evaluate DPL source given on the command line
    Eval {
        /// Source text
        source: String,
        #[command(flatten)]
        exec: ExecOptions,
    },
    /// Start an interactive session
    Repl,
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
    /// Parse and dump the program tree as JSON (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
}

#[derive(Args)]
struct ExecOptions {
    /// Bind a variable before running: NAME=JSON (non-JSON values bind as text)
    #[arg(long = "var", value_name = "NAME=JSON", value_parser = parse_var)]
    vars: Vec<(String, serde_json::Value)>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn parse_var(arg: &str) -> Result<(String, serde_json::Value), String> {
    let (name, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{arg}`"))?;
    if name.is_empty() {
        return Err("variable name must not be empty".to_string());
    }
    let value = serde_json::from_str(raw)
        .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run { file, exec } => run_file(&file, &exec),
        Command::Eval { source, exec } => execute("<eval>", &source, &exec),
        Command::Repl => start_repl(),
        Command::Tokens { file } => tokenize_file(&file),
        Command::Parse { file } => parse_file(&file),
    };

    if let Err(e) = result {
        if !matches!(e, Failure::Reported) {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
}

/// Install a fmt subscriber when RUST_LOG is set
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

/// CLI failure; `Reported` means diagnostics were already printed
#[derive(Debug, thiserror::Error)]
enum Failure {
    #[error("diagnostics reported")]
    Reported,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

fn read_source(path: &Path) -> Result<String, Failure> {
    std::fs::read_to_string(path)
        .map_err(|e| Failure::Other(format!("cannot read {}: {e}", path.display())))
}

fn run_file(path: &Path, exec: &ExecOptions) -> Result<(), Failure> {
    let source = read_source(path)?;
    execute(&path.display().to_string(), &source, exec)
}

fn execute(filename: &str, source: &str, options: &ExecOptions) -> Result<(), Failure> {
    let program = dpl::compile(source).map_err(|err| {
        report_error(filename, source, &err);
        Failure::Reported
    })?;

    let bindings: HashMap<String, Value> = options
        .vars
        .iter()
        .map(|(name, json)| (name.clone(), Value::from(json.clone())))
        .collect();
    let namespace = root_namespace(bindings);

    let value = exec_in(&program, &namespace).map_err(|err| {
        eprintln!("{}", format_runtime_error(&err, Some(&namespace)));
        Failure::Reported
    })?;

    if options.json {
        let json = value.to_json().map_err(|err| {
            eprintln!("{}", format_runtime_error(&err, None));
            Failure::Reported
        })?;
        println!("{json}");
    } else if !matches!(value, Value::Null) {
        println!("{value}");
    }
    Ok(())
}

fn start_repl() -> Result<(), Failure> {
    let mut repl = dpl::repl::Repl::new().map_err(|e| Failure::Other(e.to_string()))?;
    repl.run().map_err(|e| Failure::Other(e.to_string()))
}

fn tokenize_file(path: &Path) -> Result<(), Failure> {
    let source = read_source(path)?;
    let filename = path.display().to_string();

    let tokens = dpl::lexer::tokenize(&source).map_err(|err| {
        report_error(&filename, &source, &err);
        Failure::Reported
    })?;

    for (token, span) in tokens {
        println!("{:>10}  {token}", span.to_string());
    }
    Ok(())
}

fn parse_file(path: &Path) -> Result<(), Failure> {
    let source = read_source(path)?;
    let filename = path.display().to_string();

    let program = dpl::compile(&source).map_err(|err| {
        report_error(&filename, &source, &err);
        Failure::Reported
    })?;

    let json = serde_json::to_string_pretty(&program).map_err(std::io::Error::from)?;
    println!("{json}");
    Ok(())
}
