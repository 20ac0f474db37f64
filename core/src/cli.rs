use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::{Config, LoggingConfig, OutputFormat};
use crate::types::{RunOutcome, Variable, Variables};

#[derive(Parser)]
#[command(name = "vizstep")]
#[command(about = "vizstep - Run small C++-like programs and record every array write", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Output format (overrides config file and env vars)
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a program and print its step history
    Run {
        /// Source file, or "-" for stdin
        source: String,

        /// JSON file mapping names to {"kind": ..., "value": ...}
        #[arg(long)]
        vars: Option<PathBuf>,

        /// Variable as NAME=LITERAL, e.g. arr=[1,2,3] (repeatable)
        #[arg(long = "var", value_name = "NAME=LITERAL")]
        var: Vec<String>,
    },

    /// Print the instrumented syntax tree as JSON
    Normalize {
        /// Source file, or "-" for stdin
        source: String,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

/// Internal function that handles CLI commands
fn run_cli_with_args(cli: Cli) -> Result<()> {
    let config = Config::builder()
        .config_path(cli.config.map(PathBuf::from))
        .build()?;
    init_tracing(&config.logging);

    let format = cli.format.unwrap_or(config.output.format);

    match cli.command {
        Commands::Run { source, vars, var } => {
            let source = read_source(&source)?;
            let variables = load_variables(vars.as_deref(), &var)?;

            let outcome = crate::executor::execute(&source, &variables);
            println!("{}", render_outcome(&outcome, format, config.output.pretty)?);

            if !outcome.is_success() {
                std::process::exit(1);
            }
        }

        Commands::Normalize { source } => {
            let source = read_source(&source)?;
            let program = crate::normalizer::normalize(&source)?;
            let json = if config.output.pretty {
                serde_json::to_string_pretty(&program)?
            } else {
                serde_json::to_string(&program)?
            };
            println!("{}", json);
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Log to stderr so stdout only carries results
fn init_tracing(logging: &LoggingConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    // Already installed when embedded in a host that set its own subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read source from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(source).with_context(|| format!("Failed to read source file {}", source))
}

fn load_variables(vars_file: Option<&Path>, assignments: &[String]) -> Result<Variables> {
    let mut variables = match vars_file {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read variables file {}", path.display()))?;
            serde_json::from_str::<Variables>(&contents)
                .with_context(|| format!("Invalid variables file {}", path.display()))?
        }
        None => Variables::new(),
    };

    for assignment in assignments {
        let (name, variable) = parse_var_assignment(assignment)?;
        variables.insert(name, variable);
    }

    Ok(variables)
}

/// Parse `NAME=LITERAL`; the literal's nesting depth picks the kind
fn parse_var_assignment(assignment: &str) -> Result<(String, Variable)> {
    let (name, literal) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected NAME=LITERAL, got '{}'", assignment))?;
    let variable = Variable::from_literal(literal.trim())
        .with_context(|| format!("Invalid value for variable '{}'", name.trim()))?;
    Ok((name.trim().to_string(), variable))
}

fn render_outcome(outcome: &RunOutcome, format: OutputFormat, pretty: bool) -> Result<String> {
    match format {
        OutputFormat::Json if pretty => Ok(serde_json::to_string_pretty(outcome)?),
        OutputFormat::Json => Ok(serde_json::to_string(outcome)?),
        OutputFormat::Text => Ok(match outcome {
            RunOutcome::Success { history } if history.is_empty() => "(no steps)".to_string(),
            RunOutcome::Success { history } => history
                .iter()
                .map(|step| step.to_string())
                .collect::<Vec<_>>()
                .join("\n"),
            RunOutcome::Failure { error } => format!("failure: {}", error),
        }),
    }
}
