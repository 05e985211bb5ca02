//! lepsel CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lepsel_core::Scope;
use lepsel_frame::{EventTable, Node};
use lepsel_select::{MacroExpander, SelectionConfig, Validator};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lepsel")]
#[command(about = "lepsel - lepton-pair event selections over columnar event dumps")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile shorthand lepton cuts; prints one JSON object per token
    Compile {
        /// Tokens such as `>=1OSSF|mass<65` or `AllSS_a`
        #[arg(required = true)]
        tokens: Vec<String>,

        /// Explicit side (`a` or `b`); overrides `_a`/`_b` token suffixes
        #[arg(long)]
        side: Option<String>,
    },

    /// Type-check the derived variables of a selection plan
    Validate {
        /// Event dump (JSON columns)
        #[arg(short, long)]
        events: PathBuf,

        /// Selection plan (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Cut-flows and yields for every region of a selection plan
    Yields {
        /// Event dump (JSON columns)
        #[arg(short, long)]
        events: PathBuf,

        /// Selection plan (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Threads (0 = auto).
        #[arg(long, default_value = "0")]
        threads: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the JSON results.
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compile { tokens, side } => cmd_compile(&tokens, side.as_deref()),
        Commands::Validate { events, config, output } => cmd_validate(&events, &config, output.as_ref()),
        Commands::Yields { events, config, output, threads } => {
            cmd_yields(&events, &config, output.as_ref(), threads)
        }
    }
}

fn cmd_compile(tokens: &[String], side: Option<&str>) -> Result<()> {
    let explicit = match side.map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(s.parse::<Scope>().with_context(|| format!("invalid --side '{s}'"))?),
    };
    let expander = MacroExpander::with_defaults()?;
    for token in tokens {
        let compiled = lepsel_select::compile(token, explicit);
        compiled.diagnostics.iter().for_each(|d| d.emit());
        let expression = compiled.expression();
        let line = serde_json::json!({
            "token": compiled.token,
            "scope": compiled.scope.token(),
            "compiled": expression,
            "expanded": expander.expand(&expression),
            "diagnostics": compiled.diagnostics,
        });
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}

fn cmd_validate(events: &Path, config: &Path, output: Option<&PathBuf>) -> Result<()> {
    let (node, config) = load_inputs(events, config)?;
    let expander = config.macro_expander()?;
    let validator = Validator::new(config.validation);
    let prepared = lepsel_select::prepare_node(&node, &config, &expander, &validator)?;

    let accepted = prepared.accepted().count();
    tracing::info!(accepted, requested = prepared.validations.len(), "derived variables validated");

    let output_json = serde_json::json!({
        "n_check": validator.config().n_check,
        "max_check": validator.config().max_check,
        "validations": prepared.validations,
        "diagnostics": prepared.diagnostics,
    });
    write_json(output, output_json)
}

fn cmd_yields(events: &Path, config: &Path, output: Option<&PathBuf>, threads: usize) -> Result<()> {
    if threads > 0 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }

    let (node, config) = load_inputs(events, config)?;
    let expander = config.macro_expander()?;
    let validator = Validator::new(config.validation);
    let prepared = lepsel_select::prepare_node(&node, &config, &expander, &validator)?;
    let report = lepsel_select::run_regions(&prepared.node, &config, &expander, &validator);

    let dropped = report.regions.iter().filter(|r| r.is_dropped()).count();
    tracing::info!(regions = report.regions.len(), dropped, "selection finished");

    let output_json = serde_json::json!({
        "lumi": config.lumi,
        "events": node.source_rows(),
        "derived_variables": prepared.accepted().collect::<Vec<_>>(),
        "regions": report.regions,
    });
    write_json(output, output_json)
}

fn load_inputs(events: &Path, config: &Path) -> Result<(Node, SelectionConfig)> {
    tracing::info!(path = %events.display(), "loading events");
    let table = EventTable::from_json_path(events)
        .with_context(|| format!("failed to read events from {}", events.display()))?;
    tracing::info!(path = %config.display(), "loading selection plan");
    let config = SelectionConfig::from_path(config)
        .with_context(|| format!("failed to read selection plan from {}", config.display()))?;
    Ok((Node::new(table), config))
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
