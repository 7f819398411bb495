//! `flowcheck` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate`: validate one or more workflow JSON files and print the reports.
//! - `connect`: ask whether an edge may be drawn between two nodes.
//! - `gate`: check whether save / activate / run-test may proceed.
//! - `order`: print the execution order of a workflow.
//! - `fingerprint`: print the content fingerprint used for caching.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, Level};

use engine::{gate, EngineConfig, GateAction, ValidationResult, Workflow};

#[derive(Parser)]
#[command(
    name = "flowcheck",
    about = "Structural validation for visual automation workflows",
    version
)]
struct Cli {
    /// Engine configuration (JSON). Defaults apply when omitted.
    #[arg(long, global = true, env = "FLOWCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Log rule decisions to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate workflow definition JSON files.
    Validate {
        /// Paths to the workflow JSON files. Identical graphs are validated once.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Check whether a connection between two existing nodes is allowed.
    Connect {
        path: PathBuf,
        source: String,
        target: String,
        /// Named output handle on the source, e.g. `true` or `false`.
        #[arg(long)]
        handle: Option<String>,
    },
    /// Check whether a document-level action may proceed.
    Gate {
        path: PathBuf,
        #[arg(value_enum)]
        action: Action,
    },
    /// Print the order in which nodes would run.
    Order { path: PathBuf },
    /// Print the content fingerprint of a workflow.
    Fingerprint { path: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum Action {
    Save,
    Activate,
    RunTest,
}

impl From<Action> for GateAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Save => GateAction::Save,
            Action::Activate => GateAction::Activate,
            Action::RunTest => GateAction::RunTest,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    debug!(?config, "engine configured");

    match cli.command {
        Command::Validate { paths, json } => {
            let mut cache = config.cache();
            let mut all_valid = true;

            for path in &paths {
                let workflow = load(path)?;
                let result = cache.validate(&workflow.nodes, &workflow.edges);
                all_valid &= result.is_valid;

                if json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    print_report(&workflow, &result);
                }
            }
            debug!(stats = ?cache.stats(), "validation cache");
            Ok(exit_code(all_valid))
        }
        Command::Connect { path, source, target, handle } => {
            let workflow = load(&path)?;
            let source = workflow.require_node(&source)?;
            let target = workflow.require_node(&target)?;

            match config
                .rules()
                .can_connect_via(source, handle.as_deref(), target, &workflow.edges)
            {
                Ok(()) => {
                    println!("✅ {} -> {} can be connected", source.id, target.id);
                    Ok(ExitCode::SUCCESS)
                }
                Err(rejection) => {
                    println!("❌ {} -> {}: {rejection}", source.id, target.id);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Gate { path, action } => {
            let workflow = load(&path)?;
            let action = GateAction::from(action);

            match gate::check(&config.validator(), action, &workflow) {
                Ok(result) => {
                    println!("✅ {action} allowed (score {})", result.score);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    println!("❌ {e}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Order { path } => {
            let workflow = load(&path)?;
            let order = engine::execution_order(&workflow.nodes, &workflow.edges)
                .context("workflow cannot be ordered")?;
            for (step, id) in order.iter().enumerate() {
                let label = workflow.node(id).map_or(id.as_str(), |n| n.display_label());
                println!("{:>3}. {label} ({id})", step + 1);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Fingerprint { path } => {
            let workflow = load(&path)?;
            println!("{}", workflow.fingerprint()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load(path: &Path) -> Result<Workflow> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    Workflow::from_json(&content).with_context(|| format!("cannot parse workflow {}", path.display()))
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_report(workflow: &Workflow, result: &ValidationResult) {
    let status = if result.is_valid { "✅ valid" } else { "❌ invalid" };
    println!("{}: {status}, score {}/100", workflow.name, result.score);

    for (heading, issues) in [
        ("errors", &result.errors),
        ("warnings", &result.warnings),
        ("info", &result.info),
    ] {
        if issues.is_empty() {
            continue;
        }
        println!("\n{heading}:");
        for issue in issues {
            println!("  [{}] {}", issue.id, issue.message);
            if let Some(suggestion) = &issue.suggestion {
                println!("      → {suggestion}");
            }
        }
    }
}
