use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::DemoConfig;
use crate::error::{DemoError, Result};
use crate::replay::{ReplayOptions, replay};
use crate::scenario::ScenarioName;
use crate::script::Script;

#[derive(Debug, Parser)]
#[command(
    name = "xstore-demo",
    about = "Drive xstore stores against a headless window and print every render",
    version
)]
pub struct Cli {
    /// TOML file with `[runtime]` and `[breakpoints]` tables.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a built-in scenario.
    Scenario(ScenarioArgs),

    /// Replay a JSON event script.
    Replay(ReplayArgs),

    /// Print built-in scenario names.
    #[command(name = "list-scenarios")]
    ListScenarios,
}

#[derive(Debug, Clone, Args)]
pub struct ScenarioArgs {
    #[arg(value_enum)]
    pub name: ScenarioName,

    /// Fire a frame after every step.
    #[arg(long)]
    pub auto_tick: bool,

    /// Print the scenario's script instead of running it.
    #[arg(long)]
    pub print_script: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ReplayArgs {
    pub script: PathBuf,

    /// Fire a frame after every step.
    #[arg(long)]
    pub auto_tick: bool,

    /// Write render lines here instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run_from_env() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(cli, &mut out)
}

/// Run `cli`, writing primary output to `out`.
pub fn execute(cli: Cli, out: &mut dyn Write) -> Result<()> {
    let config = DemoConfig::load_or_default(cli.config.as_deref())?;
    match cli.command {
        Commands::Scenario(args) => run_scenario(&args, &config, out),
        Commands::Replay(args) => run_replay(&args, &config, out),
        Commands::ListScenarios => {
            for name in ScenarioName::ALL {
                writeln!(out, "{}", name.as_str())?;
            }
            Ok(())
        }
    }
}

fn run_scenario(args: &ScenarioArgs, config: &DemoConfig, out: &mut dyn Write) -> Result<()> {
    let script = args.name.script();
    if args.print_script {
        serde_json::to_writer_pretty(&mut *out, &script)?;
        writeln!(out)?;
        return Ok(());
    }
    tracing::info!(scenario = args.name.as_str(), "running scenario");
    let report = replay(
        &script,
        config,
        ReplayOptions {
            auto_tick: args.auto_tick,
        },
    )?;
    report.write_jsonl(out)
}

fn run_replay(args: &ReplayArgs, config: &DemoConfig, out: &mut dyn Write) -> Result<()> {
    let script = Script::load(&args.script)?;
    if script.steps.is_empty() && script.consumers.is_empty() {
        return Err(DemoError::invalid(format!(
            "script {} has no consumers and no steps",
            args.script.display()
        )));
    }
    let report = replay(
        &script,
        config,
        ReplayOptions {
            auto_tick: args.auto_tick,
        },
    )?;
    tracing::info!(
        steps = report.steps,
        ticks = report.ticks,
        events = report.events,
        renders = report.renders.len(),
        "replay finished"
    );

    match &args.output {
        Some(path) => {
            let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
            report.write_jsonl(&mut file)?;
            file.flush()?;
            Ok(())
        }
        None => report.write_jsonl(out),
    }
}
