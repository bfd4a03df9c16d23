//! rigblend-cli: inspect and evaluate corrective-shape libraries.
//!
//! Loads a JSON library definition, validates it, and prints the blend
//! weights the solver produces for given slider values, either once or across
//! a sweep of one slider.

mod config;

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rigblend_core::{CombinationModel, LibraryDefinition, Snapshot};
use rigblend_solver::WeightSolver;
use tracing::{debug, info};

use crate::config::CliConfig;

/// Corrective blend-shape weight solver.
#[derive(Parser, Debug)]
#[command(name = "rigblend-cli", version, about = "Inspect and evaluate corrective-shape libraries")]
struct Cli {
    /// Config file (default: <config dir>/rigblend/rigblend.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format ("text" or "json")
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a definition and print a summary.
    Check(CheckArgs),
    /// Solve one snapshot and print the active shape weights.
    Solve(SolveArgs),
    /// Sweep one slider across a range and print the weights at each step.
    Sweep(SweepArgs),
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Library definition (JSON).
    definition: PathBuf,
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    /// Slider value as NAME=VALUE. Repeatable; later values win.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// JSON object of slider values, applied before --set.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args, Debug)]
struct SolveArgs {
    /// Library definition (JSON).
    definition: PathBuf,

    #[command(flatten)]
    values: SnapshotArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct SweepArgs {
    /// Library definition (JSON).
    definition: PathBuf,

    /// Slider to sweep.
    #[arg(long)]
    slider: String,

    #[arg(long, default_value_t = -1.0, allow_hyphen_values = true)]
    from: f64,

    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    to: f64,

    /// Number of intervals; prints steps + 1 rows.
    #[arg(long, default_value_t = 20)]
    steps: u32,

    #[command(flatten)]
    values: SnapshotArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?.with_overrides(cli.log_level, cli.log_format);
    init_logging(&config.log_level, &config.log_format);
    debug!(?config, "cli: configuration loaded");

    let out = match cli.command {
        Commands::Check(args) => check(&args)?,
        Commands::Solve(args) => solve(&args, &config)?,
        Commands::Sweep(args) => sweep(&args, &config)?,
    };
    print!("{out}");
    Ok(())
}

fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}

fn load_definition(path: &Path) -> Result<LibraryDefinition> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read definition: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse definition: {}", path.display()))
}

fn load_model(path: &Path) -> Result<CombinationModel> {
    let model = load_definition(path)?
        .build()
        .with_context(|| format!("Invalid definition: {}", path.display()))?;
    info!(path = %path.display(), shapes = model.shapes().len(), "cli: definition loaded");
    Ok(model)
}

fn solver_for(path: &Path, config: &CliConfig) -> Result<WeightSolver> {
    let def = load_definition(path)?;
    let solver = WeightSolver::from_definition(&def, config.solver_config())
        .with_context(|| format!("Cannot solve with {}", path.display()))?;
    info!(
        path = %path.display(),
        shapes = solver.model().shapes().len(),
        "cli: definition loaded"
    );
    Ok(solver)
}

fn parse_assignment(s: &str) -> Result<(String, f64)> {
    let Some((name, value)) = s.split_once('=') else {
        bail!("Expected NAME=VALUE, got '{s}'");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Missing slider name in '{s}'");
    }
    let value: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for '{name}': '{value}'"))?;
    Ok((name.to_string(), value))
}

fn build_snapshot(args: &SnapshotArgs) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new();
    if let Some(path) = &args.snapshot {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
        let values: BTreeMap<String, f64> = serde_json::from_str(&text)
            .with_context(|| format!("Snapshot must be a JSON object of numbers: {}", path.display()))?;
        for (name, value) in values {
            snapshot.set(name, value);
        }
    }
    for assignment in &args.set {
        let (name, value) = parse_assignment(assignment)?;
        snapshot.set(name, value);
    }
    Ok(snapshot)
}

fn check(args: &CheckArgs) -> Result<String> {
    let model = load_model(&args.definition)?;
    Ok(summarize(&model))
}

fn summarize(model: &CombinationModel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "sliders: {}", model.sliders().len());
    let _ = writeln!(out, "combos:  {}", model.combos().len());
    let _ = writeln!(out, "shapes:  {}", model.shapes().len());
    let traversals = model.traversals().len();
    if traversals > 0 {
        let _ = writeln!(out, "traversals: {traversals}");
    }
    let inbetweens = model.shapes().iter().filter(|s| s.is_inbetween()).count();
    if inbetweens > 0 {
        let _ = writeln!(out, "in-betweens: {inbetweens}");
    }
    let deepest = model.combos().iter().map(|c| c.depth()).max().unwrap_or(0);
    if deepest > 0 {
        let _ = writeln!(out, "deepest combo: {deepest}");
    }
    let disabled = model.sliders().iter().filter(|s| !s.enabled()).count()
        + model.combos().iter().filter(|c| !c.enabled()).count()
        + model.traversals().iter().filter(|t| !t.enabled()).count();
    if disabled > 0 {
        let _ = writeln!(out, "disabled: {disabled}");
    }
    let mut groups: BTreeMap<&str, usize> = BTreeMap::new();
    let slider_groups = model.sliders().iter().filter_map(|s| s.group());
    let combo_groups = model.combos().iter().filter_map(|c| c.group());
    let traversal_groups = model.traversals().iter().filter_map(|t| t.group());
    for group in slider_groups.chain(combo_groups).chain(traversal_groups) {
        *groups.entry(group).or_default() += 1;
    }
    for (group, count) in groups {
        let _ = writeln!(out, "group {group}: {count}");
    }
    out
}

fn format_weights(weights: &BTreeMap<String, f64>, format: OutputFormat, precision: usize) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(weights)? + "\n"),
        OutputFormat::Text => {
            let mut out = String::new();
            for (name, weight) in weights {
                let _ = writeln!(out, "{name}\t{weight:.precision$}");
            }
            Ok(out)
        }
    }
}

fn solve(args: &SolveArgs, config: &CliConfig) -> Result<String> {
    let solver = solver_for(&args.definition, config)?;
    let snapshot = build_snapshot(&args.values)?;
    format_weights(&solver.solve_named(&snapshot), args.format, config.precision)
}

fn sweep(args: &SweepArgs, config: &CliConfig) -> Result<String> {
    let solver = solver_for(&args.definition, config)?;
    if solver.model().slider_id(&args.slider).is_none() {
        bail!("Unknown slider: {}", args.slider);
    }
    if args.steps == 0 {
        bail!("--steps must be at least 1");
    }
    let base = build_snapshot(&args.values)?;
    let precision = config.precision;

    let mut rows = Vec::with_capacity(args.steps as usize + 1);
    for i in 0..=args.steps {
        let t = f64::from(i) / f64::from(args.steps);
        let x = args.from + (args.to - args.from) * t;
        let weights = solver.solve_named(&base.clone().with(args.slider.clone(), x));
        rows.push((x, weights));
    }

    match args.format {
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = rows
                .into_iter()
                .map(|(x, weights)| serde_json::json!({ "value": x, "weights": weights }))
                .collect();
            Ok(serde_json::to_string_pretty(&json)? + "\n")
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for (x, weights) in rows {
                let _ = write!(out, "{x:+.precision$}");
                for (name, weight) in &weights {
                    let _ = write!(out, "\t{name}={weight:.precision$}");
                }
                out.push('\n');
            }
            Ok(out)
        }
    }
}
