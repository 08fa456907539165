use anyhow::{Context, Result};
use clap::Parser;
use numsim::{Geometry, SimParams, Simulation, Telemetry, VisTarget, Visualizer};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Headless incompressible flow solver.
#[derive(Parser, Debug)]
#[command(name = "numsim", version, about, long_about = None)]
struct Cli {
    /// Geometry file; the default lid-driven cavity when omitted
    #[arg(long)]
    geom: Option<PathBuf>,

    /// Parameter file; built-in defaults when omitted
    #[arg(long)]
    params: Option<PathBuf>,

    /// Write per-pass telemetry as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Stop after this many steps even if the end time is not reached
    #[arg(long)]
    max_steps: Option<usize>,

    /// Report the value range of this field at the end of the run
    #[arg(long, value_enum)]
    vis: Option<VisTarget>,

    /// Log a progress line every N steps (0 disables)
    #[arg(long, default_value_t = 100)]
    report_every: usize,

    /// Abort on the first pressure solve that hits the iteration limit
    #[arg(long)]
    strict: bool,
}

fn parse_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(&cli.log_level))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let geometry = match &cli.geom {
        Some(path) => Geometry::load(path)
            .with_context(|| format!("loading geometry {}", path.display()))?,
        None => Geometry::parse("").context("building default geometry")?,
    };
    let params = match &cli.params {
        Some(path) => SimParams::load(path)
            .with_context(|| format!("loading parameters {}", path.display()))?,
        None => SimParams::default(),
    };

    let mut sim = Simulation::new(geometry, params).with_strict(cli.strict);
    let mut telemetry = Telemetry::new();
    let max_steps = cli.max_steps.unwrap_or(usize::MAX);
    let report_every = cli.report_every;
    let summary = sim
        .run(&mut telemetry, |report| {
            if report_every > 0 && report.step % report_every == 0 {
                tracing::info!(
                    "step {} t={:.4} dt={:.3e} max|u|={:.3} max|v|={:.3} iterations={}",
                    report.step,
                    report.time,
                    report.dt,
                    report.max_u,
                    report.max_v,
                    report.solve.iterations
                );
            }
            report.step < max_steps
        })
        .context("integration failed")?;

    if let Some(target) = cli.vis {
        let state = sim.state();
        let mut vis = Visualizer::new(state, sim.geometry().mask(), target);
        let (lo, hi) = vis.range();
        tracing::info!("{:?} range: [{}, {}]", target, lo, hi);
    }

    if telemetry.is_empty() {
        tracing::warn!("no steps taken; end time is already reached");
    } else {
        for (name, entry) in telemetry.iter() {
            tracing::debug!(
                "{:<22} {:>8} runs {:>10.3} ms mean",
                name,
                entry.executions,
                entry.mean_ms()
            );
        }
    }

    if let Some(path) = &cli.json {
        let json = telemetry.to_json().context("serializing telemetry")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing telemetry to {}", path.display()))?;
        tracing::info!("telemetry written to {}", path.display());
    }

    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}
