use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use env_logger::Builder;
use log::{info, LevelFilter};
use toml::Table;
use tiersim::sim::config::{Config, HierarchyConfig, SimConfig};
use tiersim::sim::trace::parse_trace;
use tiersim::SimulationEngine;

#[derive(Parser)]
#[command(version, about)]
struct TiersimArgs {
    #[arg(help = "Path to config.toml")]
    config_path: PathBuf,
    #[arg(long, help = "Override trace path")]
    trace: Option<PathBuf>,
    #[arg(long, help = "Override prefetch look-ahead (lines)")]
    look_ahead: Option<u64>,
    #[arg(long, help = "Override prefetch issue width (requests/cycle)")]
    issue_width: Option<usize>,
    #[arg(long, help = "Enable log at level (0:warn, 1:info, 2:debug)")]
    log: Option<u64>,
    #[arg(long, help = "Write metrics as JSON to this path")]
    metrics_json: Option<PathBuf>,
}

// argv wins over `[sim] log_level`; read from the raw table so the logger is up before any
// section parsing can warn
fn log_level(argv_log: Option<u64>, config_table: &Table) -> u64 {
    argv_log
        .or_else(|| {
            config_table
                .get("sim")
                .and_then(|sim| sim.get("log_level"))
                .and_then(|level| level.as_integer())
                .and_then(|level| u64::try_from(level).ok())
        })
        .unwrap_or(SimConfig::default().log_level)
}

fn level_filter(level: u64) -> LevelFilter {
    match level {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

pub fn main() -> anyhow::Result<()> {
    let argv = TiersimArgs::parse();
    let config = fs::read_to_string(&argv.config_path)
        .with_context(|| format!("failed to read config file {}", argv.config_path.display()))?;
    let config_table: Table = toml::from_str(&config).context("cannot parse config toml")?;

    Builder::new()
        .filter_level(level_filter(log_level(argv.log, &config_table)))
        .parse_default_env()
        .init();

    let mut sim_config = SimConfig::from_section(config_table.get("sim"))?;
    let mut hier_config = HierarchyConfig::from_section(config_table.get("hierarchy"))?;

    // override toml configs with argv
    sim_config.log_level = argv.log.unwrap_or(sim_config.log_level);
    sim_config.trace = argv.trace.unwrap_or(sim_config.trace);
    sim_config.metrics_json = argv.metrics_json.or(sim_config.metrics_json);
    hier_config.prefetch_look_ahead = argv.look_ahead.unwrap_or(hier_config.prefetch_look_ahead);
    hier_config.prefetch_issue_width = argv.issue_width.unwrap_or(hier_config.prefetch_issue_width);

    let trace = fs::read_to_string(&sim_config.trace)
        .with_context(|| format!("failed to read trace {}", sim_config.trace.display()))?;
    let mut engine = SimulationEngine::new(hier_config)?;
    let metrics = engine.try_run(parse_trace(&trace))?;

    let summary = metrics.summary();
    info!(
        "fast tier hit rate {:.2}% ({} hits / {} reads)",
        summary.hit_rate,
        metrics.hits(),
        metrics.reads()
    );
    info!(
        "latency p50={:.1} p90={:.1} p99={:.1} cycles",
        summary.p50, summary.p90, summary.p99
    );
    info!(
        "demand bw {} prefetch bw {} total cycles {}",
        metrics.demand_bandwidth(),
        metrics.prefetch_bandwidth(),
        metrics.cycles()
    );

    if let Some(path) = &sim_config.metrics_json {
        let report = serde_json::json!({
            "config": hier_config,
            "summary": summary,
            "metrics": metrics,
        });
        fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
    }
    Ok(())
}
