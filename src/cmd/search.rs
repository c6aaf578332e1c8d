use crate::reports::{self, StatsLog};
use clap::{ArgMatches, Args};
use scatterforge::benchmarks::Benchmark;
use scatterforge::config::Config;
use scatterforge::space::SearchSpace;
use scatterforge::warm_start::{self, WarmStartPaths};
use scatterforge::{IterationReport, ScatterError, ScatterSearch, SsResult};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Benchmark objective to minimize
    #[arg(short = 'f', long, value_enum, default_value_t = Benchmark::QuadraticBowl)]
    pub function: Benchmark,

    #[arg(short = 'd', long, default_value_t = 2)]
    pub dim: usize,

    /// Overrides the benchmark's lower bound in every dimension
    #[arg(long, allow_hyphen_values = true)]
    pub lower: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub upper: Option<f64>,

    #[command(flatten)]
    pub config: Config,

    /// Wall-clock limit in seconds
    #[arg(short = 'T', long)]
    pub time: Option<u64>,

    /// Tab-separated per-report statistics
    #[arg(long)]
    pub stats_log: Option<PathBuf>,

    /// Directory that receives the final state for a later warm start
    #[arg(long)]
    pub save_state: Option<PathBuf>,

    /// Print the run report as JSON instead of tables
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run(args: SearchArgs, matches: &ArgMatches, config_path: Option<&str>) -> SsResult<()> {
    let config = match config_path {
        Some(path) => {
            info!("⚖️  Loading parameters from {}", path);
            let mut file_config = Config::load_from_file(path)?;
            file_config.merge_from_cli(&args.config, matches);
            file_config
        }
        None => args.config.clone(),
    };

    let space = build_space(&args)?;
    info!(
        "🎯 Minimizing {} in {} dimensions",
        args.function,
        space.dim()
    );

    let mut search = ScatterSearch::new(space, args.function, config)?;
    if let Some(secs) = args.time {
        search = search.with_max_time(Duration::from_secs(secs));
    }

    let log = match &args.stats_log {
        Some(path) => Some(StatsLog::create(path)?),
        None => None,
    };
    let log = Mutex::new(log);
    let log_error: Mutex<Option<ScatterError>> = Mutex::new(None);

    let report = search.run(|r: &IterationReport| {
        let Ok(mut guard) = log.lock() else {
            return true;
        };
        let Some(stats) = guard.as_mut() else {
            return true;
        };
        match stats.record(r) {
            Ok(()) => true,
            Err(e) => {
                warn!("⚠️  Stats log write failed, stopping: {}", e);
                if let Ok(mut slot) = log_error.lock() {
                    *slot = Some(e);
                }
                false
            }
        }
    })?;

    if let Some(e) = log_error.into_inner().ok().flatten() {
        return Err(e);
    }
    if let Some(stats) = log.into_inner().ok().flatten() {
        stats.finish()?;
    }

    if let Some(dir) = &args.save_state {
        fs::create_dir_all(dir)?;
        warm_start::save(&WarmStartPaths::in_dir(dir), &report.reference_set, &report.grid)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        reports::print_summary(&args.function.to_string(), &report);
        reports::print_reference_set(&report.reference_set, 10);
    }
    Ok(())
}

fn build_space(args: &SearchArgs) -> SsResult<SearchSpace> {
    if args.dim == 0 {
        return Err(ScatterError::Config("dimension must be at least 1".to_string()));
    }
    let (lo, hi) = args.function.default_bounds();
    SearchSpace::uniform(args.dim, args.lower.unwrap_or(lo), args.upper.unwrap_or(hi))
}
