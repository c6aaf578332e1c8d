use crate::reports;
use clap::Args;
use scatterforge::set::Individual;
use scatterforge::warm_start::{read_table, WarmStartPaths};
use scatterforge::{ReferenceSet, ScatterError, SsResult};
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Directory written by `search --save-state`
    pub dir: PathBuf,

    /// Number of Reference Set members to print
    #[arg(short = 'n', long, default_value_t = 10)]
    pub top: usize,
}

pub fn run(args: InspectArgs) -> SsResult<()> {
    let paths = WarmStartPaths::in_dir(&args.dir);
    info!("🔎 Inspecting saved state in {}", args.dir.display());

    let rows: Vec<Vec<f64>> = read_table(&paths.ref_set)?;
    let frequencies: Vec<Vec<u64>> = read_table(&paths.frequencies)?;
    let probabilities: Vec<Vec<f64>> = read_table(&paths.probabilities)?;

    let dim = frequencies.len();
    let sub_regions = frequencies.first().map(|r| r.len()).unwrap_or(0);
    check_shape("frequency matrix", &frequencies, dim, sub_regions)?;
    check_shape("probability matrix", &probabilities, dim, sub_regions)?;
    check_shape("reference set", &rows, rows.len(), dim + 1)?;

    let members = rows
        .into_iter()
        .map(|mut row| {
            let cost = row.pop().unwrap_or(f64::NAN);
            Individual::with_cost(row, cost)
        })
        .collect();
    let ref_set = ReferenceSet::new(members)?;

    println!(
        "\n📂 {} members, {} dimensions, {} sub-regions, spread {:.6e}",
        ref_set.len(),
        dim,
        sub_regions,
        ref_set.spread()
    );
    reports::print_reference_set(&ref_set, args.top);
    reports::print_matrix("Frequencies", &frequencies);
    reports::print_matrix("Probabilities", &probabilities);
    Ok(())
}

fn check_shape<T>(what: &str, rows: &[Vec<T>], expected_rows: usize, cols: usize) -> SsResult<()> {
    if rows.len() != expected_rows || rows.iter().any(|r| r.len() != cols) {
        return Err(ScatterError::WarmStart(format!(
            "{} is not {} x {}",
            what, expected_rows, cols
        )));
    }
    Ok(())
}
