//! Tab-separated persistence of the state needed to resume a run: the
//! Reference Set and the sub-region frequency/probability matrices.
//!
//! Reals are written with Rust's shortest round-trip formatting, so a saved
//! state reloads bit for bit.

use crate::config::{SetSizes, WarmStartParams};
use crate::error::{ScatterError, SsResult};
use crate::grid::SubRegionGrid;
use crate::set::{Individual, ReferenceSet};
use crate::space::SearchSpace;
use csv::{ReaderBuilder, WriterBuilder};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct WarmStartPaths {
    pub ref_set: PathBuf,
    pub frequencies: PathBuf,
    pub probabilities: PathBuf,
}

impl WarmStartPaths {
    /// Conventional file names inside `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            ref_set: dir.join("ref_set.tsv"),
            frequencies: dir.join("freq_mat.tsv"),
            probabilities: dir.join("prob_mat.tsv"),
        }
    }

    pub fn from_params(params: &WarmStartParams) -> SsResult<Self> {
        match (
            &params.ref_set_file,
            &params.freq_mat_file,
            &params.prob_mat_file,
        ) {
            (Some(r), Some(f), Some(p)) => Ok(Self {
                ref_set: r.clone(),
                frequencies: f.clone(),
                probabilities: p.clone(),
            }),
            _ => Err(ScatterError::Config(
                "warm start needs ref_set_file, freq_mat_file and prob_mat_file".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WarmStartState {
    pub reference_set: ReferenceSet,
    pub grid: SubRegionGrid,
}

pub fn save(paths: &WarmStartPaths, ref_set: &ReferenceSet, grid: &SubRegionGrid) -> SsResult<()> {
    write_rows(
        &paths.ref_set,
        ref_set.members().iter().map(|m| {
            let mut row = m.params.clone();
            row.push(m.cost);
            row
        }),
    )?;
    write_rows(&paths.frequencies, grid.frequencies().iter().cloned())?;
    write_rows(&paths.probabilities, grid.probabilities().iter().cloned())?;
    info!("💾 Saved warm-start state to {}", paths.ref_set.display());
    Ok(())
}

/// Loads a saved state and checks every file against the active space and
/// set sizes. Any disagreement is a configuration error.
pub fn load(
    paths: &WarmStartPaths,
    space: &SearchSpace,
    sizes: &SetSizes,
) -> SsResult<WarmStartState> {
    let dim = space.dim();
    let rows: Vec<Vec<f64>> = read_rows(&paths.ref_set, sizes.ref_set_size, dim + 1)?;
    let mut members = Vec::with_capacity(rows.len());
    for (line, mut row) in rows.into_iter().enumerate() {
        let cost = row.pop().unwrap_or(f64::NAN);
        if cost.is_nan() {
            return Err(ScatterError::WarmStart(format!(
                "{}: row {} has no usable cost",
                paths.ref_set.display(),
                line + 1
            )));
        }
        if !space.contains(&row) {
            return Err(ScatterError::WarmStart(format!(
                "{}: row {} lies outside the search space",
                paths.ref_set.display(),
                line + 1
            )));
        }
        members.push(Individual::with_cost(row, cost));
    }

    let frequencies: Vec<Vec<u64>> = read_rows(&paths.frequencies, dim, sizes.sub_regions)?;
    let probabilities: Vec<Vec<f64>> = read_rows(&paths.probabilities, dim, sizes.sub_regions)?;

    let state = WarmStartState {
        reference_set: ReferenceSet::new(members)?,
        grid: SubRegionGrid::from_matrices(space, frequencies, probabilities)?,
    };
    info!(
        "📂 Warm start: {} members, best cost {}",
        state.reference_set.len(),
        state.reference_set.best().cost
    );
    Ok(state)
}

fn write_rows<T, I>(path: &Path, rows: I) -> SsResult<()>
where
    T: Display,
    I: IntoIterator<Item = Vec<T>>,
{
    let mut wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)?;
    for row in rows {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads every record of a tab-separated numeric file. Rows may differ in
/// length; shape checks are left to the caller.
pub fn read_table<T>(path: &Path) -> SsResult<Vec<Vec<T>>>
where
    T: FromStr,
    T::Err: Display,
{
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_path(path)?;

    let mut out = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let row = record
            .iter()
            .map(|field| {
                field.trim().parse::<T>().map_err(|e| {
                    ScatterError::WarmStart(format!(
                        "{}: row {}: cannot parse '{}': {}",
                        path.display(),
                        line + 1,
                        field,
                        e
                    ))
                })
            })
            .collect::<SsResult<Vec<T>>>()?;
        out.push(row);
    }
    Ok(out)
}

/// Reads exactly `rows` records of exactly `cols` values each.
pub fn read_rows<T>(path: &Path, rows: usize, cols: usize) -> SsResult<Vec<Vec<T>>>
where
    T: FromStr,
    T::Err: Display,
{
    let table = read_table(path)?;
    if let Some((line, row)) = table.iter().enumerate().find(|(_, r)| r.len() != cols) {
        return Err(ScatterError::WarmStart(format!(
            "{}: row {} has {} columns, expected {}",
            path.display(),
            line + 1,
            row.len(),
            cols
        )));
    }
    if table.len() != rows {
        return Err(ScatterError::WarmStart(format!(
            "{}: found {} rows, expected {}",
            path.display(),
            table.len(),
            rows
        )));
    }
    Ok(table)
}
