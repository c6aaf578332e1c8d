use super::initialization::build_scatter_set;
use crate::grid::SubRegionGrid;
use crate::objective::{EvalError, Objective};
use crate::rng::RandomSource;
use crate::set::ReferenceSet;

/// Share of duplicate candidates since the last report above which the
/// Reference Set counts as stagnated.
pub const DUPLICATE_RATIO_TRIGGER: f64 = 0.7;

pub struct RegenerationRequest<'a> {
    pub grid: &'a mut SubRegionGrid,
    pub scatter_set_size: usize,
    pub max_elite: usize,
    pub track_frequencies: bool,
}

/// Decides whether iteration `iteration` regenerates.
pub fn should_regenerate(
    iteration: usize,
    regen_freq: usize,
    duplicates_since_report: u64,
    candidate_count: usize,
) -> bool {
    if iteration == 1 {
        return false;
    }
    let ratio = if candidate_count == 0 {
        1.0
    } else {
        duplicates_since_report as f64 / candidate_count as f64
    };
    ratio > DUPLICATE_RATIO_TRIGGER || iteration % regen_freq == 0
}

fn direction(from: &[f64], to: &[f64]) -> Vec<f64> {
    from.iter().zip(to).map(|(a, b)| a - b).collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Rebuilds slots `max_elite..len` from a fresh Scatter Set.
///
/// For slot `k` every pool point `s` is projected on the directions from
/// the best member to members `1..=k`; the point whose largest projection
/// is smallest wins (first on ties), is evaluated and installed at `k`.
/// The elite slots are left alone. The set is not re-sorted here.
///
/// Returns the number of slots rebuilt.
pub fn regenerate(
    ref_set: &mut ReferenceSet,
    request: RegenerationRequest<'_>,
    objective: &dyn Objective,
    rng: &mut dyn RandomSource,
) -> Result<usize, EvalError> {
    let mut pool = build_scatter_set(request.grid, request.scatter_set_size, rng);
    let best = ref_set.best().params.clone();
    let mut rebuilt = 0;

    for k in request.max_elite..ref_set.len() {
        if pool.is_empty() {
            break;
        }
        let columns: Vec<Vec<f64>> = (1..=k)
            .map(|j| direction(&best, &ref_set.get(j).params))
            .collect();

        let mut pick = 0;
        let mut pick_score = f64::INFINITY;
        for (idx, cand) in pool.iter().enumerate() {
            let toward = direction(&best, &cand.params);
            let score = columns
                .iter()
                .map(|col| dot(&toward, col))
                .fold(f64::NEG_INFINITY, f64::max);
            if score < pick_score {
                pick_score = score;
                pick = idx;
            }
        }

        // Order-preserving removal keeps tie-breaking on draw order.
        let mut chosen = pool.remove(pick);
        let cost = objective.evaluate(&chosen.params)?;
        chosen.record_cost(cost);
        if request.track_frequencies {
            request.grid.track_point(&chosen.params);
        }
        ref_set.set_unsorted(k, chosen);
        rebuilt += 1;
    }

    Ok(rebuilt)
}
