pub mod initialization;
pub mod local_search;
pub mod recombination;
pub mod regeneration;
pub mod runner;
pub mod update;

pub use self::runner::{
    IterationReport, ProgressCallback, RunPhase, RunReport, ScatterSearch, Silent, StopReason,
};

use crate::objective::{evaluate_checked, EvalError, Objective};
use crate::set::Individual;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub evaluations: u64,
    pub replacements: u64,
    pub duplicates: u64,
    pub duplicates_replaced: u64,
    pub flatzones: u64,
    pub local_searches: u64,
    pub regenerations: u64,
}

impl RunCounters {
    pub fn since(&self, earlier: &RunCounters) -> RunCounters {
        RunCounters {
            evaluations: self.evaluations.saturating_sub(earlier.evaluations),
            replacements: self.replacements.saturating_sub(earlier.replacements),
            duplicates: self.duplicates.saturating_sub(earlier.duplicates),
            duplicates_replaced: self
                .duplicates_replaced
                .saturating_sub(earlier.duplicates_replaced),
            flatzones: self.flatzones.saturating_sub(earlier.flatzones),
            local_searches: self.local_searches.saturating_sub(earlier.local_searches),
            regenerations: self.regenerations.saturating_sub(earlier.regenerations),
        }
    }
}

/// Wraps the user objective, counting every call and rejecting NaN.
/// The counter is atomic so parallel evaluation needs no extra bookkeeping.
pub struct CountedObjective<O> {
    inner: O,
    calls: AtomicU64,
}

impl<O: Objective> CountedObjective<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl<O: Objective> Objective for CountedObjective<O> {
    fn evaluate(&self, params: &[f64]) -> Result<f64, EvalError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        evaluate_checked(&self.inner, params)
    }
}

/// Evaluates every member of `set`. Candidates are independent, so with
/// `parallel` the work is spread over the rayon pool and joined before
/// returning. The first failure aborts the batch.
pub fn evaluate_all(
    objective: &dyn Objective,
    set: &mut [Individual],
    parallel: bool,
) -> Result<(), EvalError> {
    let eval_one = |ind: &mut Individual| -> Result<(), EvalError> {
        let cost = objective.evaluate(&ind.params)?;
        ind.record_cost(cost);
        Ok(())
    };

    if parallel {
        set.par_iter_mut().try_for_each(eval_one)
    } else {
        set.iter_mut().try_for_each(eval_one)
    }
}
