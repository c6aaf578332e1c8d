use crate::config::LocalSearchParams;
use crate::objective::{evaluate_checked, EvalError, Objective};
use crate::rng::RandomSource;
use crate::set::{Individual, ReferenceSet};
use crate::space::SearchSpace;
use argmin::core::{CostFunction, Error as ArgminError, Executor};
use argmin::solver::neldermead::NelderMead;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::debug;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ValueEnum,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum LocalSearchMethod {
    NelderMead,
    HillClimbing,
}

/// Result of a local minimization. The point is always inside the bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalOutcome {
    pub params: Vec<f64>,
    pub cost: f64,
}

/// Bounded local minimizer used to polish Reference Set members.
///
/// `Ok(None)` means the optimizer produced nothing usable; the caller keeps
/// the starting point. Objective failures are returned as errors.
pub trait LocalOptimizer: Send + Sync {
    fn minimize(
        &self,
        start: &[f64],
        space: &SearchSpace,
        objective: &dyn Objective,
    ) -> Result<Option<LocalOutcome>, EvalError>;
}

/// Nelder-Mead simplex search backed by `argmin`.
#[derive(Debug, Clone, PartialEq)]
pub struct NelderMeadOptimizer {
    pub initial_step: f64,
    pub tolerance: f64,
    pub max_iters: u64,
}

impl NelderMeadOptimizer {
    pub fn from_params(params: &LocalSearchParams) -> Self {
        Self {
            initial_step: params.simplex_step,
            tolerance: params.simplex_tolerance,
            max_iters: params.max_no_improve as u64,
        }
    }

    /// The start point plus one vertex per dimension, stepped up or, when
    /// that would leave the box, down.
    fn initial_simplex(&self, start: &[f64], space: &SearchSpace) -> Vec<Vec<f64>> {
        let mut simplex = vec![start.to_vec()];
        for i in 0..start.len() {
            let (lo, hi) = space.bounds(i);
            let mut vertex = start.to_vec();
            vertex[i] = if start[i] + self.initial_step <= hi {
                start[i] + self.initial_step
            } else {
                (start[i] - self.initial_step).max(lo)
            };
            simplex.push(vertex);
        }
        simplex
    }
}

struct BoundedProblem<'a> {
    objective: &'a dyn Objective,
    space: &'a SearchSpace,
    failure: &'a Mutex<Option<EvalError>>,
}

impl CostFunction for BoundedProblem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    /// Never fails towards argmin: a failed evaluation is parked in
    /// `failure` and reported as `+inf`, and every later call short-circuits.
    fn cost(&self, param: &Self::Param) -> Result<Self::Output, ArgminError> {
        let Ok(mut slot) = self.failure.lock() else {
            return Ok(f64::INFINITY);
        };
        if slot.is_some() {
            return Ok(f64::INFINITY);
        }
        let inside = self.space.clamped(param);
        match evaluate_checked(self.objective, &inside) {
            Ok(cost) => Ok(cost),
            Err(e) => {
                *slot = Some(e);
                Ok(f64::INFINITY)
            }
        }
    }
}

impl LocalOptimizer for NelderMeadOptimizer {
    fn minimize(
        &self,
        start: &[f64],
        space: &SearchSpace,
        objective: &dyn Objective,
    ) -> Result<Option<LocalOutcome>, EvalError> {
        let failure = Mutex::new(None);
        let problem = BoundedProblem {
            objective,
            space,
            failure: &failure,
        };

        let solver = match NelderMead::new(self.initial_simplex(start, space))
            .with_sd_tolerance(self.tolerance)
        {
            Ok(solver) => solver,
            Err(e) => {
                debug!("Nelder-Mead setup rejected: {}", e);
                return Ok(None);
            }
        };

        let max_iters = self.max_iters;
        let run = Executor::new(problem, solver)
            .configure(|state| state.max_iters(max_iters))
            .run();

        let best = match run {
            Ok(res) => res.state.best_param.map(|p| LocalOutcome {
                params: space.clamped(&p),
                cost: res.state.best_cost,
            }),
            Err(e) => {
                debug!("Nelder-Mead stopped without a result: {}", e);
                None
            }
        };

        if let Some(err) = failure.lock().ok().and_then(|mut slot| slot.take()) {
            return Err(err);
        }
        Ok(best.filter(|out| out.cost.is_finite()))
    }
}

/// Stochastic hill climbing: up to `max_attempts` uniform steps within
/// `±step` of the current point (clamped to the box), keeping strict
/// improvements only.
pub fn hill_climb(
    start: &Individual,
    step: f64,
    max_attempts: usize,
    space: &SearchSpace,
    objective: &dyn Objective,
    rng: &mut dyn RandomSource,
) -> Result<Individual, EvalError> {
    let mut current = start.clone();
    for _ in 0..max_attempts {
        let trial: Vec<f64> = current
            .params
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let (lo, hi) = space.bounds(i);
                rng.uniform((x - step).max(lo), (x + step).min(hi))
            })
            .collect();
        let cost = evaluate_checked(objective, &trial)?;
        if cost < current.cost {
            current = current.moved_to(trial, cost);
        }
    }
    Ok(current)
}

/// Decides which Reference Set members are worth a local search.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementGate {
    pub filter_good_enough: bool,
    pub good_enough_score_diff: f64,
    pub target_solution: f64,
    pub filter_different_enough: bool,
    pub different_enough_param_dist: f64,
    pub different_cost_margin: f64,
}

impl From<&LocalSearchParams> for RefinementGate {
    fn from(params: &LocalSearchParams) -> Self {
        Self {
            filter_good_enough: params.filter_good_enough,
            good_enough_score_diff: params.good_enough_score_diff,
            target_solution: params.target_solution,
            filter_different_enough: params.filter_different_enough,
            different_enough_param_dist: params.different_enough_param_dist,
            different_cost_margin: params.different_cost_margin,
        }
    }
}

impl RefinementGate {
    pub fn is_good_enough(&self, cost: f64) -> bool {
        (cost - self.target_solution).abs() < self.good_enough_score_diff
    }

    /// Far from its nearest neighbour in parameters, and strictly outside
    /// `c ± margin·c` of that neighbour's cost `c`. The margin carries the
    /// sign of `c`.
    pub fn is_different_enough(&self, ref_set: &ReferenceSet, index: usize) -> bool {
        let Some((closest, distance)) = ref_set.closest_member(index) else {
            return true;
        };
        let cost = ref_set.get(index).cost;
        let c = ref_set.get(closest).cost;
        let margin = self.different_cost_margin * c;
        distance > self.different_enough_param_dist && (cost > c + margin || cost < c - margin)
    }

    /// Both filters on: both must pass. One on: it decides. None on:
    /// nothing is refined.
    pub fn admits(&self, ref_set: &ReferenceSet, index: usize) -> bool {
        match (self.filter_good_enough, self.filter_different_enough) {
            (true, true) => {
                self.is_good_enough(ref_set.get(index).cost)
                    && self.is_different_enough(ref_set, index)
            }
            (true, false) => self.is_good_enough(ref_set.get(index).cost),
            (false, true) => self.is_different_enough(ref_set, index),
            (false, false) => false,
        }
    }
}

pub struct Refiner<'a> {
    pub gate: &'a RefinementGate,
    pub method: LocalSearchMethod,
    pub optimizer: &'a dyn LocalOptimizer,
    pub step_size: f64,
    pub max_no_improve: usize,
}

impl Refiner<'_> {
    /// Refines every admitted member in place. Order is not restored here.
    /// Returns how many members were refined.
    pub fn refine_set(
        &self,
        ref_set: &mut ReferenceSet,
        space: &SearchSpace,
        objective: &dyn Objective,
        rng: &mut dyn RandomSource,
    ) -> Result<u64, EvalError> {
        let mut refined = 0;
        for index in 0..ref_set.len() {
            if !self.gate.admits(ref_set, index) {
                continue;
            }
            let member = ref_set.get(index);
            let improved = match self.method {
                LocalSearchMethod::NelderMead => self
                    .optimizer
                    .minimize(&member.params, space, objective)?
                    .filter(|out| out.cost < member.cost)
                    .map(|out| member.moved_to(out.params, out.cost)),
                LocalSearchMethod::HillClimbing => {
                    let climbed = hill_climb(
                        member,
                        self.step_size,
                        self.max_no_improve,
                        space,
                        objective,
                        rng,
                    )?;
                    (climbed.cost < member.cost).then_some(climbed)
                }
            };
            if let Some(better) = improved {
                ref_set.set_unsorted(index, better);
            }
            refined += 1;
        }
        Ok(refined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::FastRandom;

    fn gate() -> RefinementGate {
        RefinementGate {
            filter_good_enough: false,
            good_enough_score_diff: 1.0,
            target_solution: 0.0,
            filter_different_enough: false,
            different_enough_param_dist: 0.5,
            different_cost_margin: 0.1,
        }
    }

    fn spaced_set() -> ReferenceSet {
        ReferenceSet::new(vec![
            Individual::with_cost(vec![0.0], 0.5),
            Individual::with_cost(vec![0.1], 0.52),
            Individual::with_cost(vec![3.0], 4.0),
        ])
        .unwrap()
    }

    #[test]
    fn no_filters_refine_nothing() {
        let rs = spaced_set();
        assert!((0..3).all(|i| !gate().admits(&rs, i)));
    }

    #[test]
    fn good_enough_alone() {
        let g = RefinementGate {
            filter_good_enough: true,
            ..gate()
        };
        let rs = spaced_set();
        assert!(g.admits(&rs, 0));
        assert!(!g.admits(&rs, 2));
    }

    #[test]
    fn both_filters_must_pass() {
        let g = RefinementGate {
            filter_good_enough: true,
            filter_different_enough: true,
            ..gate()
        };
        let rs = spaced_set();
        // member 0 is good but crowded by member 1
        assert!(!g.admits(&rs, 0));
        // member 2 is isolated but not good
        assert!(!g.admits(&rs, 2));
        let isolated = RefinementGate {
            filter_good_enough: false,
            ..g
        };
        assert!(isolated.admits(&rs, 2));
    }

    #[test]
    fn nelder_mead_finds_bowl_minimum() {
        let space = SearchSpace::uniform(2, -5.0, 5.0).unwrap();
        let objective = |x: &[f64]| (x[0] - 1.0).powi(2) + (x[1] + 2.0).powi(2);
        let nm = NelderMeadOptimizer {
            initial_step: 0.5,
            tolerance: 1e-10,
            max_iters: 500,
        };
        let out = nm.minimize(&[3.0, 3.0], &space, &objective).unwrap().unwrap();
        assert!(out.cost < 1e-6);
        assert!((out.params[0] - 1.0).abs() < 1e-2);
    }

    #[test]
    fn nelder_mead_surfaces_objective_failure() {
        let space = SearchSpace::uniform(1, -1.0, 1.0).unwrap();
        let objective = |_: &[f64]| f64::NAN;
        let nm = NelderMeadOptimizer {
            initial_step: 0.1,
            tolerance: 1e-3,
            max_iters: 10,
        };
        let counted = crate::optimizer::CountedObjective::new(objective);
        assert!(nm.minimize(&[0.0], &space, &counted).is_err());
    }

    #[test]
    fn nelder_mead_returns_failure_raised_mid_simplex() {
        use crate::objective::Fallible;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let space = SearchSpace::uniform(3, -2.0, 2.0).unwrap();
        let calls = AtomicUsize::new(0);
        let objective = Fallible(|x: &[f64]| {
            if calls.fetch_add(1, Ordering::SeqCst) >= 2 {
                Err(EvalError::Failed("solver diverged".to_string()))
            } else {
                Ok(x.iter().map(|v| v * v).sum())
            }
        });
        let nm = NelderMeadOptimizer {
            initial_step: 0.1,
            tolerance: 1e-6,
            max_iters: 50,
        };
        let err = nm.minimize(&[1.0, 1.0, 1.0], &space, &objective).unwrap_err();
        assert_eq!(err, EvalError::Failed("solver diverged".to_string()));
        // Calls stop once the failure is parked.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn zero_margin_skips_equal_costs() {
        let g = RefinementGate {
            filter_different_enough: true,
            different_cost_margin: 0.0,
            ..gate()
        };
        let rs = ReferenceSet::new(vec![
            Individual::with_cost(vec![0.0], 2.0),
            Individual::with_cost(vec![3.0], 2.0),
            Individual::with_cost(vec![9.0], 2.5),
        ])
        .unwrap();
        assert!(!g.admits(&rs, 0));
        assert!(!g.admits(&rs, 1));
        assert!(g.admits(&rs, 2));
    }

    #[test]
    fn negative_cost_margin_follows_cost_sign() {
        let g = RefinementGate {
            filter_different_enough: true,
            ..gate()
        };
        let pair = |c: f64| {
            ReferenceSet::new(vec![
                Individual::with_cost(vec![0.0], c),
                Individual::with_cost(vec![2.0], c),
            ])
            .unwrap()
        };
        // c = 10: equal costs sit inside (9, 11).
        assert!(!g.is_different_enough(&pair(10.0), 0));
        // c = -10: margin·c = -1 inverts the window, so every cost is outside.
        assert!(g.is_different_enough(&pair(-10.0), 0));
    }

    #[test]
    fn refined_member_keeps_cost_history() {
        let space = SearchSpace::uniform(1, -5.0, 5.0).unwrap();
        let objective = |x: &[f64]| x[0] * x[0];
        let mut rs = ReferenceSet::new(vec![
            Individual::with_cost(vec![2.0], 4.0),
            Individual::with_cost(vec![-3.0], 9.0),
        ])
        .unwrap();
        let g = RefinementGate {
            filter_good_enough: true,
            good_enough_score_diff: 100.0,
            ..gate()
        };
        let nm = NelderMeadOptimizer {
            initial_step: 0.5,
            tolerance: 1e-8,
            max_iters: 200,
        };
        let refiner = Refiner {
            gate: &g,
            method: LocalSearchMethod::NelderMead,
            optimizer: &nm,
            step_size: 0.1,
            max_no_improve: 10,
        };
        let mut rng = FastRandom::seeded(1);
        let refined = refiner.refine_set(&mut rs, &space, &objective, &mut rng).unwrap();
        assert_eq!(refined, 2);
        for m in rs.members() {
            assert!(m.cost < 1e-3);
            assert_eq!(m.stats.samples, 2);
            assert!(m.stats.variance() > 0.0);
        }
    }

    #[test]
    fn hill_climb_never_worsens_and_respects_bounds() {
        let space = SearchSpace::uniform(2, 0.0, 1.0).unwrap();
        let objective = |x: &[f64]| x[0] + x[1];
        let start = Individual::with_cost(vec![0.95, 0.95], 1.9);
        let mut rng = FastRandom::seeded(2);
        let out = hill_climb(&start, 0.2, 50, &space, &objective, &mut rng).unwrap();
        assert!(out.cost <= start.cost);
        assert!(space.contains(&out.params));
    }
}
