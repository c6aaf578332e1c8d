use super::initialization::{build_reference_set, build_scatter_set};
use super::local_search::{LocalOptimizer, NelderMeadOptimizer, RefinementGate, Refiner};
use super::recombination::{generate_candidates, select_pairs};
use super::regeneration::{regenerate, should_regenerate, RegenerationRequest};
use super::update::{update_reference_set, UpdatePolicy};
use super::{evaluate_all, CountedObjective, RunCounters};
use crate::config::{Config, SetSizes};
use crate::error::{ScatterError, SsResult};
use crate::grid::SubRegionGrid;
use crate::objective::Objective;
use crate::rng::{FastRandom, RandomSource};
use crate::set::{Individual, ReferenceSet};
use crate::space::SearchSpace;
use crate::warm_start::{self, WarmStartPaths, WarmStartState};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunPhase {
    Uninitialized,
    Initializing,
    Iterating,
    Converged,
    Exhausted,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Iteration budget used up.
    MaxIterations,
    /// Best and worst Reference Set costs closer than the stop criterion.
    Converged,
    TimeLimit,
    /// A progress callback asked to stop.
    Cancelled,
}

impl StopReason {
    fn phase(self) -> RunPhase {
        match self {
            StopReason::Converged => RunPhase::Converged,
            _ => RunPhase::Exhausted,
        }
    }
}

/// Snapshot emitted every `report_interval` iterations. Counter fields are
/// deltas since the previous report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationReport {
    pub iteration: usize,
    pub evaluations: u64,
    pub best_cost: f64,
    pub mean_cost: f64,
    pub cost_variance: f64,
    pub replacements: u64,
    pub local_searches: u64,
    pub flatzones: u64,
    pub duplicates: u64,
    pub candidate_set_size: usize,
    pub best_params: Vec<f64>,
    pub elapsed: Duration,
}

/// Receives periodic reports. Returning `false` stops the run after the
/// current iteration.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, report: &IterationReport) -> bool;
}

impl<F> ProgressCallback for F
where
    F: Fn(&IterationReport) -> bool + Send + Sync,
{
    fn on_progress(&self, report: &IterationReport) -> bool {
        self(report)
    }
}

/// Callback that never interrupts.
pub struct Silent;

impl ProgressCallback for Silent {
    fn on_progress(&self, _report: &IterationReport) -> bool {
        true
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub best: Individual,
    pub reference_set: ReferenceSet,
    pub counters: RunCounters,
    pub iterations: usize,
    pub stop_reason: StopReason,
    pub seed: u64,
    pub elapsed: Duration,
    #[serde(skip)]
    pub grid: SubRegionGrid,
}

/// What a single call to [`ScatterSearch::iterate`] produced.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationOutcome {
    pub stop: Option<StopReason>,
    pub report: Option<IterationReport>,
}

/// The Scatter Search engine and its run state.
///
/// `run` drives the whole lifecycle. `initialize`, `iterate` and `finalize`
/// expose the same steps individually.
pub struct ScatterSearch<O: Objective> {
    config: Config,
    sizes: SetSizes,
    space: SearchSpace,
    objective: CountedObjective<O>,
    local_optimizer: Box<dyn LocalOptimizer>,
    rng: Box<dyn RandomSource>,
    seed: u64,
    grid: SubRegionGrid,
    ref_set: Option<ReferenceSet>,
    warm: Option<WarmStartState>,
    phase: RunPhase,
    counters: RunCounters,
    last_report: RunCounters,
    iteration: usize,
    stop_reason: Option<StopReason>,
    max_time: Option<Duration>,
    started: Instant,
}

impl<O: Objective> ScatterSearch<O> {
    /// Validates `config` against `space` and, when warm start is enabled,
    /// loads the saved state. All configuration errors surface here, before
    /// any evaluation.
    pub fn new(space: SearchSpace, objective: O, config: Config) -> SsResult<Self> {
        let sizes = config.resolve(space.dim())?;
        let grid = SubRegionGrid::new(&space, sizes.sub_regions)?;
        let seed = config.search.seed.unwrap_or_else(|| fastrand::u64(..));

        let warm = if config.warm_start.perform_warm_start {
            let paths = WarmStartPaths::from_params(&config.warm_start)?;
            Some(warm_start::load(&paths, &space, &sizes)?)
        } else {
            None
        };

        Ok(Self {
            local_optimizer: Box::new(NelderMeadOptimizer::from_params(&config.local)),
            rng: Box::new(FastRandom::seeded(seed)),
            config,
            sizes,
            space,
            objective: CountedObjective::new(objective),
            seed,
            grid,
            ref_set: None,
            warm,
            phase: RunPhase::Uninitialized,
            counters: RunCounters::default(),
            last_report: RunCounters::default(),
            iteration: 0,
            stop_reason: None,
            max_time: None,
            started: Instant::now(),
        })
    }

    /// Resumes from an in-memory state instead of sampling a new one.
    pub fn with_warm_start(mut self, state: WarmStartState) -> SsResult<Self> {
        if state.reference_set.len() != self.sizes.ref_set_size
            || state.reference_set.dim() != self.sizes.dim
            || state.grid.dim() != self.sizes.dim
            || state.grid.sub_regions() != self.sizes.sub_regions
        {
            return Err(ScatterError::WarmStart(format!(
                "state shape ({} members x {} dims, {} sub-regions) does not match the configuration ({} x {}, {})",
                state.reference_set.len(),
                state.reference_set.dim(),
                state.grid.sub_regions(),
                self.sizes.ref_set_size,
                self.sizes.dim,
                self.sizes.sub_regions
            )));
        }
        self.warm = Some(state);
        Ok(self)
    }

    pub fn with_rng(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_local_optimizer(mut self, optimizer: Box<dyn LocalOptimizer>) -> Self {
        self.local_optimizer = optimizer;
        self
    }

    pub fn with_max_time(mut self, limit: Duration) -> Self {
        self.max_time = Some(limit);
        self
    }

    pub fn sizes(&self) -> &SetSizes {
        &self.sizes
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn grid(&self) -> &SubRegionGrid {
        &self.grid
    }

    pub fn reference_set(&self) -> Option<&ReferenceSet> {
        self.ref_set.as_ref()
    }

    pub fn counters(&self) -> RunCounters {
        RunCounters {
            evaluations: self.objective.calls(),
            ..self.counters
        }
    }

    /// Builds the Reference Set, from the warm-start state when one was
    /// supplied, otherwise by sampling and diversifying a Scatter Set.
    pub fn initialize(&mut self) -> SsResult<()> {
        if self.phase != RunPhase::Uninitialized {
            return Ok(());
        }
        self.phase = RunPhase::Initializing;
        self.started = Instant::now();

        let ref_set = match self.warm.take() {
            Some(state) => {
                self.grid = state.grid;
                state.reference_set
            }
            None => {
                info!(
                    "🚀 Sampling {} scatter points over {} dimensions (seed {})",
                    self.sizes.scatter_set_size, self.sizes.dim, self.seed
                );
                let mut scatter = build_scatter_set(
                    &mut self.grid,
                    self.sizes.scatter_set_size,
                    self.rng.as_mut(),
                );
                evaluate_all(&self.objective, &mut scatter, self.config.search.parallel)?;
                ReferenceSet::new(build_reference_set(scatter, self.sizes.ref_set_size))?
            }
        };

        info!(
            "🧬 Reference set ready: {} members, best cost {:.6e}",
            ref_set.len(),
            ref_set.best().cost
        );
        self.ref_set = Some(ref_set);
        self.phase = RunPhase::Iterating;
        Ok(())
    }

    /// One pass of the main loop.
    pub fn iterate(&mut self) -> SsResult<IterationOutcome> {
        if self.phase == RunPhase::Uninitialized {
            self.initialize()?;
        }
        if self.phase != RunPhase::Iterating {
            return Err(ScatterError::Config(format!(
                "cannot iterate in phase {:?}",
                self.phase
            )));
        }
        let Some(ref_set) = self.ref_set.as_mut() else {
            return Err(ScatterError::Config("reference set missing".to_string()));
        };

        self.iteration += 1;
        let iter = self.iteration;

        // 1. Recombine
        let pairs = select_pairs(ref_set, self.config.update.dist_epsilon);
        let mut candidates = generate_candidates(
            ref_set,
            &pairs,
            self.sizes.max_elite,
            &self.space,
            self.rng.as_mut(),
        );
        let candidate_count = candidates.len();
        if candidates.is_empty() {
            warn!("⚠️  Iteration {}: no distinct pairs left to recombine", iter);
        }

        // 2. Evaluate (parallel join point) and update
        evaluate_all(&self.objective, &mut candidates, self.config.search.parallel)?;
        let policy = UpdatePolicy::from(&self.config.update);
        let outcome = update_reference_set(ref_set, candidates, &policy);
        self.counters.replacements += outcome.replacements;
        self.counters.duplicates += outcome.duplicates;
        self.counters.duplicates_replaced += outcome.duplicates_replaced;
        self.counters.flatzones += outcome.flatzones;
        if self.config.search.track_frequencies {
            for params in &outcome.installed {
                self.grid.track_point(params);
            }
        }

        // 3. Local search
        let local = &self.config.local;
        if local.perform_local_search && iter % local.local_search_freq == 0 {
            let gate = RefinementGate::from(local);
            let refiner = Refiner {
                gate: &gate,
                method: local.local_search_method,
                optimizer: self.local_optimizer.as_ref(),
                step_size: local.step_size,
                max_no_improve: local.max_no_improve,
            };
            let refined =
                refiner.refine_set(ref_set, &self.space, &self.objective, self.rng.as_mut())?;
            self.counters.local_searches += refined;
            ref_set.sort();
        }

        // 4. Regeneration
        let duplicates_since_report = self.counters.duplicates - self.last_report.duplicates;
        if self.config.regen.perform_ref_set_regen
            && should_regenerate(
                iter,
                self.config.regen.ref_set_regen_freq,
                duplicates_since_report,
                candidate_count,
            )
        {
            let rebuilt = regenerate(
                ref_set,
                RegenerationRequest {
                    grid: &mut self.grid,
                    scatter_set_size: self.sizes.scatter_set_size,
                    max_elite: self.sizes.max_elite,
                    track_frequencies: self.config.search.track_frequencies,
                },
                &self.objective,
                self.rng.as_mut(),
            )?;
            self.counters.regenerations += 1;
            debug!("Iteration {}: regenerated {} members", iter, rebuilt);
        }

        ref_set.sort();

        // 5. Stop checks
        let stop = if iter >= self.config.search.max_iter {
            Some(StopReason::MaxIterations)
        } else if self.config.search.perform_stop_criteria
            && ref_set.spread() < self.config.search.stop_criteria
        {
            Some(StopReason::Converged)
        } else {
            None
        };

        // 6. Statistics
        let report = if iter % self.config.search.report_interval == 0 {
            self.take_report(candidate_count)
        } else {
            None
        };

        if let Some(reason) = stop {
            self.stop_reason = Some(reason);
            self.phase = reason.phase();
        }
        Ok(IterationOutcome { stop, report })
    }

    fn take_report(&mut self, candidate_set_size: usize) -> Option<IterationReport> {
        let now = self.counters();
        let delta = now.since(&self.last_report);
        self.last_report = now;

        let ref_set = self.ref_set.as_ref()?;
        let report = IterationReport {
            iteration: self.iteration,
            evaluations: now.evaluations,
            best_cost: ref_set.best().cost,
            mean_cost: ref_set.mean_cost(),
            cost_variance: ref_set.cost_variance(),
            replacements: delta.replacements,
            local_searches: delta.local_searches,
            flatzones: delta.flatzones,
            duplicates: delta.duplicates,
            candidate_set_size,
            best_params: ref_set.best().params.clone(),
            elapsed: self.started.elapsed(),
        };
        info!(
            "Iter {:5} | Best: {:.6e} | Mean: {:.6e} | Evals: {}",
            report.iteration, report.best_cost, report.mean_cost, report.evaluations
        );
        Some(report)
    }

    /// Marks the run as stopped for a reason decided outside `iterate`.
    pub fn stop(&mut self, reason: StopReason) {
        if self.phase == RunPhase::Iterating {
            self.stop_reason = Some(reason);
            self.phase = reason.phase();
        }
    }

    /// Runs one last gated refinement pass over the whole Reference Set and
    /// hands back the results.
    pub fn finalize(mut self) -> SsResult<RunReport> {
        if self.phase == RunPhase::Uninitialized {
            self.initialize()?;
        }
        let mut ref_set = self
            .ref_set
            .take()
            .ok_or_else(|| ScatterError::Config("reference set missing".to_string()))?;

        let local = &self.config.local;
        let gate = RefinementGate::from(local);
        let refiner = Refiner {
            gate: &gate,
            method: local.local_search_method,
            optimizer: self.local_optimizer.as_ref(),
            step_size: local.step_size,
            max_no_improve: local.max_no_improve,
        };
        let refined =
            refiner.refine_set(&mut ref_set, &self.space, &self.objective, self.rng.as_mut())?;
        self.counters.local_searches += refined;
        ref_set.sort();
        self.phase = RunPhase::Finalized;

        let stop_reason = self.stop_reason.unwrap_or(StopReason::MaxIterations);
        let counters = self.counters();
        info!(
            "🏁 Finished after {} iterations ({:?}): best cost {:.6e}, {} evaluations",
            self.iteration,
            stop_reason,
            ref_set.best().cost,
            counters.evaluations
        );

        Ok(RunReport {
            best: ref_set.best().clone(),
            reference_set: ref_set,
            counters,
            iterations: self.iteration,
            stop_reason,
            seed: self.seed,
            elapsed: self.started.elapsed(),
            grid: self.grid,
        })
    }

    /// Initializes, iterates until a stop condition, and finalizes.
    pub fn run<CB: ProgressCallback>(mut self, callback: CB) -> SsResult<RunReport> {
        self.initialize()?;

        while self.phase == RunPhase::Iterating {
            if let Some(limit) = self.max_time {
                if self.started.elapsed() >= limit {
                    self.stop(StopReason::TimeLimit);
                    break;
                }
            }

            let outcome = self.iterate()?;
            if let Some(report) = &outcome.report {
                if !callback.on_progress(report) {
                    self.stop(StopReason::Cancelled);
                }
            }
        }

        self.finalize()
    }
}
