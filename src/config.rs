use crate::error::{ScatterError, SsResult};
use crate::optimizer::local_search::LocalSearchMethod;
use clap::parser::ValueSource;
use clap::{ArgAction, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[command(flatten)]
    pub sets: SetParams,
    #[command(flatten)]
    pub search: SearchParams,
    #[command(flatten)]
    pub update: UpdateParams,
    #[command(flatten)]
    pub regen: RegenParams,
    #[command(flatten)]
    pub local: LocalSearchParams,
    #[command(flatten)]
    pub warm_start: WarmStartParams,
}

/// Set sizes. Unset sizes are derived from the dimension count.
#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetParams {
    #[arg(long)]
    pub ref_set_size: Option<usize>,
    #[arg(long)]
    pub scatter_set_size: Option<usize>,
    #[arg(long)]
    pub max_elite: Option<usize>,
    /// Sub-regions per dimension used for stratified sampling.
    #[arg(long, default_value_t = 4)]
    pub sub_regions: usize,
}

#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    #[arg(long, default_value_t = 1000)]
    pub max_iter: usize,
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub perform_stop_criteria: bool,
    /// Converged once best and worst Reference Set costs are closer than this.
    #[arg(long, default_value_t = 1e-6)]
    pub stop_criteria: f64,
    #[arg(short = 'S', long)]
    pub seed: Option<u64>,
    /// Evaluate candidates on the rayon pool.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub parallel: bool,
    #[arg(long, default_value_t = 10)]
    pub report_interval: usize,
    /// Count Reference Set entries against the sub-region frequencies.
    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    pub track_frequencies: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateParams {
    /// Points closer than this (Euclidean) count as duplicates.
    #[arg(long, default_value_t = 1e-6)]
    pub dist_epsilon: f64,
    /// Relative cost band used by flatzone detection.
    #[arg(long, default_value_t = 1e-3)]
    pub fitness_epsilon: f64,
    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    pub perform_flatzone_detection: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegenParams {
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub perform_ref_set_regen: bool,
    #[arg(long, default_value_t = 10)]
    pub ref_set_regen_freq: usize,
}

#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSearchParams {
    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    pub perform_local_search: bool,
    #[arg(long, default_value_t = 10)]
    pub local_search_freq: usize,
    #[arg(long, value_enum, default_value_t = LocalSearchMethod::NelderMead)]
    pub local_search_method: LocalSearchMethod,

    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    pub filter_good_enough: bool,
    #[arg(long, default_value_t = 1.0)]
    pub good_enough_score_diff: f64,
    /// Cost the "good enough" filter measures members against.
    #[arg(long, default_value_t = 0.0)]
    pub target_solution: f64,

    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    pub filter_different_enough: bool,
    #[arg(long, default_value_t = 1e-2)]
    pub different_enough_param_dist: f64,
    #[arg(long, default_value_t = 1e-2)]
    pub different_cost_margin: f64,

    /// Attempt budget for hill climbing, iteration budget for Nelder-Mead.
    #[arg(long, default_value_t = 100)]
    pub max_no_improve: usize,
    #[arg(long, default_value_t = 0.1)]
    pub step_size: f64,
    #[arg(long, default_value_t = 0.1)]
    pub simplex_step: f64,
    #[arg(long, default_value_t = 1e-3)]
    pub simplex_tolerance: f64,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmStartParams {
    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    pub perform_warm_start: bool,
    #[arg(long)]
    pub ref_set_file: Option<PathBuf>,
    #[arg(long)]
    pub freq_mat_file: Option<PathBuf>,
    #[arg(long)]
    pub prob_mat_file: Option<PathBuf>,
}

impl Default for SetParams {
    fn default() -> Self {
        Self {
            ref_set_size: None,
            scatter_set_size: None,
            max_elite: None,
            sub_regions: 4,
        }
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            perform_stop_criteria: true,
            stop_criteria: 1e-6,
            seed: None,
            parallel: true,
            report_interval: 10,
            track_frequencies: false,
        }
    }
}

impl Default for UpdateParams {
    fn default() -> Self {
        Self {
            dist_epsilon: 1e-6,
            fitness_epsilon: 1e-3,
            perform_flatzone_detection: false,
        }
    }
}

impl Default for RegenParams {
    fn default() -> Self {
        Self {
            perform_ref_set_regen: true,
            ref_set_regen_freq: 10,
        }
    }
}

impl Default for LocalSearchParams {
    fn default() -> Self {
        Self {
            perform_local_search: false,
            local_search_freq: 10,
            local_search_method: LocalSearchMethod::NelderMead,
            filter_good_enough: false,
            good_enough_score_diff: 1.0,
            target_solution: 0.0,
            filter_different_enough: false,
            different_enough_param_dist: 1e-2,
            different_cost_margin: 1e-2,
            max_no_improve: 100,
            step_size: 0.1,
            simplex_step: 0.1,
            simplex_tolerance: 1e-3,
        }
    }
}

/// Set sizes after defaults have been derived for a concrete dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSizes {
    pub dim: usize,
    pub ref_set_size: usize,
    pub scatter_set_size: usize,
    pub max_elite: usize,
    pub sub_regions: usize,
}

/// `ceil(1 + sqrt(1 + 40n) / 2)`, rounded up to even, never below 20.
pub fn default_ref_set_size(dim: usize) -> usize {
    let mut size = (1.0 + (1.0 + 40.0 * dim as f64).sqrt() / 2.0).ceil() as usize;
    if size % 2 != 0 {
        size += 1;
    }
    size.max(20)
}

pub fn default_scatter_set_size(dim: usize) -> usize {
    (10 * dim).max(40)
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> SsResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ScatterError::Config(format!(
                "cannot read config '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Derives the set sizes for `dim` parameters and checks every size
    /// relation and numeric option. Nothing runs unless this succeeds.
    pub fn resolve(&self, dim: usize) -> SsResult<SetSizes> {
        if dim == 0 {
            return Err(ScatterError::Config(
                "dimension count must be at least 1".to_string(),
            ));
        }
        let ref_set_size = self
            .sets
            .ref_set_size
            .unwrap_or_else(|| default_ref_set_size(dim));
        let scatter_set_size = self
            .sets
            .scatter_set_size
            .unwrap_or_else(|| default_scatter_set_size(dim).max(ref_set_size));
        let max_elite = self.sets.max_elite.unwrap_or(ref_set_size / 2);
        let p = self.sets.sub_regions;

        if ref_set_size < 4 || ref_set_size % 2 != 0 {
            return Err(ScatterError::Config(format!(
                "ref_set_size must be an even number of at least 4, got {}",
                ref_set_size
            )));
        }
        if max_elite == 0 || max_elite >= ref_set_size {
            return Err(ScatterError::Config(format!(
                "max_elite must lie in 1..{}, got {}",
                ref_set_size, max_elite
            )));
        }
        if p == 0 {
            return Err(ScatterError::Config(
                "sub_regions must be at least 1".to_string(),
            ));
        }
        if scatter_set_size < ref_set_size || scatter_set_size < p {
            return Err(ScatterError::Config(format!(
                "scatter_set_size ({}) must be at least ref_set_size ({}) and sub_regions ({})",
                scatter_set_size, ref_set_size, p
            )));
        }

        self.validate_options()?;

        Ok(SetSizes {
            dim,
            ref_set_size,
            scatter_set_size,
            max_elite,
            sub_regions: p,
        })
    }

    fn validate_options(&self) -> SsResult<()> {
        let positive_counts = [
            ("max_iter", self.search.max_iter),
            ("report_interval", self.search.report_interval),
            ("ref_set_regen_freq", self.regen.ref_set_regen_freq),
            ("local_search_freq", self.local.local_search_freq),
        ];
        for (name, value) in positive_counts {
            if value == 0 {
                return Err(ScatterError::Config(format!("{} must be at least 1", name)));
            }
        }

        let non_negative = [
            ("stop_criteria", self.search.stop_criteria),
            ("dist_epsilon", self.update.dist_epsilon),
            ("fitness_epsilon", self.update.fitness_epsilon),
            ("good_enough_score_diff", self.local.good_enough_score_diff),
            ("different_enough_param_dist", self.local.different_enough_param_dist),
            ("different_cost_margin", self.local.different_cost_margin),
            ("simplex_tolerance", self.local.simplex_tolerance),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ScatterError::Config(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("step_size", self.local.step_size),
            ("simplex_step", self.local.simplex_step),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ScatterError::Config(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !self.local.target_solution.is_finite() {
            return Err(ScatterError::Config(
                "target_solution must be finite".to_string(),
            ));
        }

        let ws = &self.warm_start;
        if ws.perform_warm_start
            && (ws.ref_set_file.is_none()
                || ws.freq_mat_file.is_none()
                || ws.prob_mat_file.is_none())
        {
            return Err(ScatterError::Config(
                "warm start needs ref_set_file, freq_mat_file and prob_mat_file".to_string(),
            ));
        }
        Ok(())
    }

    /// Applies only the flags the user typed on the command line on top of
    /// a file-loaded config.
    pub fn merge_from_cli(&mut self, cli: &Config, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($group:ident . $field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$group.$field = cli.$group.$field.clone();
                }
            };
        }

        update_if_present!(sets.ref_set_size);
        update_if_present!(sets.scatter_set_size);
        update_if_present!(sets.max_elite);
        update_if_present!(sets.sub_regions);

        update_if_present!(search.max_iter);
        update_if_present!(search.perform_stop_criteria);
        update_if_present!(search.stop_criteria);
        update_if_present!(search.seed);
        update_if_present!(search.parallel);
        update_if_present!(search.report_interval);
        update_if_present!(search.track_frequencies);

        update_if_present!(update.dist_epsilon);
        update_if_present!(update.fitness_epsilon);
        update_if_present!(update.perform_flatzone_detection);

        update_if_present!(regen.perform_ref_set_regen);
        update_if_present!(regen.ref_set_regen_freq);

        update_if_present!(local.perform_local_search);
        update_if_present!(local.local_search_freq);
        update_if_present!(local.local_search_method);
        update_if_present!(local.filter_good_enough);
        update_if_present!(local.good_enough_score_diff);
        update_if_present!(local.target_solution);
        update_if_present!(local.filter_different_enough);
        update_if_present!(local.different_enough_param_dist);
        update_if_present!(local.different_cost_margin);
        update_if_present!(local.max_no_improve);
        update_if_present!(local.step_size);
        update_if_present!(local.simplex_step);
        update_if_present!(local.simplex_tolerance);

        update_if_present!(warm_start.perform_warm_start);
        update_if_present!(warm_start.ref_set_file);
        update_if_present!(warm_start.freq_mat_file);
        update_if_present!(warm_start.prob_mat_file);
    }
}
