use crate::error::{ScatterError, SsResult};
use serde::{Deserialize, Serialize};

/// Running mean/variance of the costs recorded for one individual and the
/// points local search moved it through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostStats {
    pub samples: u64,
    pub mean: f64,
    m2: f64,
}

impl CostStats {
    pub fn push(&mut self, cost: f64) {
        self.samples += 1;
        let delta = cost - self.mean;
        self.mean += delta / self.samples as f64;
        self.m2 += delta * (cost - self.mean);
    }

    /// Sample variance, zero until two costs have been recorded.
    pub fn variance(&self) -> f64 {
        if self.samples < 2 {
            0.0
        } else {
            self.m2 / (self.samples - 1) as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub params: Vec<f64>,
    pub cost: f64,
    #[serde(default)]
    pub stats: CostStats,
}

impl Individual {
    /// A point that has not been evaluated yet. Its cost is `+inf`.
    pub fn new(params: Vec<f64>) -> Self {
        Self {
            params,
            cost: f64::INFINITY,
            stats: CostStats::default(),
        }
    }

    pub fn with_cost(params: Vec<f64>, cost: f64) -> Self {
        let mut ind = Self::new(params);
        ind.record_cost(cost);
        ind
    }

    /// The point a local search moved this individual to. Cost statistics
    /// carry over, so they cover the whole refinement lineage.
    pub fn moved_to(&self, params: Vec<f64>, cost: f64) -> Self {
        let mut ind = Self {
            params,
            cost: f64::INFINITY,
            stats: self.stats,
        };
        ind.record_cost(cost);
        ind
    }

    pub fn record_cost(&mut self, cost: f64) {
        self.cost = cost;
        self.stats.push(cost);
    }

    pub fn dim(&self) -> usize {
        self.params.len()
    }

    pub fn distance_to(&self, other: &Individual) -> f64 {
        euclidean_distance(&self.params, &other.params)
    }
}

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Stable ascending sort by cost.
pub fn sort_by_cost(set: &mut [Individual]) {
    set.sort_by(|a, b| a.cost.total_cmp(&b.cost));
}

pub fn is_sorted_by_cost(set: &[Individual]) -> bool {
    set.windows(2).all(|w| w[0].cost <= w[1].cost)
}

/// The Reference Set: a fixed-size population kept sorted ascending by cost.
///
/// Index 0 is always the best member and the last index the worst. Every
/// mutation either preserves the order itself or leaves it to an explicit
/// [`ReferenceSet::sort`] call by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSet {
    members: Vec<Individual>,
}

impl ReferenceSet {
    pub fn new(mut members: Vec<Individual>) -> SsResult<Self> {
        if members.is_empty() {
            return Err(ScatterError::Config(
                "reference set cannot be empty".to_string(),
            ));
        }
        let dim = members[0].dim();
        if let Some(bad) = members.iter().position(|m| m.dim() != dim) {
            return Err(ScatterError::Config(format!(
                "reference set member {} has {} parameters, expected {}",
                bad,
                members[bad].dim(),
                dim
            )));
        }
        sort_by_cost(&mut members);
        Ok(Self { members })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.members[0].dim()
    }

    pub fn members(&self) -> &[Individual] {
        &self.members
    }

    pub fn get(&self, index: usize) -> &Individual {
        &self.members[index]
    }

    pub fn best(&self) -> &Individual {
        &self.members[0]
    }

    pub fn worst(&self) -> &Individual {
        &self.members[self.members.len() - 1]
    }

    pub fn into_members(self) -> Vec<Individual> {
        self.members
    }

    pub fn sort(&mut self) {
        sort_by_cost(&mut self.members);
    }

    pub fn is_sorted(&self) -> bool {
        is_sorted_by_cost(&self.members)
    }

    /// Puts `ind` at `index` and moves it to its sorted position. Only one
    /// element is out of place, so an insertion pass in either direction is
    /// enough. Returns the final index.
    pub fn replace(&mut self, index: usize, ind: Individual) -> usize {
        self.members[index] = ind;
        let mut i = index;
        while i > 0 && self.members[i].cost < self.members[i - 1].cost {
            self.members.swap(i, i - 1);
            i -= 1;
        }
        while i + 1 < self.members.len() && self.members[i].cost > self.members[i + 1].cost {
            self.members.swap(i, i + 1);
            i += 1;
        }
        i
    }

    /// Overwrites a slot without restoring order. Callers re-sort afterwards.
    pub fn set_unsorted(&mut self, index: usize, ind: Individual) {
        self.members[index] = ind;
    }

    /// Last member (scanning from the worst end) closer than `epsilon` to
    /// `params`.
    pub fn find_duplicate(&self, params: &[f64], epsilon: f64) -> Option<usize> {
        self.members
            .iter()
            .rposition(|m| euclidean_distance(&m.params, params) < epsilon)
    }

    /// Nearest other member of `index`, ties going to the lowest index.
    pub fn closest_member(&self, index: usize) -> Option<(usize, f64)> {
        let target = &self.members[index].params;
        let mut best: Option<(usize, f64)> = None;
        for (i, m) in self.members.iter().enumerate() {
            if i == index {
                continue;
            }
            let d = euclidean_distance(target, &m.params);
            match best {
                Some((_, min)) if d >= min => {}
                _ => best = Some((i, d)),
            }
        }
        best
    }

    pub fn spread(&self) -> f64 {
        (self.worst().cost - self.best().cost).abs()
    }

    pub fn mean_cost(&self) -> f64 {
        self.members.iter().map(|m| m.cost).sum::<f64>() / self.members.len() as f64
    }

    /// Sample variance of member costs.
    pub fn cost_variance(&self) -> f64 {
        let n = self.members.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean_cost();
        self.members
            .iter()
            .map(|m| (m.cost - mean) * (m.cost - mean))
            .sum::<f64>()
            / (n - 1) as f64
    }
}
