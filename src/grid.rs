use crate::error::{ScatterError, SsResult};
use crate::rng::RandomSource;
use crate::space::SearchSpace;

/// Per-dimension partition of the search space into `p` equal-width
/// sub-regions, with visit counts biasing future draws toward the
/// sub-regions sampled least.
#[derive(Debug, Clone, PartialEq)]
pub struct SubRegionGrid {
    /// Sub-region edges, `dim` rows of `p + 1` values.
    edges: Vec<Vec<f64>>,
    frequencies: Vec<Vec<u64>>,
    probabilities: Vec<Vec<f64>>,
}

impl SubRegionGrid {
    pub fn new(space: &SearchSpace, p: usize) -> SsResult<Self> {
        if p == 0 {
            return Err(ScatterError::Config(
                "sub-region count must be at least 1".to_string(),
            ));
        }
        let edges = (0..space.dim())
            .map(|i| {
                let (lo, hi) = space.bounds(i);
                let width = (hi - lo) / p as f64;
                let mut row: Vec<f64> = (0..p).map(|k| lo + k as f64 * width).collect();
                row.push(hi);
                row
            })
            .collect();
        Ok(Self {
            edges,
            frequencies: vec![vec![1; p]; space.dim()],
            probabilities: vec![vec![1.0 / p as f64; p]; space.dim()],
        })
    }

    /// Rebuilds a grid from persisted matrices, e.g. for a warm start.
    pub fn from_matrices(
        space: &SearchSpace,
        frequencies: Vec<Vec<u64>>,
        probabilities: Vec<Vec<f64>>,
    ) -> SsResult<Self> {
        let p = frequencies.first().map(|r| r.len()).unwrap_or(0);
        let mut grid = Self::new(space, p)?;
        if frequencies.len() != space.dim() || probabilities.len() != space.dim() {
            return Err(ScatterError::WarmStart(format!(
                "matrices have {} / {} rows, expected {}",
                frequencies.len(),
                probabilities.len(),
                space.dim()
            )));
        }
        let ragged = frequencies.iter().any(|r| r.len() != p)
            || probabilities.iter().any(|r| r.len() != p);
        if ragged {
            return Err(ScatterError::WarmStart(format!(
                "every matrix row must have {} columns",
                p
            )));
        }
        if frequencies.iter().flatten().any(|&f| f == 0) {
            return Err(ScatterError::WarmStart(
                "frequency counts must be positive".to_string(),
            ));
        }
        grid.frequencies = frequencies;
        grid.probabilities = probabilities;
        Ok(grid)
    }

    pub fn dim(&self) -> usize {
        self.edges.len()
    }

    pub fn sub_regions(&self) -> usize {
        self.frequencies[0].len()
    }

    pub fn frequencies(&self) -> &[Vec<u64>] {
        &self.frequencies
    }

    pub fn probabilities(&self) -> &[Vec<f64>] {
        &self.probabilities
    }

    /// `[low, high)` of sub-region `k` in dimension `i`.
    pub fn sub_region(&self, i: usize, k: usize) -> (f64, f64) {
        (self.edges[i][k], self.edges[i][k + 1])
    }

    /// Uniform draw from sub-region `k` of dimension `i`.
    pub fn sample_in(&self, i: usize, k: usize, rng: &mut dyn RandomSource) -> f64 {
        let (lo, hi) = self.sub_region(i, k);
        rng.uniform(lo, hi)
    }

    /// Walks the probability row until the running sum reaches `r`.
    pub fn pick_sub_region(&self, i: usize, r: f64) -> usize {
        let row = &self.probabilities[i];
        let mut sum = 0.0;
        for (k, &prob) in row.iter().enumerate() {
            sum += prob;
            if r <= sum {
                return k;
            }
        }
        row.len() - 1
    }

    pub fn record_visit(&mut self, i: usize, k: usize) {
        self.frequencies[i][k] += 1;
        self.refresh_probabilities(i);
    }

    /// Sub-region holding `x` in dimension `i`. The upper bound belongs to
    /// the last sub-region.
    pub fn locate(&self, i: usize, x: f64) -> Option<usize> {
        let row = &self.edges[i];
        let p = row.len() - 1;
        if x < row[0] || x > row[p] {
            return None;
        }
        Some(
            (0..p)
                .find(|&k| x < row[k + 1])
                .unwrap_or(p - 1),
        )
    }

    /// Counts a point that entered the Reference Set against every
    /// sub-region it falls in.
    pub fn track_point(&mut self, params: &[f64]) {
        for (i, &x) in params.iter().enumerate() {
            if let Some(k) = self.locate(i, x) {
                self.record_visit(i, k);
            }
        }
    }

    fn refresh_probabilities(&mut self, i: usize) {
        let total: f64 = self.frequencies[i].iter().map(|&f| 1.0 / f as f64).sum();
        for (prob, &f) in self.probabilities[i].iter_mut().zip(&self.frequencies[i]) {
            *prob = (1.0 / f as f64) / total;
        }
    }
}
