use crate::error::{ScatterError, SsResult};
use serde::{Deserialize, Serialize};

/// Box bounds of the search, one `[lower, upper]` pair per parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl SearchSpace {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> SsResult<Self> {
        if lower.is_empty() {
            return Err(ScatterError::Config(
                "search space needs at least one dimension".to_string(),
            ));
        }
        if lower.len() != upper.len() {
            return Err(ScatterError::Config(format!(
                "bounds length mismatch: {} lower vs {} upper",
                lower.len(),
                upper.len()
            )));
        }
        for (i, (&lo, &hi)) in lower.iter().zip(&upper).enumerate() {
            if !lo.is_finite() || !hi.is_finite() {
                return Err(ScatterError::Config(format!(
                    "bounds of dimension {} are not finite",
                    i
                )));
            }
            if lo > hi {
                return Err(ScatterError::Config(format!(
                    "dimension {}: lower bound {} exceeds upper bound {}",
                    i, lo, hi
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    pub fn from_bounds(bounds: &[(f64, f64)]) -> SsResult<Self> {
        let (lower, upper) = bounds.iter().copied().unzip();
        Self::new(lower, upper)
    }

    /// Same `[lower, upper]` interval repeated for every dimension.
    pub fn uniform(dim: usize, lower: f64, upper: f64) -> SsResult<Self> {
        Self::new(vec![lower; dim], vec![upper; dim])
    }

    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn bounds(&self, i: usize) -> (f64, f64) {
        (self.lower[i], self.upper[i])
    }

    pub fn clamp(&self, params: &mut [f64]) {
        for (x, (&lo, &hi)) in params.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
            *x = x.clamp(lo, hi);
        }
    }

    pub fn clamped(&self, params: &[f64]) -> Vec<f64> {
        let mut out = params.to_vec();
        self.clamp(&mut out);
        out
    }

    pub fn contains(&self, params: &[f64]) -> bool {
        params.len() == self.dim()
            && params
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(&x, (&lo, &hi))| x >= lo && x <= hi)
    }
}
