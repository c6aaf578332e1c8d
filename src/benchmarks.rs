//! Standard test functions for exercising the optimizer.

use crate::error::SsResult;
use crate::objective::{EvalError, Objective};
use crate::space::SearchSpace;
use clap::ValueEnum;
use std::f64::consts::{E, PI};
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, EnumIter, EnumString, Display, ValueEnum, PartialEq, Eq, Hash)]
#[strum(serialize_all = "kebab-case")]
pub enum Benchmark {
    Sphere,
    /// Sphere shifted to `(2, -1, 2, -1, ...)`.
    QuadraticBowl,
    Rosenbrock,
    Rastrigin,
    Ackley,
    Griewank,
}

impl Benchmark {
    pub fn value(&self, x: &[f64]) -> f64 {
        match self {
            Benchmark::Sphere => x.iter().map(|v| v * v).sum(),
            Benchmark::QuadraticBowl => x
                .iter()
                .enumerate()
                .map(|(i, v)| (v - bowl_center(i)).powi(2))
                .sum(),
            Benchmark::Rosenbrock => x
                .windows(2)
                .map(|w| 100.0 * (w[1] - w[0] * w[0]).powi(2) + (1.0 - w[0]).powi(2))
                .sum(),
            Benchmark::Rastrigin => {
                10.0 * x.len() as f64
                    + x.iter()
                        .map(|v| v * v - 10.0 * (2.0 * PI * v).cos())
                        .sum::<f64>()
            }
            Benchmark::Ackley => {
                let n = x.len() as f64;
                let sum_sq: f64 = x.iter().map(|v| v * v).sum();
                let sum_cos: f64 = x.iter().map(|v| (2.0 * PI * v).cos()).sum();
                -20.0 * (-0.2 * (sum_sq / n).sqrt()).exp() - (sum_cos / n).exp() + 20.0 + E
            }
            Benchmark::Griewank => {
                let sum_sq: f64 = x.iter().map(|v| v * v).sum();
                let prod: f64 = x
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (v / ((i + 1) as f64).sqrt()).cos())
                    .product();
                1.0 + sum_sq / 4000.0 - prod
            }
        }
    }

    /// Customary symmetric bounds.
    pub fn default_bounds(&self) -> (f64, f64) {
        match self {
            Benchmark::Sphere | Benchmark::QuadraticBowl => (-5.0, 5.0),
            Benchmark::Rosenbrock => (-2.048, 2.048),
            Benchmark::Rastrigin => (-5.12, 5.12),
            Benchmark::Ackley => (-32.768, 32.768),
            Benchmark::Griewank => (-600.0, 600.0),
        }
    }

    pub fn search_space(&self, dim: usize) -> SsResult<SearchSpace> {
        let (lo, hi) = self.default_bounds();
        SearchSpace::uniform(dim, lo, hi)
    }

    /// Global minimizer for `dim` dimensions. The minimum value is 0 for all.
    pub fn optimum(&self, dim: usize) -> Vec<f64> {
        match self {
            Benchmark::QuadraticBowl => (0..dim).map(bowl_center).collect(),
            Benchmark::Rosenbrock => vec![1.0; dim],
            _ => vec![0.0; dim],
        }
    }
}

fn bowl_center(i: usize) -> f64 {
    if i % 2 == 0 {
        2.0
    } else {
        -1.0
    }
}

impl Objective for Benchmark {
    fn evaluate(&self, params: &[f64]) -> Result<f64, EvalError> {
        Ok(self.value(params))
    }
}
