//! Scatter Search / Enhanced Scatter Search: derivative-free global
//! minimization over box-bounded real parameters.
//!
//! ```no_run
//! use scatterforge::{Config, ScatterSearch, SearchSpace, Silent};
//!
//! let space = SearchSpace::uniform(2, -5.0, 5.0)?;
//! let bowl = |x: &[f64]| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2);
//! let report = ScatterSearch::new(space, bowl, Config::default())?.run(Silent)?;
//! println!("{:?} -> {}", report.best.params, report.best.cost);
//! # Ok::<(), scatterforge::ScatterError>(())
//! ```

pub mod benchmarks;
pub mod config;
pub mod error;
pub mod grid;
pub mod objective;
pub mod optimizer;
pub mod rng;
pub mod set;
pub mod space;
pub mod warm_start;

pub use config::Config;
pub use error::{ScatterError, SsResult};
pub use objective::{EvalError, Fallible, Objective};
pub use optimizer::{
    IterationReport, ProgressCallback, RunReport, ScatterSearch, Silent, StopReason,
};
pub use set::{Individual, ReferenceSet};
pub use space::SearchSpace;
