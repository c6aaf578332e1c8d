use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("objective failed: {0}")]
    Failed(String),

    #[error("objective returned NaN at {params:?}")]
    NotANumber { params: Vec<f64> },
}

/// The function being minimized. Lower cost is better.
///
/// Implemented for any `Fn(&[f64]) -> f64 + Send + Sync`, so plain closures
/// work directly. Wrap a closure returning `Result` in [`Fallible`] to report
/// failures that should abort the run.
pub trait Objective: Send + Sync {
    fn evaluate(&self, params: &[f64]) -> Result<f64, EvalError>;
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn evaluate(&self, params: &[f64]) -> Result<f64, EvalError> {
        Ok(self(params))
    }
}

pub struct Fallible<F>(pub F);

impl<F> Objective for Fallible<F>
where
    F: Fn(&[f64]) -> Result<f64, EvalError> + Send + Sync,
{
    fn evaluate(&self, params: &[f64]) -> Result<f64, EvalError> {
        (self.0)(params)
    }
}

/// Evaluates and rejects NaN, which has no place in a cost ordering.
pub fn evaluate_checked<O: Objective + ?Sized>(
    objective: &O,
    params: &[f64],
) -> Result<f64, EvalError> {
    let cost = objective.evaluate(params)?;
    if cost.is_nan() {
        return Err(EvalError::NotANumber {
            params: params.to_vec(),
        });
    }
    Ok(cost)
}
