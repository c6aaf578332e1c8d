use crate::objective::EvalError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScatterError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Warm Start Error: {0}")]
    WarmStart(String),

    #[error("Objective Error: {0}")]
    Objective(#[from] EvalError),
}

pub type SsResult<T> = Result<T, ScatterError>;
