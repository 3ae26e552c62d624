use std::io;

use thiserror::Error;

use crate::validation::FormErrors;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),

    #[error("stored value is not valid task json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("quota exceeded: value of {needed} bytes exceeds quota of {quota} bytes")]
    QuotaExceeded { needed: usize, quota: usize },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("terminal unavailable: {0}")]
    Terminal(#[source] io::Error),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid task: {0}")]
    Validation(FormErrors),
}
