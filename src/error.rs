//! Error types shared by the library and the command line tool.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    /// A population, chromosome or matrix buffer could not be reserved.
    #[error("Cannot allocate memory for {0}")]
    Allocation(String),
}

pub type SolverResult<T> = Result<T, SolverError>;

/// Reserves exactly `len` slots in a fresh vector, turning allocation
/// failure into [`SolverError::Allocation`].
pub(crate) fn try_vec_with_capacity<T>(len: usize, what: &str) -> SolverResult<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|e| SolverError::Allocation(format!("{} ({} items): {}", what, len, e)))?;
    Ok(buffer)
}
