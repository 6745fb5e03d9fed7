//! Errors raised while fitting models
//!
//! The solvers themselves never fail; these come from the closed-form
//! fits and from malformed data handed to the models.

use ndarray_linalg::error::LinalgError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FitError>;

#[derive(Debug, Error)]
pub enum FitError {
    /// Singular normal equations or a failed decomposition
    #[error("linear algebra failure: {0}")]
    Linalg(#[from] LinalgError),

    #[error("design matrix has {rows} rows but {labels} labels were given")]
    ShapeMismatch { rows: usize, labels: usize },

    #[error("model was fitted on {expected} features but got {found}")]
    FeatureMismatch { expected: usize, found: usize },

    #[error("model has not been fitted")]
    NotFitted,

    #[error("cannot fit on an empty data set")]
    EmptyData,

    #[error("cannot extract {k} components from {max} features")]
    InvalidComponents { k: usize, max: usize },

    #[error("decomposition did not return the requested factor")]
    MissingFactor,
}
