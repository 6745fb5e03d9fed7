//! Linear Models Fitted with the Solvers
//!
//! Each model builds an objective closure over its training data and
//! hands it, together with a zero initial guess, to
//! [`bb_gradient_descent`](crate::smooth::bb_gradient_descent) or
//! [`prox_l1_descent`](crate::prox::prox_l1_descent). Least squares models
//! can also be fitted in closed form.
//!
//! Labels are expected in $`\{-1, 1\}`$ and predictions are
//! $`\mathrm{sign}(Xw)`$.
#![allow(non_snake_case)]

mod least_squares;
pub use least_squares::*;
mod logistic;
pub use logistic::*;
mod pca;
pub use pca::*;

use crate::error::{FitError, Result};
use ndarray::prelude::*;

/// Default budget of objective evaluations for iterative fits
pub const DEFAULT_MAX_EVALS: usize = 100;

/// Linear classifier with weights learned from labeled data
pub trait Classifier {
    /// Finds weights to fit labels `y` from the rows of `X`
    fn fit(&mut self, y: ArrayView1<f64>, X: ArrayView2<f64>) -> Result<()>;

    /// Learned weights, `None` before the first successful fit
    fn weights(&self) -> Option<ArrayView1<f64>>;

    /// Predicted labels, `sign(X w)`
    fn predict(&self, X: ArrayView2<f64>) -> Result<Array1<f64>> {
        let w = self.weights().ok_or(FitError::NotFitted)?;
        if X.ncols() != w.len() {
            return Err(FitError::FeatureMismatch {
                expected: w.len(),
                found: X.ncols(),
            });
        }
        Ok(X.dot(&w).mapv(sign))
    }
}

/// Adds `lambda / 2 * ||w||^2` to an objective
pub fn l2_regularized<'a>(
    objective: impl Fn(ArrayView1<f64>) -> (f64, Array1<f64>) + 'a,
    lambda: f64,
) -> impl Fn(ArrayView1<f64>) -> (f64, Array1<f64>) + 'a {
    move |w: ArrayView1<f64>| {
        let (f, g) = objective(w);
        (f + lambda / 2. * w.dot(&w), g + &w * lambda)
    }
}

/// Sign with `sign(0) = 0`
pub(crate) fn sign(v: f64) -> f64 {
    if v > 0. {
        1.
    } else if v < 0. {
        -1.
    } else {
        0.
    }
}

/// Rejects labels and design matrices of different lengths
pub(crate) fn check_labels(y: &ArrayView1<f64>, X: &ArrayView2<f64>) -> Result<()> {
    if y.len() != X.nrows() {
        return Err(FitError::ShapeMismatch {
            rows: X.nrows(),
            labels: y.len(),
        });
    }
    if X.nrows() == 0 {
        return Err(FitError::EmptyData);
    }
    Ok(())
}
