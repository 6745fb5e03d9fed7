use super::{check_labels, l2_regularized, Classifier, DEFAULT_MAX_EVALS};
use crate::error::Result;
use crate::prox::{prox_l1_descent, ProxParams};
use crate::smooth::{bb_gradient_descent, nop, LineSearchParams};
use ndarray::prelude::*;
use ndarray_linalg::Solve;

/// Mean squared error objective
///
/// ```math
/// f(w) = \frac{1}{2n} \|y - Xw\|_2^2, \qquad \nabla f(w) = -\frac1n X^T(y - Xw)
/// ```
pub fn least_squares_objective<'a>(
    y: ArrayView1<'a, f64>,
    X: ArrayView2<'a, f64>,
) -> impl Fn(ArrayView1<f64>) -> (f64, Array1<f64>) + 'a {
    let n = X.nrows() as f64;
    move |w: ArrayView1<f64>| {
        let e = &y - &X.dot(&w);
        (e.dot(&e) / (2. * n), -X.t().dot(&e) / n)
    }
}

/// Solves `(X^T X + n ridge I) w = X^T y`
fn normal_equations(y: ArrayView1<f64>, X: ArrayView2<f64>, ridge: f64) -> Result<Array1<f64>> {
    let shift = X.nrows() as f64 * ridge;
    let mut A = X.t().dot(&X);
    A.diag_mut().mapv_inplace(|a| a + shift);
    let b = X.t().dot(&y);
    Ok(A.solve_into(b)?)
}

/// Ordinary least squares
#[derive(Debug, Clone)]
pub struct LeastSquares {
    pub max_evals: usize,
    w: Option<Array1<f64>>,
}

impl Default for LeastSquares {
    fn default() -> Self {
        LeastSquares::new(DEFAULT_MAX_EVALS)
    }
}

impl LeastSquares {
    pub fn new(max_evals: usize) -> Self {
        LeastSquares { max_evals, w: None }
    }

    /// Fits by Barzilai-Borwein descent rather than the normal equations,
    /// returning the final loss.
    pub fn fit_descent(&mut self, y: ArrayView1<f64>, X: ArrayView2<f64>) -> Result<f64> {
        check_labels(&y, &X)?;
        let w0 = Array1::zeros(X.ncols());
        let (w, f) = bb_gradient_descent(
            least_squares_objective(y.view(), X.view()),
            w0.view(),
            self.max_evals,
            &LineSearchParams::default(),
            nop,
        );
        self.w = Some(w);
        Ok(f)
    }
}

impl Classifier for LeastSquares {
    /// Closed-form fit; fails if `X^T X` is singular
    fn fit(&mut self, y: ArrayView1<f64>, X: ArrayView2<f64>) -> Result<()> {
        check_labels(&y, &X)?;
        self.w = Some(normal_equations(y, X, 0.)?);
        Ok(())
    }

    fn weights(&self) -> Option<ArrayView1<f64>> {
        self.w.as_ref().map(|w| w.view())
    }
}

/// Ridge regression, least squares plus `lambda / 2 * ||w||^2`
#[derive(Debug, Clone)]
pub struct LeastSquaresL2 {
    pub lambda: f64,
    pub max_evals: usize,
    w: Option<Array1<f64>>,
}

impl LeastSquaresL2 {
    pub fn new(lambda: f64) -> Self {
        LeastSquaresL2 {
            lambda,
            max_evals: DEFAULT_MAX_EVALS,
            w: None,
        }
    }

    pub fn objective<'a>(
        &self,
        y: ArrayView1<'a, f64>,
        X: ArrayView2<'a, f64>,
    ) -> impl Fn(ArrayView1<f64>) -> (f64, Array1<f64>) + 'a {
        l2_regularized(least_squares_objective(y, X), self.lambda)
    }

    /// Fits by Barzilai-Borwein descent, returning the final loss.
    pub fn fit_descent(&mut self, y: ArrayView1<f64>, X: ArrayView2<f64>) -> Result<f64> {
        check_labels(&y, &X)?;
        let w0 = Array1::zeros(X.ncols());
        let (w, f) = bb_gradient_descent(
            self.objective(y.view(), X.view()),
            w0.view(),
            self.max_evals,
            &LineSearchParams::default(),
            nop,
        );
        self.w = Some(w);
        Ok(f)
    }
}

impl Classifier for LeastSquaresL2 {
    /// Closed-form fit of the regularized normal equations
    fn fit(&mut self, y: ArrayView1<f64>, X: ArrayView2<f64>) -> Result<()> {
        check_labels(&y, &X)?;
        self.w = Some(normal_equations(y, X, self.lambda)?);
        Ok(())
    }

    fn weights(&self) -> Option<ArrayView1<f64>> {
        self.w.as_ref().map(|w| w.view())
    }
}

/// LASSO, least squares plus `lambda * ||w||_1`
#[derive(Debug, Clone)]
pub struct LeastSquaresL1 {
    pub lambda: f64,
    pub max_evals: usize,
    w: Option<Array1<f64>>,
}

impl LeastSquaresL1 {
    pub fn new(lambda: f64) -> Self {
        LeastSquaresL1 {
            lambda,
            max_evals: DEFAULT_MAX_EVALS,
            w: None,
        }
    }
}

impl Classifier for LeastSquaresL1 {
    fn fit(&mut self, y: ArrayView1<f64>, X: ArrayView2<f64>) -> Result<()> {
        check_labels(&y, &X)?;
        let w0 = Array1::zeros(X.ncols());
        let (w, _) = prox_l1_descent(
            least_squares_objective(y.view(), X.view()),
            w0.view(),
            self.lambda,
            self.max_evals,
            &ProxParams::default(),
            nop,
        );
        self.w = Some(w);
        Ok(())
    }

    fn weights(&self) -> Option<ArrayView1<f64>> {
        self.w.as_ref().map(|w| w.view())
    }
}
