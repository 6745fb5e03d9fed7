use super::{check_labels, l2_regularized, Classifier, DEFAULT_MAX_EVALS};
use crate::error::Result;
use crate::prox::{prox_l1_descent, ProxParams};
use crate::smooth::{bb_gradient_descent, nop, LineSearchParams};
use log::debug;
use ndarray::prelude::*;

/// `log(1 + exp(t))` without overflow for large `t`
pub fn log1p_exp(t: f64) -> f64 {
    if t > 0. {
        t + (-t).exp().ln_1p()
    } else {
        t.exp().ln_1p()
    }
}

/// Logistic loss for labels in `{-1, 1}`
///
/// ```math
/// f(w) = \sum_i \log\left(1 + e^{-y_i x_i^T w}\right), \qquad
/// \nabla f(w) = -X^T \frac{y}{1 + e^{y \circ Xw}}
/// ```
pub fn logistic_objective<'a>(
    y: ArrayView1<'a, f64>,
    X: ArrayView2<'a, f64>,
) -> impl Fn(ArrayView1<f64>) -> (f64, Array1<f64>) + 'a {
    move |w: ArrayView1<f64>| {
        let pred = &y * &X.dot(&w);
        let f = pred.mapv(|t| log1p_exp(-t)).sum();
        let res = -&y / &pred.mapv(|t| 1. + t.exp());
        (f, X.t().dot(&res))
    }
}

/// Fits a zero-initialized weight vector by Barzilai-Borwein descent
fn fit_smooth(
    objective: impl Fn(ArrayView1<f64>) -> (f64, Array1<f64>),
    features: usize,
    max_evals: usize,
) -> Array1<f64> {
    let w0 = Array1::zeros(features);
    let (w, f) = bb_gradient_descent(
        objective,
        w0.view(),
        max_evals,
        &LineSearchParams::default(),
        nop,
    );
    debug!("logistic fit finished with loss {:.3}", f);
    w
}

/// Logistic regression
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    pub max_evals: usize,
    w: Option<Array1<f64>>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        LogisticRegression::new(DEFAULT_MAX_EVALS)
    }
}

impl LogisticRegression {
    pub fn new(max_evals: usize) -> Self {
        LogisticRegression { max_evals, w: None }
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, y: ArrayView1<f64>, X: ArrayView2<f64>) -> Result<()> {
        check_labels(&y, &X)?;
        self.w = Some(fit_smooth(
            logistic_objective(y.view(), X.view()),
            X.ncols(),
            self.max_evals,
        ));
        Ok(())
    }

    fn weights(&self) -> Option<ArrayView1<f64>> {
        self.w.as_ref().map(|w| w.view())
    }
}

/// Logistic regression with an L2 penalty `lambda / 2 * ||w||^2`
#[derive(Debug, Clone)]
pub struct LogisticRegressionL2 {
    pub lambda: f64,
    pub max_evals: usize,
    w: Option<Array1<f64>>,
}

impl LogisticRegressionL2 {
    pub fn new(lambda: f64) -> Self {
        LogisticRegressionL2 {
            lambda,
            max_evals: DEFAULT_MAX_EVALS,
            w: None,
        }
    }
}

impl Classifier for LogisticRegressionL2 {
    fn fit(&mut self, y: ArrayView1<f64>, X: ArrayView2<f64>) -> Result<()> {
        check_labels(&y, &X)?;
        self.w = Some(fit_smooth(
            l2_regularized(logistic_objective(y.view(), X.view()), self.lambda),
            X.ncols(),
            self.max_evals,
        ));
        Ok(())
    }

    fn weights(&self) -> Option<ArrayView1<f64>> {
        self.w.as_ref().map(|w| w.view())
    }
}

/// Sparse logistic regression with an L1 penalty `lambda * ||w||_1`
#[derive(Debug, Clone)]
pub struct LogisticRegressionL1 {
    pub lambda: f64,
    pub max_evals: usize,
    w: Option<Array1<f64>>,
}

impl LogisticRegressionL1 {
    pub fn new(lambda: f64) -> Self {
        LogisticRegressionL1 {
            lambda,
            max_evals: DEFAULT_MAX_EVALS,
            w: None,
        }
    }
}

impl Classifier for LogisticRegressionL1 {
    fn fit(&mut self, y: ArrayView1<f64>, X: ArrayView2<f64>) -> Result<()> {
        check_labels(&y, &X)?;
        let w0 = Array1::zeros(X.ncols());
        let (w, _) = prox_l1_descent(
            logistic_objective(y.view(), X.view()),
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
