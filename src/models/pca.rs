use crate::error::{FitError, Result};
use crate::smooth::{bb_gradient_descent, nop, LineSearchParams};
use log::debug;
use ndarray::prelude::*;
use ndarray_linalg::SVD;
use ndarray_rand::rand::{rngs::StdRng, SeedableRng};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;

/// Smoothing of the absolute value in the robust factorization loss
pub const ROBUST_EPSILON: f64 = 1e-4;

/// Learned mean and `k x d` factor matrix
#[derive(Debug, Clone)]
struct Projection {
    mu: Array1<f64>,
    W: Array2<f64>,
}

impl Projection {
    fn check_features(&self, d: usize) -> Result<()> {
        if d != self.W.ncols() {
            return Err(FitError::FeatureMismatch {
                expected: self.W.ncols(),
                found: d,
            });
        }
        Ok(())
    }

    fn centered(&self, X: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_features(X.ncols())?;
        Ok(&X - &self.mu)
    }

    fn expand(&self, Z: ArrayView2<f64>) -> Result<Array2<f64>> {
        if Z.ncols() != self.W.nrows() {
            return Err(FitError::FeatureMismatch {
                expected: self.W.nrows(),
                found: Z.ncols(),
            });
        }
        Ok(Z.dot(&self.W) + &self.mu)
    }
}

fn check_components(k: usize, d: usize) -> Result<()> {
    if k == 0 || k > d {
        return Err(FitError::InvalidComponents { k, max: d });
    }
    Ok(())
}

fn column_mean(X: ArrayView2<f64>) -> Result<Array1<f64>> {
    X.mean_axis(Axis(0)).ok_or(FitError::EmptyData)
}

/// Principal component analysis via the singular value decomposition
///
/// Solves $`\min_{Z,W} \|ZW - X\|_F^2`$ for centered $`X`$ with the
/// rows of $`W`$ taken as the top $`k`$ right singular vectors.
#[derive(Debug, Clone)]
pub struct Pca {
    pub k: usize,
    fitted: Option<Projection>,
}

impl Pca {
    pub fn new(k: usize) -> Self {
        Pca { k, fitted: None }
    }

    pub fn fit(&mut self, X: ArrayView2<f64>) -> Result<()> {
        check_components(self.k, X.ncols())?;
        let mu = column_mean(X)?;
        let (_, _, vt) = (&X - &mu).svd(false, true)?;
        let vt = vt.ok_or(FitError::MissingFactor)?;
        self.fitted = Some(Projection {
            mu,
            W: vt.slice(s![..self.k, ..]).to_owned(),
        });
        Ok(())
    }

    /// Rows of `W`, one per component
    pub fn components(&self) -> Option<ArrayView2<f64>> {
        self.fitted.as_ref().map(|p| p.W.view())
    }

    /// `Z = (X - mu) W^T`
    pub fn compress(&self, X: ArrayView2<f64>) -> Result<Array2<f64>> {
        let p = self.fitted.as_ref().ok_or(FitError::NotFitted)?;
        Ok(p.centered(X)?.dot(&p.W.t()))
    }

    /// `X = Z W + mu`
    pub fn expand(&self, Z: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.fitted.as_ref().ok_or(FitError::NotFitted)?.expand(Z)
    }
}

/// Elementwise loss on the residual `R = ZW - X`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FactorLoss {
    /// $`\frac12 \sum R_{ij}^2`$
    Squared,
    /// $`\sum \sqrt{R_{ij}^2 + \epsilon}`$, a smooth absolute value
    Robust,
}

impl FactorLoss {
    /// Loss and its derivative with respect to `R`
    fn eval(self, R: &Array2<f64>) -> (f64, Array2<f64>) {
        match self {
            FactorLoss::Squared => (0.5 * R.mapv(|r| r * r).sum(), R.clone()),
            FactorLoss::Robust => {
                let s = R.mapv(|r| (r * r + ROBUST_EPSILON).sqrt());
                (s.sum(), R / &s)
            }
        }
    }
}

fn unflatten(v: ArrayView1<f64>, rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |(i, j)| v[i * cols + j])
}

fn flatten(A: Array2<f64>) -> Array1<f64> {
    A.iter().cloned().collect()
}

/// Objective in the flattened `n x k` scores for fixed factors `W`
fn scores_objective<'a>(
    loss: FactorLoss,
    W: &'a Array2<f64>,
    X: ArrayView2<'a, f64>,
) -> impl Fn(ArrayView1<f64>) -> (f64, Array1<f64>) + 'a {
    let (n, k) = (X.nrows(), W.nrows());
    move |z: ArrayView1<f64>| {
        let Z = unflatten(z, n, k);
        let (f, D) = loss.eval(&(Z.dot(W) - &X));
        (f, flatten(D.dot(&W.t())))
    }
}

/// Objective in the flattened `k x d` factors for fixed scores `Z`
fn factors_objective<'a>(
    loss: FactorLoss,
    Z: &'a Array2<f64>,
    X: ArrayView2<'a, f64>,
) -> impl Fn(ArrayView1<f64>) -> (f64, Array1<f64>) + 'a {
    let (k, d) = (Z.ncols(), X.ncols());
    move |w: ArrayView1<f64>| {
        let W = unflatten(w, k, d);
        let (f, D) = loss.eval(&(Z.dot(&W) - &X));
        (f, flatten(Z.t().dot(&D)))
    }
}

/// PCA by alternating gradient descent on the scores and factors
///
/// Starts from standard normal `Z` and `W` drawn from `seed`, then runs
/// `rounds` alternations of `inner_evals`-evaluation fits of each. The
/// factors are not orthogonalized, so [`compress`](AlternativePca::compress)
/// solves for the scores by descent as well.
#[derive(Debug, Clone)]
pub struct AlternativePca {
    pub k: usize,
    pub seed: u64,
    pub rounds: usize,
    pub inner_evals: usize,
    pub compress_evals: usize,
    pub loss: FactorLoss,
    fitted: Option<Projection>,
}

impl AlternativePca {
    pub fn new(k: usize) -> Self {
        AlternativePca {
            k,
            seed: 0,
            rounds: 10,
            inner_evals: 10,
            compress_evals: 100,
            loss: FactorLoss::Squared,
            fitted: None,
        }
    }

    /// Same factorization under the smoothed absolute loss, less sensitive
    /// to outlying entries
    pub fn robust(k: usize) -> Self {
        AlternativePca {
            loss: FactorLoss::Robust,
            ..AlternativePca::new(k)
        }
    }

    pub fn fit(&mut self, X: ArrayView2<f64>) -> Result<()> {
        let (n, d) = X.dim();
        let k = self.k;
        check_components(k, d)?;
        let mu = column_mean(X)?;
        let Xc = &X - &mu;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut z: Array1<f64> = Array::random_using(n * k, StandardNormal, &mut rng);
        let mut w: Array1<f64> = Array::random_using(k * d, StandardNormal, &mut rng);
        let params = LineSearchParams::default();

        for round in 0..self.rounds {
            let W = unflatten(w.view(), k, d);
            z = bb_gradient_descent(
                scores_objective(self.loss, &W, Xc.view()),
                z.view(),
                self.inner_evals,
                &params,
                nop,
            )
            .0;
            let Z = unflatten(z.view(), n, k);
            let (w_new, f) = bb_gradient_descent(
                factors_objective(self.loss, &Z, Xc.view()),
                w.view(),
                self.inner_evals,
                &params,
                nop,
            );
            w = w_new;
            debug!("round {}, loss = {:.1}", round, f);
        }

        self.fitted = Some(Projection {
            mu,
            W: unflatten(w.view(), k, d),
        });
        Ok(())
    }

    pub fn components(&self) -> Option<ArrayView2<f64>> {
        self.fitted.as_ref().map(|p| p.W.view())
    }

    /// Scores minimizing the loss of `X` against the learned factors
    pub fn compress(&self, X: ArrayView2<f64>) -> Result<Array2<f64>> {
        let p = self.fitted.as_ref().ok_or(FitError::NotFitted)?;
        let Xc = p.centered(X)?;
        let (n, k) = (Xc.nrows(), p.W.nrows());
        let z0 = Array1::zeros(n * k);
        let (z, _) = bb_gradient_descent(
            scores_objective(self.loss, &p.W, Xc.view()),
            z0.view(),
            self.compress_evals,
            &LineSearchParams::default(),
            nop,
        );
        Ok(unflatten(z.view(), n, k))
    }

    /// `X = Z W + mu`
    pub fn expand(&self, Z: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.fitted.as_ref().ok_or(FitError::NotFitted)?.expand(Z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Eight points on a line through `[1, -2, 3]`
    fn rank_one() -> Array2<f64> {
        let t = array![-2., -1.5, -0.5, 0., 0.3, 1., 1.7, 2.];
        let v = array![2., 1., -2.];
        let mu = array![1., -2., 3.];
        Array2::from_shape_fn((8, 3), |(i, j)| mu[j] + t[i] * v[j])
    }

    fn relative_error(approx: &Array2<f64>, X: &Array2<f64>) -> f64 {
        let mu = X.mean_axis(Axis(0)).unwrap();
        let centered = X - &mu;
        let diff = approx - X;
        (diff.mapv(|r| r * r).sum() / centered.mapv(|r| r * r).sum()).sqrt()
    }

    #[test]
    fn svd_pca_reconstructs_rank_one_data() {
        let X = rank_one();
        let mut pca = Pca::new(1);
        pca.fit(X.view()).unwrap();
        let W = pca.components().unwrap();
        // unit direction of [2, 1, -2] up to sign
        assert_abs_diff_eq!(W[[0, 0]].abs(), 2. / 3., epsilon = 1e-10);
        let Z = pca.compress(X.view()).unwrap();
        assert_eq!(Z.dim(), (8, 1));
        let back = pca.expand(Z.view()).unwrap();
        assert_abs_diff_eq!(back, X, epsilon = 1e-10);
    }

    #[test]
    fn svd_pca_rejects_bad_requests() {
        let X = rank_one();
        match Pca::new(4).fit(X.view()) {
            Err(FitError::InvalidComponents { k: 4, max: 3 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        match Pca::new(1).compress(X.view()) {
            Err(FitError::NotFitted) => {}
            other => panic!("unexpected {:?}", other),
        }
        let mut pca = Pca::new(2);
        pca.fit(X.view()).unwrap();
        match pca.compress(array![[1., 2.]].view()) {
            Err(FitError::FeatureMismatch { expected: 3, found: 2 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn alternating_pca_reconstructs_rank_one_data() {
        let X = rank_one();
        let mut pca = AlternativePca::new(1);
        pca.fit(X.view()).unwrap();
        let Z = pca.compress(X.view()).unwrap();
        let back = pca.expand(Z.view()).unwrap();
        assert!(relative_error(&back, &X) < 0.1);
    }

    #[test]
    fn robust_pca_fits_rank_one_data() {
        let X = rank_one();
        let mut pca = AlternativePca::robust(1);
        pca.fit(X.view()).unwrap();
        let Z = pca.compress(X.view()).unwrap();
        let back = pca.expand(Z.view()).unwrap();
        assert!(back.iter().all(|v| v.is_finite()));
        assert!(relative_error(&back, &X) < 0.5);
    }

    #[test]
    fn compress_uses_fitted_rank() {
        let X = rank_one();
        let mut pca = AlternativePca::new(1);
        pca.fit(X.view()).unwrap();
        pca.k = 2;
        let Z = pca.compress(X.view()).unwrap();
        assert_eq!(Z.dim(), (8, 1));
        assert_eq!(pca.expand(Z.view()).unwrap().dim(), (8, 3));
    }

    #[test]
    fn factor_gradients_match_finite_differences() {
        let X = rank_one();
        let W = array![[0.3, -0.1, 0.8]];
        for &loss in &[FactorLoss::Squared, FactorLoss::Robust] {
            let objective = scores_objective(loss, &W, X.view());
            let z = Array1::linspace(-1., 1., 8);
            let (f, g) = objective(z.view());
            let h = 1e-7;
            for i in 0..8 {
                let mut zh = z.clone();
                zh[i] += h;
                let fd = (objective(zh.view()).0 - f) / h;
                assert_abs_diff_eq!(g[i], fd, epsilon = 1e-3);
            }
        }
    }
}
