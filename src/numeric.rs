//! Vector primitives and step-size safeguards shared by the solvers

use ndarray::prelude::*;
use ndarray::{Data, NdFloat};
use num_traits::Float;

/// Default optimality tolerance on the (proximal) gradient infinity-norm
pub const OPT_TOL: f64 = 1e-2;
/// Default gradient tolerance of the fixed-step solver
pub const FIXED_STEP_TOL: f64 = 1e-4;
/// Default sufficient-decrease constant of the Armijo condition
pub const ARMIJO_BETA: f64 = 1e-4;
/// Largest Barzilai-Borwein step size accepted by either solver
pub const MAX_STEP: f64 = 1e10;
/// Smallest Barzilai-Borwein step size accepted by the smooth solver
pub const SMOOTH_MIN_STEP: f64 = 1e-60;
/// Smallest Barzilai-Borwein step size accepted by the proximal solver
pub const PROX_MIN_STEP: f64 = 1e-30;
/// Lower bound used by the fixed-reset solver variants
pub const FIXED_RESET_MIN_STEP: f64 = 1e-10;

/// Infinity-norm, `max_i |v_i|`.
///
/// A NaN entry makes the result NaN, so a poisoned gradient never passes
/// a tolerance test.
pub fn norm_inf<A, S>(v: &ArrayBase<S, Ix1>) -> A
where
    A: Float,
    S: Data<Elem = A>,
{
    v.fold(A::zero(), |acc, &vi| {
        let a = vi.abs();
        if a.is_nan() || a > acc {
            a
        } else {
            acc
        }
    })
}

/// Barzilai-Borwein re-estimate of the step size.
///
/// With `y = g_new - g` this is `-step * (y·g) / (y·y)`. When the gradient
/// did not change the result is not finite and must be caught by
/// [`StepBounds::admit_or`].
pub fn bb_step<S: NdFloat>(step: S, g: ArrayView1<S>, g_new: ArrayView1<S>) -> S {
    let y = &g_new - &g;
    -step * y.dot(&g) / y.dot(&y)
}

/// Calls the objective and checks that the gradient matches `x` in length.
pub(crate) fn evaluate<S: NdFloat>(
    fgrad: &impl Fn(ArrayView1<S>) -> (S, Array1<S>),
    x: ArrayView1<S>,
) -> (S, Array1<S>) {
    let dim = x.len();
    let (f, g) = fgrad(x);
    assert_eq!(
        g.len(),
        dim,
        "objective returned a gradient of length {} for a point of length {}",
        g.len(),
        dim
    );
    (f, g)
}

/// Closed interval of step sizes a solver is willing to use
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepBounds<A> {
    pub min: A,
    pub max: A,
}

impl<A: Float> StepBounds<A> {
    /// Panics unless `0 <= min <= max`.
    pub fn new(min: A, max: A) -> Self {
        assert!(
            min >= A::zero() && min <= max,
            "step bounds must satisfy 0 <= min <= max"
        );
        StepBounds { min, max }
    }

    /// Bounds `[min, MAX_STEP]`
    pub fn from_min(min: f64) -> Self {
        StepBounds::new(cast(min), cast(MAX_STEP))
    }

    /// False for NaN and anything outside `[min, max]`
    #[inline]
    pub fn admits(&self, step: A) -> bool {
        step >= self.min && step <= self.max
    }

    /// `step` if admitted, else `fallback`
    #[inline]
    pub fn admit_or(&self, step: A, fallback: A) -> A {
        if self.admits(step) {
            step
        } else {
            fallback
        }
    }
}

/// Converts an `f64` constant into the working precision.
///
/// Constants below the smallest representable value flush to zero.
#[inline]
pub(crate) fn cast<A: Float>(c: f64) -> A {
    A::from(c).unwrap_or_else(A::zero)
}
