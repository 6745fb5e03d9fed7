//! Minimization for Composite Functions consisting of
//! smooth _f_ and a non-smooth L1 penalty
//!
//! This includes common objective functions such as the LASSO
//! and L1-regularized logistic regression. The penalty is handled
//! exactly through its proximal operator, soft-thresholding, so
//! iterates contain exact zeros.

mod l1;
pub use l1::*;

use ndarray::prelude::*;
use ndarray::Data;
use num_traits::Float;

/// Soft-thresholding, the proximal operator of `threshold * ||.||_1`
///
/// ```math
/// \mathrm{prox}(v)_i = \mathrm{sign}(v_i) \max(|v_i| - t, 0)
/// ```
pub fn soft_threshold<A, S>(v: &ArrayBase<S, Ix1>, threshold: A) -> Array1<A>
where
    A: Float,
    S: Data<Elem = A>,
{
    v.mapv(|vi| {
        let shrunk = vi.abs() - threshold;
        if shrunk > A::zero() {
            vi.signum() * shrunk
        } else if shrunk.is_nan() {
            shrunk
        } else {
            A::zero()
        }
    })
}

/// The penalty `lambda * ||v||_1`
pub fn l1_term<A, S>(v: &ArrayBase<S, Ix1>, lambda: A) -> A
where
    A: Float,
    S: Data<Elem = A>,
{
    lambda * v.fold(A::zero(), |acc, &vi| acc + vi.abs())
}
