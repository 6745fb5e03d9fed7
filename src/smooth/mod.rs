//! First Order Methods for Smooth Minimization
//!
//! For minimizing a differentiable objective function $`f`$ given only
//! as a callback returning the pair $`(f(x), \nabla f(x))`$. No Lipschitz
//! constant is needed: step sizes are found by backtracking and
//! re-estimated from consecutive gradients with the Barzilai-Borwein rule.
//!
//! For example, for the least squares objective $`f(x) = \frac{1}{2n} \|y - Ax\|_2^2`$,
//! the callback returns $`f(x)`$ together with $`-\frac1n A^T(y - Ax)`$.
//!
//! For more info, see [Barzilai-Borwein on Wikipedia](https://en.wikipedia.org/wiki/Barzilai-Borwein_method)

mod bb;
pub use bb::*;
mod gd;
pub use gd::*;

use ndarray::ArrayView;

/// Do nothing function for optional user callback (returns false)
#[allow(clippy::needless_pass_by_value)]
pub fn nop<T, D>(_x: ArrayView<T, D>, _itr: usize) -> bool {
    false
}
