use crate::numeric::{evaluate, norm_inf, FIXED_STEP_TOL};
use log::debug;
use ndarray::prelude::*;
use ndarray::NdFloat;

/// Gradient Descent with a fixed step size
///
/// Also known as the unconstrained gradient method, or steepest descent.
///
/// Algorithm
/// ---------
/// ```math
/// x_{i+1} = x_i - h \nabla f(x_i)
/// ```
///
/// For an $`L`$-Lipschitz smooth objective, $`h \in (0, 2/L)`$ guarantees
/// convergence. Nothing protects against a step that is too large.
///
/// Parameters
/// ----------
/// - __fgrad:__     function returning the loss f(x) and gradient g(x)
/// - __x0:__        initial guess
/// - __step:__      fixed step size h
/// - __max_evals:__ budget of objective evaluations after the initial one
/// - __tol:__       stop once the gradient infinity-norm is below this
/// - __callback:__  User-defined function to be evaluated with two arguments (x,iter).
///                   It is evaluated at (x0,0) and then after each iteration.
///                   If it returns True, the function terminates early.
pub fn gradient_descent<S: NdFloat>(
    fgrad: impl Fn(ArrayView1<S>) -> (S, Array1<S>),
    x0: ArrayView1<S>,
    step: S,
    max_evals: usize,
    tol: S,
    mut callback: impl FnMut(ArrayView1<S>, usize) -> bool,
) -> (Array1<S>, S) {
    let mut x = x0.to_owned();
    let (mut f, mut g) = evaluate(&fgrad, x.view());

    if callback(x.view(), 0) {
        return (x, f);
    }
    for iter in 1..=max_evals {
        x.scaled_add(-step, &g);
        let (f_new, g_new) = evaluate(&fgrad, x.view());
        f = f_new;
        g = g_new;
        debug!("{} - loss: {:.3}", iter, f);

        if callback(x.view(), iter) {
            break;
        }
        if norm_inf(&g) < tol {
            debug!("problem solved up to optimality tolerance {:e}", tol);
            break;
        }
    }
    (x, f)
}
