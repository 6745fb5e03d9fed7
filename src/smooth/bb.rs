use crate::numeric::{
    bb_step, cast, evaluate, norm_inf, StepBounds, ARMIJO_BETA, FIXED_RESET_MIN_STEP, OPT_TOL,
    SMOOTH_MIN_STEP,
};
use log::{debug, trace};
use ndarray::prelude::*;
use ndarray::NdFloat;

/// Step size used when the Barzilai-Borwein estimate is rejected
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepFallback<S> {
    /// The step the last geometric collapse (after an infinite loss)
    /// settled on, or 1 if none happened yet
    LastCollapse,
    /// Always restart from this step
    Fixed(S),
}

/// Tuning constants of [`bb_gradient_descent`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSearchParams<S> {
    /// stop once $`\|\nabla f\|_\infty`$ drops below this
    pub opt_tol: S,
    /// sufficient decrease constant of the Armijo test
    pub beta: S,
    /// accepted range of Barzilai-Borwein step sizes
    pub bounds: StepBounds<S>,
    pub fallback: StepFallback<S>,
}

impl<S: NdFloat> Default for LineSearchParams<S> {
    fn default() -> Self {
        LineSearchParams {
            opt_tol: cast(OPT_TOL),
            beta: cast(ARMIJO_BETA),
            bounds: StepBounds::from_min(SMOOTH_MIN_STEP),
            fallback: StepFallback::LastCollapse,
        }
    }
}

impl<S: NdFloat> LineSearchParams<S> {
    /// Narrower step range `[1e-10, 1e10]` that restarts every rejected
    /// Barzilai-Borwein step from 1.
    pub fn fixed_reset() -> Self {
        LineSearchParams {
            bounds: StepBounds::from_min(FIXED_RESET_MIN_STEP),
            fallback: StepFallback::Fixed(S::one()),
            ..Self::default()
        }
    }
}

/// Gradient Descent with Barzilai-Borwein steps and Armijo backtracking
///
/// Each outer iteration starts from a non-monotone Barzilai-Borwein guess
/// of the step size and backtracks until the Armijo condition holds.
///
/// Algorithm
/// ---------
/// ```math
/// \begin{aligned}
/// &\text{find } \gamma \text{ s.t. } f(x_i - \gamma g_i) \leq f(x_i) - \beta \gamma \|g_i\|_2^2 \\
/// x_{i+1} &= x_i - \gamma g_i \\
/// y_i &= g_{i+1} - g_i \\
/// \gamma &\leftarrow -\gamma \frac{y_i^T g_i}{y_i^T y_i}
/// \end{aligned}
/// ```
/// A rejected $`\gamma`$ is shrunk by minimizing the quadratic interpolant
/// of $`f`$ along $`-g_i`$. If the loss is not finite the step collapses to
/// $`10^{-k}`$ on the $`k`$-th attempt instead. A Barzilai-Borwein estimate
/// outside `params.bounds` is replaced according to `params.fallback`.
///
/// Terminates when $`\|g_i\|_\infty`$ < `params.opt_tol`, when the budget of
/// objective evaluations is spent (the initial evaluation is not counted),
/// or when the callback asks to. Returns the last accepted iterate and its
/// loss; running out of budget mid line search returns the previous one.
///
/// Parameters
/// ----------
/// - __fgrad:__     function returning the loss f(x) and gradient g(x)
/// - __x0:__        initial guess
/// - __max_evals:__ budget of objective evaluations
/// - __params:__    tolerances and step-size safeguards
/// - __callback:__  User-defined function to be evaluated with two arguments (x,iter).
///                   It is evaluated at (x0,0) and then after each iteration.
///                   If it returns True, the function terminates early.
///
/// Panics if `fgrad` returns a gradient whose length differs from `x0`.
pub fn bb_gradient_descent<S>(
    fgrad: impl Fn(ArrayView1<S>) -> (S, Array1<S>),
    x0: ArrayView1<S>,
    max_evals: usize,
    params: &LineSearchParams<S>,
    mut callback: impl FnMut(ArrayView1<S>, usize) -> bool,
) -> (Array1<S>, S)
where
    S: NdFloat,
{
    let two = S::from(2.).unwrap();
    let ten = S::from(10.).unwrap();

    let mut x = x0.to_owned();
    let (mut f, mut g) = evaluate(&fgrad, x.view());
    let mut evals = 0;
    let mut step = S::one();
    let mut collapsed = S::one();

    if callback(x.view(), 0) {
        return (x, f);
    }
    let mut iter = 0;
    loop {
        iter += 1;
        let gg = g.dot(&g);

        let mut attempts = 0;
        let (x_new, f_new, g_new) = loop {
            let mut x_new = x.clone();
            x_new.scaled_add(-step, &g);
            let (f_new, g_new) = evaluate(&fgrad, x_new.view());
            attempts += 1;
            evals += 1;

            if f_new <= f - params.beta * step * gg {
                break (x_new, f_new, g_new);
            }
            trace!("f_new: {:.3} - f: {:.3} - backtracking", f_new, f);
            if evals >= max_evals {
                debug!(
                    "reached maximum number of function evaluations {} during line search",
                    max_evals
                );
                return (x, f);
            }

            if f_new.is_finite() {
                step = step * step * gg / (two * (f_new - f + step * gg));
            } else {
                step = ten.powi(-attempts);
                collapsed = step;
            }
        };
        debug!("{} - loss: {:.3} - step: {:e}", evals, f_new, step);

        let bb = bb_step(step, g.view(), g_new.view());
        step = if params.bounds.admits(bb) {
            bb
        } else {
            let reset = match params.fallback {
                StepFallback::LastCollapse => collapsed,
                StepFallback::Fixed(s) => s,
            };
            debug!("step size out of bounds: {:e}, resetting to {:e}", bb, reset);
            reset
        };

        x = x_new;
        f = f_new;
        g = g_new;

        if callback(x.view(), iter) {
            break;
        }
        if norm_inf(&g) < params.opt_tol {
            debug!(
                "problem solved up to optimality tolerance {:e}",
                params.opt_tol
            );
            break;
        }
        if evals >= max_evals {
            debug!("reached maximum number of function evaluations {}", max_evals);
            break;
        }
    }
    (x, f)
}


#[cfg(all(rustc_nightly, test))]
mod benches {
    use super::*;
    use crate::smooth::nop;
    use test::Bencher;

    #[bench]
    fn bb_quadratic_100(b: &mut Bencher) {
        let d = Array1::linspace(1., 10., 100);
        b.iter(|| {
            bb_gradient_descent(
                |x: ArrayView1<f64>| (0.5 * (&d * &x).dot(&x), &d * &x),
                Array1::<f64>::ones(100).view(),
                200,
                &LineSearchParams::default(),
                nop,
            )
        });
    }
}
