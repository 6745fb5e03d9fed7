use super::{l1_term, soft_threshold};
use crate::numeric::{
    bb_step, cast, evaluate, norm_inf, StepBounds, ARMIJO_BETA, FIXED_RESET_MIN_STEP, OPT_TOL,
    PROX_MIN_STEP,
};
use log::{debug, trace};
use ndarray::prelude::*;
use ndarray::NdFloat;

/// Tuning constants of [`prox_l1_descent`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProxParams<S> {
    /// stop once $`\|x - \mathrm{prox}(x - g)\|_\infty`$ drops below this
    pub opt_tol: S,
    /// sufficient decrease constant of the Armijo test
    pub gamma: S,
    /// accepted range of Barzilai-Borwein step sizes
    pub bounds: StepBounds<S>,
    /// step size used when the Barzilai-Borwein estimate is rejected
    pub reset: S,
}

impl<S: NdFloat> Default for ProxParams<S> {
    fn default() -> Self {
        ProxParams {
            opt_tol: cast(OPT_TOL),
            gamma: cast(ARMIJO_BETA),
            bounds: StepBounds::from_min(PROX_MIN_STEP),
            reset: S::one(),
        }
    }
}

impl<S: NdFloat> ProxParams<S> {
    /// Narrower step range `[1e-10, 1e10]`
    pub fn fixed_reset() -> Self {
        ProxParams {
            bounds: StepBounds::from_min(FIXED_RESET_MIN_STEP),
            ..Self::default()
        }
    }
}

/// Proximal Gradient Descent for L1-regularized objectives
///
/// Minimizes $`f(x) + \lambda \|x\|_1`$ for smooth $`f`$ using
/// soft-thresholded gradient steps, halving the step until the
/// regularized loss decreases sufficiently.
///
/// Algorithm
/// ---------
/// ```math
/// \begin{aligned}
/// x^+ &= \mathrm{prox}_{\alpha\lambda}(x_i - \alpha g_i) \\
/// &\text{halve } \alpha \text{ until } f(x^+) + \lambda\|x^+\|_1 \leq f(x_i) + \lambda\|x_i\|_1 + \gamma \alpha\, g_i^T(x^+_0 - x_i) \\
/// x_{i+1} &= x^+ \\
/// y_i &= g_{i+1} - g_i \\
/// \alpha &\leftarrow -\alpha \frac{y_i^T g_i}{y_i^T y_i}
/// \end{aligned}
/// ```
/// where $`x^+_0`$ is the first candidate of the line search. A
/// Barzilai-Borwein estimate outside `params.bounds` is replaced by
/// `params.reset`.
///
/// Terminates when $`\|x_i - \mathrm{prox}_\lambda(x_i - g_i)\|_\infty`$
/// drops below `params.opt_tol`, when the budget of objective evaluations
/// is spent (the initial evaluation counts), or when the callback asks to.
/// Returns the last accepted iterate and its smooth loss $`f`$, without
/// the penalty.
///
/// Parameters
/// ----------
/// - __fgrad:__     function returning the smooth loss f(x) and gradient g(x)
/// - __x0:__        initial guess
/// - __lambda:__    L1 penalty strength, zero gives plain proximal descent
/// - __max_evals:__ budget of objective evaluations
/// - __params:__    tolerances and step-size safeguards
/// - __callback:__  User-defined function to be evaluated with two arguments (x,iter).
///                   It is evaluated at (x0,0) and then after each iteration.
///                   If it returns True, the function terminates early.
///
/// Panics if `lambda` is negative or if `fgrad` returns a gradient whose
/// length differs from `x0`.
pub fn prox_l1_descent<S>(
    fgrad: impl Fn(ArrayView1<S>) -> (S, Array1<S>),
    x0: ArrayView1<S>,
    lambda: S,
    max_evals: usize,
    params: &ProxParams<S>,
    mut callback: impl FnMut(ArrayView1<S>, usize) -> bool,
) -> (Array1<S>, S)
where
    S: NdFloat,
{
    assert!(lambda >= S::zero(), "L1 penalty must be non-negative");
    let two = S::from(2.).unwrap();

    let mut x = x0.to_owned();
    let (mut f, mut g) = evaluate(&fgrad, x.view());
    let mut evals = 1;
    let mut alpha = S::one();

    if callback(x.view(), 0) {
        return (x, f);
    }
    let mut iter = 0;
    loop {
        iter += 1;
        let reg = l1_term(&x, lambda);

        let mut gtd = None;
        let (x_new, f_new, g_new) = loop {
            let mut v = x.clone();
            v.scaled_add(-alpha, &g);
            let x_new = soft_threshold(&v, lambda * alpha);
            let gtd = *gtd.get_or_insert_with(|| g.dot(&(&x_new - &x)));

            let (f_new, g_new) = evaluate(&fgrad, x_new.view());
            evals += 1;

            if f_new + l1_term(&x_new, lambda) <= f + reg + params.gamma * alpha * gtd {
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
            alpha = alpha / two;
        };
        debug!("{} - alpha: {:.3} - loss: {:.3}", evals, alpha, f_new);

        let bb = bb_step(alpha, g.view(), g_new.view());
        alpha = if params.bounds.admits(bb) {
            bb
        } else {
            debug!("step size out of bounds: {:e}, resetting to {:e}", bb, params.reset);
            params.reset
        };

        x = x_new;
        f = f_new;
        g = g_new;

        if callback(x.view(), iter) {
            break;
        }
        let opt_cond = norm_inf(&(&x - &soft_threshold(&(&x - &g), lambda)));
        if opt_cond < params.opt_tol {
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

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::smooth::nop;
    use approx::assert_abs_diff_eq;
    use std::cell::{Cell, RefCell};

    /// `0.5 * ||x - c||^2`, minimized with an L1 penalty at `soft_threshold(c, lambda)`
    fn shifted_square(c: &Array1<f64>) -> impl Fn(ArrayView1<f64>) -> (f64, Array1<f64>) + '_ {
        move |x| {
            let r = &x - c;
            (0.5 * r.dot(&r), r)
        }
    }

    /// L1-regularized logistic loss on a tiny separable-ish problem
    fn logistic(x: ArrayView1<f64>) -> (f64, Array1<f64>) {
        let X = array![[1., 2.], [1., -1.], [-1., 0.5], [-2., -1.], [0.5, 0.5]];
        let y = array![1., 1., -1., -1., 1.];
        let pred = &y * &X.dot(&x);
        let f = pred.mapv(|t| (-t).exp().ln_1p()).sum();
        let res = -&y / &pred.mapv(|t| 1. + t.exp());
        (f, X.t().dot(&res))
    }

    #[test]
    fn full_shrinkage_of_small_start() {
        let mut iters = 0;
        let (x, f) = prox_l1_descent(
            |x: ArrayView1<f64>| (0.5 * x.dot(&x), x.to_owned()),
            array![0.01].view(),
            1.,
            100,
            &ProxParams::default(),
            |_x, iter| {
                iters = iter;
                false
            },
        );
        assert_eq!(x, array![0.]);
        assert_eq!(f, 0.);
        assert!(iters <= 2);
    }

    #[test]
    fn exact_zeros_where_penalty_dominates() {
        let c = array![3., 0.2, -0.1, -4.];
        let (x, _) = prox_l1_descent(
            shifted_square(&c),
            Array1::<f64>::zeros(4).view(),
            0.5,
            100,
            &ProxParams::default(),
            nop,
        );
        assert_eq!(x[1], 0.);
        assert_eq!(x[2], 0.);
        assert_abs_diff_eq!(x, array![2.5, 0., 0., -3.5], epsilon = 1e-10);
    }

    #[test]
    fn zero_lambda_is_plain_descent() {
        let c = array![1., -2., 3.];
        let params = ProxParams {
            opt_tol: 1e-9,
            ..ProxParams::default()
        };
        let (x, f) = prox_l1_descent(
            |x: ArrayView1<f64>| {
                // anisotropic so the Barzilai-Borwein step matters
                let d = array![1., 4., 9.];
                let r = &x - &c;
                (0.5 * (&d * &r).dot(&r), &d * &r)
            },
            Array1::<f64>::zeros(3).view(),
            0.,
            500,
            &params,
            nop,
        );
        assert_abs_diff_eq!(x, c, epsilon = 1e-8);
        assert_abs_diff_eq!(f, 0., epsilon = 1e-12);
    }

    #[test]
    fn regularized_loss_never_increases() {
        let lambda = 0.3;
        let x0 = Array1::<f64>::zeros(2);
        let mut prev = logistic(x0.view()).0;
        prox_l1_descent(
            logistic,
            x0.view(),
            lambda,
            200,
            &ProxParams::default(),
            |x, iter| {
                if iter > 0 {
                    // a shrinking step may spend up to gamma * alpha * gtd of slack
                    let total = logistic(x).0 + l1_term(&x, lambda);
                    assert!(total <= prev + 1e-4, "iter {}: {} > {}", iter, total, prev);
                    prev = total;
                }
                false
            },
        );
        assert!(prev < 5. * 2f64.ln());
    }

    #[test]
    fn accepted_steps_satisfy_armijo() {
        let lambda = 0.3;
        let params = ProxParams::default();
        let evals = RefCell::new(Vec::new());
        let mut last = 0;
        let mut checked = 0;
        prox_l1_descent(
            |x: ArrayView1<f64>| {
                let (f, g) = logistic(x);
                evals.borrow_mut().push((x.to_owned(), f, g.clone()));
                (f, g)
            },
            Array1::<f64>::zeros(2).view(),
            lambda,
            200,
            &params,
            |_, iter| {
                let evals = evals.borrow();
                if iter > 0 {
                    let (x, f, g) = &evals[last];
                    let attempts = &evals[last + 1..];
                    let (first, _, _) = &attempts[0];
                    let (x_new, f_new, _) = attempts.last().unwrap();
                    let gtd = g.dot(&(first - x));
                    // first candidate is x - alpha0 * (g + lambda * sign) on its support
                    let i = (0..2)
                        .max_by(|&a, &b| first[a].abs().partial_cmp(&first[b].abs()).unwrap())
                        .unwrap();
                    if first[i] != 0. {
                        let alpha0 = (x[i] - first[i]) / (g[i] + lambda * first[i].signum());
                        let alpha = alpha0 * 0.5f64.powi(attempts.len() as i32 - 1);
                        let lhs = f_new + l1_term(x_new, lambda);
                        let rhs = f + l1_term(x, lambda) + params.gamma * alpha * gtd;
                        assert!(lhs <= rhs + 1e-12, "iter {}: {} > {}", iter, lhs, rhs);
                        checked += 1;
                    }
                }
                last = evals.len() - 1;
                false
            },
        );
        assert!(checked > 1);
    }

    #[test]
    fn respects_evaluation_budget() {
        for &max_evals in &[1, 2, 5, 30] {
            let calls = Cell::new(0);
            prox_l1_descent(
                |x: ArrayView1<f64>| {
                    calls.set(calls.get() + 1);
                    logistic(x)
                },
                array![5., -5.].view(),
                0.1,
                max_evals,
                &ProxParams::default(),
                nop,
            );
            // the initial evaluation is part of the budget, but one
            // attempt is always made
            assert!(calls.get() <= max_evals.max(2));
        }
    }

    #[test]
    fn huge_bb_step_is_reset() {
        // nearly flat gradient change makes the Barzilai-Borwein step about 1e12
        let params = ProxParams {
            reset: 0.25,
            ..ProxParams::default()
        };
        let mut iterates = Vec::new();
        prox_l1_descent(
            |x: ArrayView1<f64>| {
                let f = 1e-12 * 0.5 * x.dot(&x) + x.sum();
                (f, &x * 1e-12 + 1.)
            },
            array![1., 1.].view(),
            0.,
            20,
            &params,
            |x, iter| {
                iterates.push(x.to_owned());
                iter == 2
            },
        );
        assert_abs_diff_eq!(iterates[1], array![0., 0.], epsilon = 1e-10);
        assert_abs_diff_eq!(iterates[2], array![-0.25, -0.25], epsilon = 1e-10);
    }

    /// `1e20 * x^2 / 2`, whose Barzilai-Borwein step is 1e-20
    fn stiff(x: ArrayView1<f64>) -> (f64, Array1<f64>) {
        (0.5e20 * x.dot(&x), &x * 1e20)
    }

    /// Objective evaluations spent by the second iteration
    fn second_iteration_evals(params: &ProxParams<f64>) -> usize {
        let calls = Cell::new(0);
        let mut after_first = 0;
        prox_l1_descent(
            |x: ArrayView1<f64>| {
                calls.set(calls.get() + 1);
                stiff(x)
            },
            array![1.].view(),
            0.,
            1000,
            params,
            |_, iter| {
                if iter == 1 {
                    after_first = calls.get();
                }
                iter == 2
            },
        );
        calls.get() - after_first
    }

    #[test]
    fn tiny_bb_step_depends_on_bounds() {
        // 1e-20 lies inside the default range and lands on the minimizer
        assert_eq!(second_iteration_evals(&ProxParams::default()), 1);
        // the fixed-reset range rejects it and halves down from 1 again
        assert!(second_iteration_evals(&ProxParams::fixed_reset()) > 50);
    }

    #[test]
    #[should_panic(expected = "non-negative")]
    fn negative_lambda_panics() {
        prox_l1_descent(
            |x: ArrayView1<f64>| (0.5 * x.dot(&x), x.to_owned()),
            array![1.].view(),
            -1.,
            10,
            &ProxParams::default(),
            nop,
        );
    }
}
