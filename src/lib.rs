//! The `ndarray-descent` crate provides first order solvers that minimize
//! a function of an `ndarray` given only a callback returning the loss
//! and its gradient.
//!
//! It includes:
//! - Gradient descent with Barzilai-Borwein step sizes and Armijo backtracking
//! - Proximal gradient descent for L1-regularized objectives (LASSO)
//! - Fixed step gradient descent
//!
//! and a few linear models fitted with them: least squares, logistic
//! regression with L1 or L2 penalties, and PCA by matrix factorization.
//!
//! Solvers never fail. Numerical trouble such as an infinite loss or a
//! degenerate step size is recovered inside the solver, and running out
//! of evaluations returns the last accepted iterate. Progress is reported
//! through the `log` facade at `debug` and `trace` level.
//!
//! ```
//! # extern crate intel_mkl_src;
//! use ndarray::prelude::*;
//! use ndarray_descent::smooth::{bb_gradient_descent, nop, LineSearchParams};
//!
//! let (x, f) = bb_gradient_descent(
//!     |x: ArrayView1<f64>| (x.dot(&x), &x * 2.),
//!     array![10., -4.].view(),
//!     50,
//!     &LineSearchParams::default(),
//!     nop,
//! );
//! assert!(x.iter().all(|v| v.abs() < 1e-2));
//! assert!(f < 1e-4);
//! ```

#![cfg_attr(all(rustc_nightly, test), feature(test))]
#[cfg(all(rustc_nightly, test))]
extern crate test;

#[cfg(test)]
extern crate intel_mkl_src;

pub mod error;
pub mod models;
pub mod numeric;
pub mod prox;
pub mod smooth;

pub use error::{FitError, Result};
