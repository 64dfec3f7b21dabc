//! # Radial heat-exchange constraint solvers
//!
//! The radial steady-state system couples, for every axial cell, the four
//! unknown temperatures (inner wall, coating/refractory interface,
//! refractory/shell interface, outer shell) through four zero residuals.
//! There is no cross-cell coupling, so the stacked 4·N system is solved as N
//! independent 4×4 blocks, each seeded from the previous outer-iteration
//! solution.
//!
//! Two interchangeable strategies are provided and must agree within their
//! tolerances: a damped Newton root finder with finite-difference Jacobian,
//! and a bound-constrained Levenberg-Marquardt program driving all residuals
//! to zero inside the temperature box (the NLP formulation).

use crate::Solvers::{SolverError, SolverResult};
use log::debug;
use nalgebra::{DVector, Matrix4, Vector4};
use serde::{Deserialize, Serialize};

/// Strategy for solving the per-cell constraint blocks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SolverStrategy {
    /// Damped Newton-Raphson root finding, unconstrained.
    RootFinder { tolerance: f64, max_iterations: usize },
    /// Bound-constrained least squares; fails if the final constraint
    /// violation stays above `nlptol`.
    ConstrainedNlp { nlptol: f64, max_iterations: usize },
}

impl Default for SolverStrategy {
    fn default() -> Self {
        SolverStrategy::RootFinder {
            tolerance: 1.0e-06,
            max_iterations: 200,
        }
    }
}

/// Solve the stacked radial system in place.
///
/// `guess` is laid out quantity-major: `[T_wi; T_cr; T_rs; T_sh]`, each
/// slice `n_cells` long. `residual(i, x)` returns the four residuals of
/// cell `i` for the candidate block `x`.
pub fn solve_radial_stack<F>(
    residual: F,
    guess: &mut DVector<f64>,
    n_cells: usize,
    strategy: &SolverStrategy,
    bounds: (f64, f64),
) -> SolverResult<()>
where
    F: Fn(usize, &[f64; 4]) -> [f64; 4],
{
    assert_eq!(guess.len(), 4 * n_cells, "guess layout mismatch");

    for i in 0..n_cells {
        let mut x = [
            guess[i],
            guess[n_cells + i],
            guess[2 * n_cells + i],
            guess[3 * n_cells + i],
        ];

        let block = |x: &[f64; 4]| residual(i, x);
        match strategy {
            SolverStrategy::RootFinder {
                tolerance,
                max_iterations,
            } => solve_block_newton(&block, &mut x, *tolerance, *max_iterations)?,
            SolverStrategy::ConstrainedNlp {
                nlptol,
                max_iterations,
            } => solve_block_nlp(&block, &mut x, bounds, *nlptol, *max_iterations)?,
        }

        guess[i] = x[0];
        guess[n_cells + i] = x[1];
        guess[2 * n_cells + i] = x[2];
        guess[3 * n_cells + i] = x[3];
    }

    Ok(())
}

fn norm_inf(r: &[f64; 4]) -> f64 {
    r.iter().fold(0.0, |acc, v| acc.max(v.abs()))
}

/// Forward-difference Jacobian of a 4-residual block.
fn fd_jacobian<F>(f: &F, x: &[f64; 4], r0: &[f64; 4]) -> Matrix4<f64>
where
    F: Fn(&[f64; 4]) -> [f64; 4],
{
    let mut jac = Matrix4::zeros();
    for j in 0..4 {
        let h = 1.0e-06 * x[j].abs().max(1.0);
        let mut xp = *x;
        xp[j] += h;
        let rp = f(&xp);
        for i in 0..4 {
            jac[(i, j)] = (rp[i] - r0[i]) / h;
        }
    }
    jac
}

/// Damped Newton with halving line search on the residual norm.
fn solve_block_newton<F>(
    f: &F,
    x: &mut [f64; 4],
    tolerance: f64,
    max_iterations: usize,
) -> SolverResult<()>
where
    F: Fn(&[f64; 4]) -> [f64; 4],
{
    let mut r = f(x);
    let mut rnorm = norm_inf(&r);

    for iteration in 0..max_iterations {
        if rnorm <= tolerance {
            debug!("newton block converged in {} iterations", iteration);
            return Ok(());
        }

        let jac = fd_jacobian(f, x, &r);
        let rhs = -Vector4::from_column_slice(&r);
        let dx = jac
            .lu()
            .solve(&rhs)
            .ok_or(SolverError::SingularJacobian)?;

        // Halve the step until the residual norm decreases.
        let mut alpha = 1.0;
        loop {
            let mut xt = *x;
            for i in 0..4 {
                xt[i] += alpha * dx[i];
            }
            let rt = f(&xt);
            let rtnorm = norm_inf(&rt);
            if rtnorm < rnorm || alpha < 1.0 / 1024.0 {
                *x = xt;
                r = rt;
                rnorm = rtnorm;
                break;
            }
            alpha *= 0.5;
        }
    }

    if rnorm <= tolerance {
        Ok(())
    } else {
        Err(SolverError::MaxIterationsExceeded { residual: rnorm })
    }
}

fn clamp_block(x: &mut [f64; 4], bounds: (f64, f64)) {
    for v in x.iter_mut() {
        *v = v.clamp(bounds.0, bounds.1);
    }
}

/// Levenberg-Marquardt on the squared residuals with box clamping.
fn solve_block_nlp<F>(
    f: &F,
    x: &mut [f64; 4],
    bounds: (f64, f64),
    nlptol: f64,
    max_iterations: usize,
) -> SolverResult<()>
where
    F: Fn(&[f64; 4]) -> [f64; 4],
{
    clamp_block(x, bounds);
    let mut r = f(x);
    let mut cost = r.iter().map(|v| v * v).sum::<f64>();
    let mut lambda = 1.0e-03;

    for _ in 0..max_iterations {
        if norm_inf(&r) <= nlptol {
            return Ok(());
        }

        let jac = fd_jacobian(f, x, &r);
        let jt = jac.transpose();
        let mut jtj = jt * jac;
        let jtr = jt * Vector4::from_column_slice(&r);

        // Marquardt diagonal scaling with a floor against flat directions.
        for i in 0..4 {
            jtj[(i, i)] += lambda * jtj[(i, i)].max(1.0e-12);
        }

        let dx = match jtj.lu().solve(&(-jtr)) {
            Some(step) => step,
            None => {
                lambda *= 10.0;
                continue;
            }
        };

        let mut xt = *x;
        for i in 0..4 {
            xt[i] += dx[i];
        }
        clamp_block(&mut xt, bounds);

        let rt = f(&xt);
        let cost_t = rt.iter().map(|v| v * v).sum::<f64>();
        if cost_t < cost {
            *x = xt;
            r = rt;
            cost = cost_t;
            lambda = (lambda / 3.0).max(1.0e-12);
        } else {
            lambda *= 10.0;
            if lambda > 1.0e+14 {
                break;
            }
        }
    }

    let violation = norm_inf(&r);
    if violation <= nlptol {
        Ok(())
    } else {
        Err(SolverError::ConstraintViolation {
            violation,
            tolerance: nlptol,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// A smooth nonlinear block with known root x = (1, 2, 3, 4).
    fn reference_block(x: &[f64; 4]) -> [f64; 4] {
        [
            x[0] * x[0] - 1.0,
            x[1] + x[0] - 3.0,
            x[2] * x[1] - 6.0,
            x[3] - x[2] - 1.0,
        ]
    }

    #[test]
    fn test_newton_block_finds_root() {
        let mut x = [2.0, 1.0, 1.0, 1.0];
        solve_block_newton(&reference_block, &mut x, 1.0e-10, 100).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(x[1], 2.0, epsilon = 1e-8);
        assert_relative_eq!(x[2], 3.0, epsilon = 1e-8);
        assert_relative_eq!(x[3], 4.0, epsilon = 1e-8);
    }

    #[test]
    fn test_nlp_block_matches_newton() {
        let mut x_newton = [2.0, 1.0, 1.0, 1.0];
        let mut x_nlp = [2.0, 1.0, 1.0, 1.0];
        solve_block_newton(&reference_block, &mut x_newton, 1.0e-10, 100).unwrap();
        solve_block_nlp(&reference_block, &mut x_nlp, (0.0, 10.0), 1.0e-08, 500).unwrap();
        for i in 0..4 {
            assert_relative_eq!(x_newton[i], x_nlp[i], max_relative = 1e-4);
        }
    }

    #[test]
    fn test_stacked_layout_roundtrip() {
        // Two identical cells; the stack must solve both blocks.
        let mut guess = DVector::from_vec(vec![2.0, 2.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        solve_radial_stack(
            |_i, x| reference_block(x),
            &mut guess,
            2,
            &SolverStrategy::default(),
            (0.0, 10.0),
        )
        .unwrap();
        for i in 0..2 {
            assert_relative_eq!(guess[i], 1.0, epsilon = 1e-6);
            assert_relative_eq!(guess[2 + i], 2.0, epsilon = 1e-6);
            assert_relative_eq!(guess[4 + i], 3.0, epsilon = 1e-6);
            assert_relative_eq!(guess[6 + i], 4.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_nlp_reports_violation_when_infeasible() {
        // Residual that cannot reach zero inside the box.
        let infeasible = |x: &[f64; 4]| [x[0] - 20.0, x[1], x[2], x[3]];
        let mut x = [1.0, 1.0, 1.0, 1.0];
        let out = solve_block_nlp(&infeasible, &mut x, (0.0, 10.0), 1.0e-08, 200);
        assert!(matches!(
            out,
            Err(SolverError::ConstraintViolation { .. })
        ));
    }
}
