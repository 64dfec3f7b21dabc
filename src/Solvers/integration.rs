//! # ODE integration on the kiln grid
//!
//! Wraps the [`differential-equations`](https://docs.rs/differential-equations/)
//! crate behind a single entry point that accepts a closure right-hand side,
//! an initial state and the evaluation grid, and returns the trajectory
//! sampled exactly at the grid points. Integration proceeds segment by
//! segment between consecutive grid points so the reported states are
//! solver states, not post-hoc interpolations.

use crate::Solvers::{SolverError, SolverResult};
use differential_equations::methods::{ExplicitRungeKutta, ImplicitRungeKutta};
use differential_equations::ode::{ODE, ODEProblem};
use nalgebra::{DMatrix, SVector};
use serde::{Deserialize, Serialize};

/// Integration methods exposed to the kiln models.
///
/// `Dopri5` fits the smooth phase balances, `Radau5` the stiff bed height
/// equation; `Rk4` is a fixed-step fallback for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationMethod {
    /// Adaptive Dormand-Prince 5(4)
    Dopri5,
    /// Adaptive implicit Radau5 (stiff problems)
    Radau5,
    /// Fixed-step 4th-order Runge-Kutta
    Rk4,
}

/// ODE adapter turning a plain closure into the solver-facing trait object.
struct CallbackOde<'a, F> {
    f: &'a F,
    n: usize,
}

impl<const N: usize, F> ODE<f64, SVector<f64, N>> for CallbackOde<'_, F>
where
    F: Fn(f64, &[f64], &mut [f64]),
{
    fn diff(&self, t: f64, y: &SVector<f64, N>, dydt: &mut SVector<f64, N>) {
        let mut rhs = [0.0; N];
        (self.f)(t, &y.as_slice()[..self.n], &mut rhs[..self.n]);
        for i in 0..N {
            dydt[i] = rhs[i];
        }
    }
}

/// Integrate `dy/dz = f(z, y)` over `grid`, returning one row per grid
/// point. The state dimension is `y0.len()` and must fit the capacity `N`;
/// unused capacity entries stay identically zero.
///
/// `grid[0]` is the integration origin carrying the initial value.
pub fn integrate_on_grid<const N: usize, F>(
    f: F,
    y0: &[f64],
    grid: &[f64],
    method: IntegrationMethod,
    rtol: f64,
    atol: f64,
    model_name: &str,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(f64, &[f64], &mut [f64]),
{
    let n = y0.len();
    if n > N {
        return Err(SolverError::CapacityExceeded { n, capacity: N });
    }
    if grid.len() < 2 || grid.windows(2).any(|w| w[1] <= w[0]) {
        return Err(SolverError::InvalidGrid);
    }

    let ode = CallbackOde { f: &f, n };

    let mut y = SVector::<f64, N>::zeros();
    for i in 0..n {
        y[i] = y0[i];
    }

    let mut out = DMatrix::zeros(grid.len(), n);
    for i in 0..n {
        out[(0, i)] = y0[i];
    }

    for k in 1..grid.len() {
        let t0 = grid[k - 1];
        let tf = grid[k];
        let problem = ODEProblem::new(&ode, t0, tf, y);

        let solution = match method {
            IntegrationMethod::Dopri5 => {
                let mut solver = ExplicitRungeKutta::dopri5().rtol(rtol).atol(atol);
                problem.solve(&mut solver)
            }
            IntegrationMethod::Radau5 => {
                let mut solver = ImplicitRungeKutta::radau5().rtol(rtol).atol(atol);
                problem.solve(&mut solver)
            }
            IntegrationMethod::Rk4 => {
                let mut solver = ExplicitRungeKutta::rk4((tf - t0) / 16.0);
                problem.solve(&mut solver)
            }
        };

        match solution {
            Ok(sol) => {
                y = sol.y[sol.y.len() - 1];
                for i in 0..n {
                    out[(k, i)] = y[i];
                }
            }
            Err(e) => {
                return Err(SolverError::OdeSolverFailed {
                    model: model_name.to_string(),
                    detail: e.to_string(),
                });
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exponential_decay_on_grid() {
        // dy/dz = -y, y(0) = 1 => y = exp(-z)
        let grid = vec![0.0, 0.25, 0.5, 1.0, 2.0];
        let sol = integrate_on_grid::<1, _>(
            |_z, y, dy| dy[0] = -y[0],
            &[1.0],
            &grid,
            IntegrationMethod::Dopri5,
            1e-8,
            1e-10,
            "decay",
        )
        .unwrap();

        for (k, z) in grid.iter().enumerate() {
            assert_relative_eq!(sol[(k, 0)], (-z).exp(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_two_variable_system() {
        // Harmonic oscillator y'' = -y split into first order form.
        let grid: Vec<f64> = (0..9).map(|i| i as f64 * 0.25).collect();
        let sol = integrate_on_grid::<4, _>(
            |_z, y, dy| {
                dy[0] = y[1];
                dy[1] = -y[0];
            },
            &[1.0, 0.0],
            &grid,
            IntegrationMethod::Dopri5,
            1e-9,
            1e-11,
            "oscillator",
        )
        .unwrap();

        for (k, z) in grid.iter().enumerate() {
            assert_relative_eq!(sol[(k, 0)], z.cos(), epsilon = 1e-6);
            assert_relative_eq!(sol[(k, 1)], -z.sin(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_capacity_and_grid_checks() {
        let bad = integrate_on_grid::<1, _>(
            |_z, _y, dy| dy[0] = 0.0,
            &[0.0, 1.0],
            &[0.0, 1.0],
            IntegrationMethod::Dopri5,
            1e-6,
            1e-8,
            "overflow",
        );
        assert!(matches!(bad, Err(SolverError::CapacityExceeded { .. })));

        let bad = integrate_on_grid::<1, _>(
            |_z, _y, dy| dy[0] = 0.0,
            &[1.0],
            &[0.0, 0.0],
            IntegrationMethod::Dopri5,
            1e-6,
            1e-8,
            "grid",
        );
        assert!(matches!(bad, Err(SolverError::InvalidGrid)));
    }
}
