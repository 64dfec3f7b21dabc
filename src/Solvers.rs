/// ODE integration service over closure right-hand sides, evaluated on the
/// kiln grid
pub mod integration;
/// nonlinear steady-state constraint solvers for the radial heat exchange
/// system: damped Newton root finding and bound-constrained least squares
pub mod steady_state;

use thiserror::Error;

/// Result type for solver operations.
pub type SolverResult<T> = Result<T, SolverError>;

/// Errors raised by the numerical services.
#[derive(Debug, Error)]
pub enum SolverError {
    /// ODE solver reported non-success for the named sub-model
    #[error("ODE solver failed for {model}: {detail}")]
    OdeSolverFailed { model: String, detail: String },
    /// State vector does not fit the integrator capacity
    #[error("Problem has {n} variables but integrator capacity is {capacity}")]
    CapacityExceeded { n: usize, capacity: usize },
    /// Grid for trajectory evaluation is degenerate
    #[error("Evaluation grid must have at least two increasing points")]
    InvalidGrid,
    /// Newton iteration hit the budget before reaching tolerance
    #[error("Maximum iterations exceeded, residual norm {residual:.6e}")]
    MaxIterationsExceeded { residual: f64 },
    /// Singular Jacobian matrix encountered
    #[error("Singular Jacobian matrix")]
    SingularJacobian,
    /// Constraint violation left above tolerance by the NLP strategy
    #[error("Constraint violation {violation:.6e} above tolerance {tolerance:.6e}")]
    ConstraintViolation { violation: f64, tolerance: f64 },
}
