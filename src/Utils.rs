/// piecewise-linear interpolation with safe extrapolation at both grid ends,
/// used for heat flux boundary conditions and section property lookups
pub mod interpolation;
/// trapezoid and Simpson quadrature over non-uniform grids
pub mod quadrature;
