//! # Kramers (1952) bed height model
//!
//! Ordinary differential equation for the bed height profile of a rotary
//! kiln. With `alpha` the kiln slope, `beta` the material repose angle and
//! `phi` the local flow-rate/geometry factor, the height obeys
//!
//! ```text
//! dh/dz = -tan(beta) * ( tan(alpha)/sin(beta) - phi*((2 - h/R)*(h/R))^(-3/2) )
//! phi   = (3/4) * Vdot / (pi * n * R^3)
//! ```
//!
//! The kiln coordinate starts at the product discharge end, so the boundary
//! condition is the discharge height and integration proceeds towards the
//! feed end.

use crate::Kiln::rotary_kiln::KilnError;
use crate::Solvers::integration::{IntegrationMethod, integrate_on_grid};
use log::info;

/// Right-hand side of Kramers' equation for integration.
///
/// `radius` gives the internal kiln radius as a function of the axial
/// coordinate, so coated or conical kilns reuse the same model.
pub struct KramersModel<R>
where
    R: Fn(f64) -> f64,
{
    radius: R,
    rotation_rate: f64,
    vdot: f64,
    terml: f64,
    tan_b: f64,
}

impl<R> KramersModel<R>
where
    R: Fn(f64) -> f64,
{
    /// `slope` and `repose_angle` in radians, `rotation_rate` in rev/s,
    /// `feed_rate` in kg/s, `rho` the bulk density in kg/m³.
    pub fn new(
        radius: R,
        slope: f64,
        rotation_rate: f64,
        feed_rate: f64,
        repose_angle: f64,
        rho: f64,
    ) -> Self {
        Self {
            radius,
            rotation_rate,
            vdot: feed_rate / rho,
            terml: slope.tan() / repose_angle.sin(),
            tan_b: repose_angle.tan(),
        }
    }

    /// Evaluate `dh/dz` at position `z` for height `h`.
    pub fn rate(&self, z: f64, h: f64) -> f64 {
        let r = (self.radius)(z);
        let ratio = h / r;
        let phi = 0.75 * self.vdot / (std::f64::consts::PI * r.powi(3) * self.rotation_rate);
        let termr = phi * ((2.0 - ratio) * ratio).powf(-1.5);
        -self.tan_b * (self.terml - termr)
    }

    /// Fully developed bed height from the algebraic steady relation
    /// `terml = termr`, if one exists for the given parameters.
    pub fn steady_height(&self, z: f64) -> Option<f64> {
        let r = (self.radius)(z);
        let phi = 0.75 * self.vdot / (std::f64::consts::PI * r.powi(3) * self.rotation_rate);
        // (2x - x^2) = (phi / terml)^(2/3) with x = h/R.
        let c = (phi / self.terml).powf(2.0 / 3.0);
        if !(0.0..1.0).contains(&c) {
            return None;
        }
        Some(r * (1.0 - (1.0 - c).sqrt()))
    }
}

/// Solve Kramers' model over `[0, L]` and report heights on `z_eval`.
///
/// A zero discharge height is replaced by `frac` of the local radius to
/// avoid the singular `(h/R)` ratio at the boundary.
#[allow(clippy::too_many_arguments)]
pub fn solve_kramers_model<R>(
    radius: R,
    length: f64,
    slope: f64,
    rotation_rate: f64,
    feed_rate: f64,
    repose_angle: f64,
    rho: f64,
    discharge_height: f64,
    z_eval: &[f64],
    method: IntegrationMethod,
    frac: f64,
) -> Result<Vec<f64>, KilnError>
where
    R: Fn(f64) -> f64,
{
    if z_eval.is_empty()
        || z_eval.iter().any(|&z| z < 0.0 || z > length)
    {
        return Err(KilnError::EvaluationOutsideDomain);
    }

    let y0 = discharge_height.max(frac * radius(0.0));
    let model = KramersModel::new(radius, slope, rotation_rate, feed_rate, repose_angle, rho);

    let solution = integrate_on_grid::<1, _>(
        |z, y, dy| dy[0] = model.rate(z, y[0]),
        &[y0],
        z_eval,
        method,
        1.0e-08,
        1.0e-10,
        "KramersModel",
    )
    .map_err(KilnError::Integration)?;

    info!(
        "Kramers profile solved: h(0) = {:.4} m, h(L) = {:.4} m",
        solution[(0, 0)],
        solution[(z_eval.len() - 1, 0)]
    );

    Ok(solution.column(0).iter().copied().collect())
}
