//! # Heat transfer primitives
//!
//! Standard-format expressions shared by the radial exchange solver and the
//! phase models. Conduction uses the log-mean cylindrical shell formula with
//! the conductivity looked up at the mean of the bounding temperatures.

use crate::Thermophysics::nasa7::GAS_CONSTANT;

/// Stefan-Boltzmann constant [W/(m².K⁴)].
pub const SIGMA: f64 = 5.670374419e-08;

/// Steady radial conduction through a cylindrical shell [W].
///
/// `l` is the cell length, `k` the conductivity as a function of
/// temperature, `ru`/`rv` the bounding radii.
#[allow(non_snake_case)]
pub fn conduction<F>(l: f64, k: F, Tu: f64, Tv: f64, ru: f64, rv: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    let Tm = 0.5 * (Tu + Tv);
    let km = k(Tm);
    2.0 * std::f64::consts::PI * l * km * (Tu - Tv) / (rv / ru).ln()
}

/// Standard format convection expression [W].
#[allow(non_snake_case)]
pub fn convection(h: f64, A: f64, Tu: f64, Tv: f64) -> f64 {
    h * A * (Tu - Tv)
}

/// Standard format radiation expression [W].
///
/// `eu`/`au` weight the fourth powers, covering the participating-gas case
/// with distinct emissivity and absorptivity.
#[allow(non_snake_case)]
pub fn radiation(E: f64, A: f64, Tu: f64, Tv: f64, eu: f64, au: f64) -> f64 {
    SIGMA * E * A * (eu * Tu.powi(4) - au * Tv.powi(4))
}

/// Arrhenius kinetic rate at `k0` units, activation energy in J/mol.
#[allow(non_snake_case)]
pub fn arrhenius(k0: f64, Ea: f64, T: f64) -> f64 {
    k0 * (-Ea / (GAS_CONSTANT * T)).exp()
}

/// Maxwell effective medium theory approximation for a gas-solid packing.
pub fn effective_thermal_conductivity(kg: f64, ks: f64, phi: f64) -> f64 {
    let fsum = 2.0 * kg + ks;
    let fdif = ks - kg;
    let num = fsum + 2.0 * phi * fdif;
    let den = fsum - phi * fdif;
    (num / den) * kg
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_convection_sign_convention() {
        assert_relative_eq!(convection(10.0, 2.0, 400.0, 300.0), 2000.0);
        assert!(convection(10.0, 2.0, 300.0, 400.0) < 0.0);
    }

    #[test]
    fn test_radiation_blackbody_limit() {
        let q = radiation(1.0, 1.0, 1000.0, 0.0, 1.0, 1.0);
        assert_relative_eq!(q, SIGMA * 1.0e+12, epsilon = 1e-3);
    }

    #[test]
    fn test_conduction_log_mean_shell() {
        // Constant conductivity: q = 2 pi l k dT / ln(rv/ru).
        let q = conduction(1.0, |_| 2.0, 500.0, 400.0, 0.5, 1.0);
        let expected = 2.0 * std::f64::consts::PI * 2.0 * 100.0 / (2.0_f64).ln();
        assert_relative_eq!(q, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_effective_conductivity_limits() {
        // Zero packing fraction recovers the gas conductivity.
        assert_relative_eq!(effective_thermal_conductivity(0.1, 2.0, 0.0), 0.1);
        // Full packing recovers the solid conductivity.
        assert_relative_eq!(
            effective_thermal_conductivity(0.1, 2.0, 1.0),
            2.0,
            epsilon = 1e-12
        );
    }
}
