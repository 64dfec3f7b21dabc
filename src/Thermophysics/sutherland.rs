//! # Sutherland transport
//!
//! Sutherland viscosity in the OpenFOAM parametric form
//! `mu = As * sqrt(T) / (1 + Ts / T)` with per-species coefficients fitted
//! against Lennard-Jones data, and a modified Eucken correction translating
//! viscosity into thermal conductivity.

use super::nasa7::GAS_CONSTANT;

/// Sutherland coefficient pair `(As, Ts)`.
#[derive(Debug, Clone, Copy)]
pub struct Sutherland {
    /// Sutherland coefficient [Pa.s/K^0.5].
    pub a_s: f64,
    /// Sutherland temperature [K].
    pub t_s: f64,
}

impl Sutherland {
    /// Dynamic viscosity [Pa.s].
    #[allow(non_snake_case)]
    pub fn viscosity(&self, T: f64) -> f64 {
        self.a_s * T.sqrt() / (1.0 + self.t_s / T)
    }

    /// Thermal conductivity by the modified Eucken correlation [W/(m.K)].
    ///
    /// `cp_mass` is the species specific heat [J/(kg.K)] and `mw` its molar
    /// mass [kg/mol].
    #[allow(non_snake_case)]
    pub fn thermal_conductivity(&self, T: f64, cp_mass: f64, mw: f64) -> f64 {
        self.viscosity(T) * (cp_mass + 1.25 * GAS_CONSTANT / mw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_viscosity_against_reference_point() {
        // Nitrogen coefficients reproduce the tabulated 273.15 K value.
        let n2 = Sutherland { a_s: 1.4067e-06, t_s: 111.0 };
        let mu = n2.viscosity(273.15);
        assert_relative_eq!(mu, 1.66e-05, epsilon = 2.0e-07);
    }

    #[test]
    fn test_viscosity_grows_with_temperature() {
        let n2 = Sutherland { a_s: 1.4067e-06, t_s: 111.0 };
        assert!(n2.viscosity(1500.0) > n2.viscosity(300.0));
    }
}
