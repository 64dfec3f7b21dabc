//! # NASA-7 polynomials
//!
//! Two-range NASA-7 evaluation of dimensionless ideal gas properties:
//!
//! ```text
//! Cp/R = a0 + a1*T + a2*T² + a3*T³ + a4*T⁴
//! H/RT = a0 + a1/2*T + a2/3*T² + a3/4*T³ + a4/5*T⁴ + a5/T
//! S/R  = a0*ln(T) + a1*T + a2/2*T² + a3/3*T³ + a4/4*T⁴ + a6
//! ```
//!
//! Enthalpy includes the heat of formation through the `a5` integration
//! constant, so species enthalpies can be differenced directly for reaction
//! heat release.

/// Universal gas constant [J/(mol.K)].
pub const GAS_CONSTANT: f64 = 8.314462618;

/// Two-range NASA-7 coefficient set with its range-switch temperature.
#[derive(Debug, Clone, Copy)]
pub struct Nasa7 {
    pub t_low: f64,
    pub t_mid: f64,
    pub t_high: f64,
    pub lo: [f64; 7],
    pub hi: [f64; 7],
}

impl Nasa7 {
    fn select(&self, T: f64) -> &[f64; 7] {
        if T < self.t_mid { &self.lo } else { &self.hi }
    }

    /// Specific heat at constant pressure [J/(mol.K)].
    #[allow(non_snake_case)]
    pub fn specific_heat_mole(&self, T: f64) -> f64 {
        let a = self.select(T);
        GAS_CONSTANT * (a[0] + a[1] * T + a[2] * T.powi(2) + a[3] * T.powi(3) + a[4] * T.powi(4))
    }

    /// Enthalpy including formation contribution [J/mol].
    #[allow(non_snake_case)]
    pub fn enthalpy_mole(&self, T: f64) -> f64 {
        let a = self.select(T);
        GAS_CONSTANT
            * T
            * (a[0]
                + a[1] / 2.0 * T
                + a[2] / 3.0 * T.powi(2)
                + a[3] / 4.0 * T.powi(3)
                + a[4] / 5.0 * T.powi(4)
                + a[5] / T)
    }

    /// Entropy [J/(mol.K)].
    #[allow(non_snake_case)]
    pub fn entropy_mole(&self, T: f64) -> f64 {
        let a = self.select(T);
        GAS_CONSTANT
            * (a[0] * T.ln()
                + a[1] * T
                + a[2] / 2.0 * T.powi(2)
                + a[3] / 3.0 * T.powi(3)
                + a[4] / 4.0 * T.powi(4)
                + a[6])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // Argon is a constant-Cp monatomic gas, convenient for closed checks.
    const AR: Nasa7 = Nasa7 {
        t_low: 200.0,
        t_mid: 1000.0,
        t_high: 5000.0,
        lo: [2.5, 0.0, 0.0, 0.0, 0.0, -745.375, 4.366],
        hi: [2.5, 0.0, 0.0, 0.0, 0.0, -745.375, 4.366],
    };

    #[test]
    fn test_monatomic_specific_heat() {
        assert_relative_eq!(
            AR.specific_heat_mole(300.0),
            2.5 * GAS_CONSTANT,
            epsilon = 1e-10
        );
        assert_relative_eq!(
            AR.specific_heat_mole(2000.0),
            2.5 * GAS_CONSTANT,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_enthalpy_slope_matches_cp() {
        let dt = 1.0e-3;
        let dh = (AR.enthalpy_mole(500.0 + dt) - AR.enthalpy_mole(500.0 - dt)) / (2.0 * dt);
        assert_relative_eq!(dh, AR.specific_heat_mole(500.0), epsilon = 1e-6);
    }
}
