//! # Freeboard gas mixture
//!
//! Closed-form thermophysics provider for the single-step methane
//! combustion system. State is always `(T, Y)` with the 6 species ordered as
//! in the reaction equation `CH4 + 2 O2 => CO2 + 2 H2O` followed by the
//! inerts `AR` and `N2`; the phase models rely on this ordering through
//! [`STOICH_COEFS`].

use super::nasa7::{GAS_CONSTANT, Nasa7};
use super::sutherland::Sutherland;
use std::collections::HashMap;

/// Number of species carried by the freeboard state vector.
pub const N_SPECIES: usize = 6;

/// Species names in mechanism order.
pub const SPECIES_NAMES: [&str; N_SPECIES] = ["CH4", "O2", "CO2", "H2O", "AR", "N2"];

/// Signed stoichiometric coefficients of `CH4 + 2 O2 => CO2 + 2 H2O`.
pub const STOICH_COEFS: [f64; N_SPECIES] = [-1.0, -2.0, 1.0, 2.0, 0.0, 0.0];

/// Standard atmosphere [Pa].
pub const ONE_ATM: f64 = 101325.0;

/// Thermophysical record of one species.
#[derive(Debug, Clone, Copy)]
pub struct SpeciesData {
    pub name: &'static str,
    /// Molar mass [kg/mol].
    pub mw: f64,
    pub thermo: Nasa7,
    pub transport: Sutherland,
}

/// Mixture-level thermophysics interface consumed by the phase models.
///
/// All properties are functions of `(T, Y)` at the provider's fixed
/// operating pressure. Implementations must be stateless from the caller's
/// point of view.
#[allow(non_snake_case)]
pub trait GasThermo {
    fn n_species(&self) -> usize;
    fn species_index(&self, name: &str) -> Option<usize>;
    /// Molar masses [kg/mol].
    fn molar_masses(&self) -> &[f64];
    /// Mean molar mass of the mixture [kg/mol].
    fn mean_molar_mass(&self, Y: &[f64]) -> f64;
    /// Mass to mole fraction conversion.
    fn mole_fractions(&self, Y: &[f64]) -> Vec<f64>;
    /// Mole to mass fraction conversion.
    fn mass_fractions(&self, X: &[f64]) -> Vec<f64>;
    /// Ideal gas density [kg/m³].
    fn density(&self, T: f64, Y: &[f64]) -> f64;
    /// Mixture specific heat [J/(kg.K)].
    fn specific_heat_mass(&self, T: f64, Y: &[f64]) -> f64;
    /// Mixture enthalpy [J/kg].
    fn enthalpy_mass(&self, T: f64, Y: &[f64]) -> f64;
    /// Species partial mass enthalpies [J/kg].
    fn partial_enthalpies_mass(&self, T: f64) -> Vec<f64>;
    /// Mixture dynamic viscosity [Pa.s].
    fn viscosity(&self, T: f64, Y: &[f64]) -> f64;
    /// Mixture thermal conductivity [W/(m.K)].
    fn thermal_conductivity(&self, T: f64, Y: &[f64]) -> f64;
}

/// Thermophysics of the 6-species single-step methane system.
#[derive(Debug, Clone)]
pub struct Methane1SGas {
    /// Operating pressure [Pa].
    pub pressure: f64,
    species: [SpeciesData; N_SPECIES],
    mw: [f64; N_SPECIES],
}

impl Methane1SGas {
    pub fn new(pressure: f64) -> Self {
        let species = species_data();
        let mut mw = [0.0; N_SPECIES];
        for (i, s) in species.iter().enumerate() {
            mw[i] = s.mw;
        }
        Self { pressure, species, mw }
    }

    /// Premixed composition (mass fractions) at equivalence ratio `phi`.
    ///
    /// `fuel` and `oxid` are mole-fraction compositions; the stoichiometric
    /// reference is one mole of CH4 per two moles of O2.
    #[allow(non_snake_case)]
    pub fn premixed(
        &self,
        phi: f64,
        fuel: &HashMap<String, f64>,
        oxid: &HashMap<String, f64>,
    ) -> Result<[f64; N_SPECIES], String> {
        let unpack = |comp: &HashMap<String, f64>| -> Result<[f64; N_SPECIES], String> {
            let mut x = [0.0; N_SPECIES];
            for (name, value) in comp {
                let idx = self
                    .species_index(name)
                    .ok_or_else(|| format!("Unknown species {}", name))?;
                x[idx] = *value;
            }
            let total: f64 = x.iter().sum();
            if total <= 0.0 {
                return Err("Empty composition".to_string());
            }
            x.iter_mut().for_each(|v| *v /= total);
            Ok(x)
        };

        let x_fuel = unpack(fuel)?;
        let x_oxid = unpack(oxid)?;

        let idx_f = 0;
        let idx_o = 1;
        if x_fuel[idx_f] <= 0.0 {
            return Err("Fuel must contain CH4".to_string());
        }
        if x_oxid[idx_o] <= 0.0 {
            return Err("Oxidizer must contain O2".to_string());
        }

        // Moles of fuel blended with one mole of oxidizer so that the
        // CH4:O2 ratio equals phi/2.
        let n_fuel = 0.5 * phi * x_oxid[idx_o] / x_fuel[idx_f];

        let mut x = [0.0; N_SPECIES];
        for k in 0..N_SPECIES {
            x[k] = n_fuel * x_fuel[k] + x_oxid[k];
        }
        let total: f64 = x.iter().sum();
        x.iter_mut().for_each(|v| *v /= total);

        let y = self.mass_fractions(&x);
        let mut out = [0.0; N_SPECIES];
        out.copy_from_slice(&y);
        Ok(out)
    }

    /// Composition after complete combustion of the lean/rich limiting
    /// reactant, in mass fractions.
    #[allow(non_snake_case)]
    pub fn complete_combustion(&self, Y: &[f64]) -> [f64; N_SPECIES] {
        let x = self.mole_fractions(Y);
        let burned = x[0].min(x[1] / 2.0);
        let mut xb = [0.0; N_SPECIES];
        for k in 0..N_SPECIES {
            xb[k] = x[k] + STOICH_COEFS[k] * burned;
        }
        let total: f64 = xb.iter().sum();
        xb.iter_mut().for_each(|v| *v /= total);
        let y = self.mass_fractions(&xb);
        let mut out = [0.0; N_SPECIES];
        out.copy_from_slice(&y);
        out
    }

    /// Constant-pressure adiabatic equilibration by complete combustion:
    /// burn the limiting reactant and return the temperature conserving the
    /// mixture enthalpy.
    #[allow(non_snake_case)]
    pub fn equilibrate_hp(&self, T0: f64, Y: &[f64]) -> (f64, [f64; N_SPECIES]) {
        let y_prod = self.complete_combustion(Y);
        let h_target = self.enthalpy_mass(T0, Y);
        let T = self.temperature_from_enthalpy(h_target, &y_prod, T0.max(1000.0));
        (T, y_prod)
    }

    /// Enthalpy-conserving mixing of two streams at the same pressure.
    #[allow(non_snake_case)]
    pub fn mix_streams(
        &self,
        m1: f64,
        T1: f64,
        Y1: &[f64],
        m2: f64,
        T2: f64,
        Y2: &[f64],
    ) -> (f64, f64, [f64; N_SPECIES]) {
        let m = m1 + m2;
        let mut y = [0.0; N_SPECIES];
        for k in 0..N_SPECIES {
            y[k] = (m1 * Y1[k] + m2 * Y2[k]) / m;
        }
        let h = (m1 * self.enthalpy_mass(T1, Y1) + m2 * self.enthalpy_mass(T2, Y2)) / m;
        let T = self.temperature_from_enthalpy(h, &y, 0.5 * (T1 + T2));
        (m, T, y)
    }

    /// Invert `h(T)` by Newton iteration; `h` is monotonic in temperature.
    #[allow(non_snake_case)]
    fn temperature_from_enthalpy(&self, h_target: f64, Y: &[f64], T_start: f64) -> f64 {
        let mut T = T_start;
        for _ in 0..50 {
            let h = self.enthalpy_mass(T, Y);
            let cp = self.specific_heat_mass(T, Y);
            let dT = (h_target - h) / cp;
            T += dT;
            if dT.abs() < 1.0e-08 * T.abs() {
                break;
            }
        }
        T
    }
}

#[allow(non_snake_case)]
impl GasThermo for Methane1SGas {
    fn n_species(&self) -> usize {
        N_SPECIES
    }

    fn species_index(&self, name: &str) -> Option<usize> {
        SPECIES_NAMES.iter().position(|&s| s == name)
    }

    fn molar_masses(&self) -> &[f64] {
        &self.mw
    }

    fn mean_molar_mass(&self, Y: &[f64]) -> f64 {
        // M = 1 / sum(Y_k / M_k)
        let inv: f64 = Y.iter().zip(self.mw.iter()).map(|(y, m)| y / m).sum();
        1.0 / inv
    }

    fn mole_fractions(&self, Y: &[f64]) -> Vec<f64> {
        let mean = self.mean_molar_mass(Y);
        Y.iter()
            .zip(self.mw.iter())
            .map(|(y, m)| y * mean / m)
            .collect()
    }

    fn mass_fractions(&self, X: &[f64]) -> Vec<f64> {
        let mean: f64 = X.iter().zip(self.mw.iter()).map(|(x, m)| x * m).sum();
        X.iter()
            .zip(self.mw.iter())
            .map(|(x, m)| x * m / mean)
            .collect()
    }

    fn density(&self, T: f64, Y: &[f64]) -> f64 {
        self.pressure * self.mean_molar_mass(Y) / (GAS_CONSTANT * T)
    }

    fn specific_heat_mass(&self, T: f64, Y: &[f64]) -> f64 {
        Y.iter()
            .zip(self.species.iter())
            .map(|(y, s)| y * s.thermo.specific_heat_mole(T) / s.mw)
            .sum()
    }

    fn enthalpy_mass(&self, T: f64, Y: &[f64]) -> f64 {
        Y.iter()
            .zip(self.species.iter())
            .map(|(y, s)| y * s.thermo.enthalpy_mole(T) / s.mw)
            .sum()
    }

    fn partial_enthalpies_mass(&self, T: f64) -> Vec<f64> {
        self.species
            .iter()
            .map(|s| s.thermo.enthalpy_mole(T) / s.mw)
            .collect()
    }

    fn viscosity(&self, T: f64, Y: &[f64]) -> f64 {
        let x = self.mole_fractions(Y);
        x.iter()
            .zip(self.species.iter())
            .map(|(xi, s)| xi * s.transport.viscosity(T))
            .sum()
    }

    fn thermal_conductivity(&self, T: f64, Y: &[f64]) -> f64 {
        let x = self.mole_fractions(Y);
        x.iter()
            .zip(self.species.iter())
            .map(|(xi, s)| {
                let cp_mass = s.thermo.specific_heat_mole(T) / s.mw;
                xi * s.transport.thermal_conductivity(T, cp_mass, s.mw)
            })
            .sum()
    }
}

/// GRI-Mech 3.0 NASA-7 data with Sutherland fits of the Lennard-Jones
/// viscosities.
fn species_data() -> [SpeciesData; N_SPECIES] {
    [
        SpeciesData {
            name: "CH4",
            mw: 0.016043,
            thermo: Nasa7 {
                t_low: 200.0,
                t_mid: 1000.0,
                t_high: 3500.0,
                lo: [
                    5.14987613e+00,
                    -1.36709788e-02,
                    4.91800599e-05,
                    -4.84743026e-08,
                    1.66693956e-11,
                    -1.02466476e+04,
                    -4.64130376e+00,
                ],
                hi: [
                    7.48514950e-02,
                    1.33909467e-02,
                    -5.73285809e-06,
                    1.22292535e-09,
                    -1.01815230e-13,
                    -9.46834459e+03,
                    1.84373180e+01,
                ],
            },
            transport: Sutherland { a_s: 1.0720e-06, t_s: 198.0 },
        },
        SpeciesData {
            name: "O2",
            mw: 0.031998,
            thermo: Nasa7 {
                t_low: 200.0,
                t_mid: 1000.0,
                t_high: 3500.0,
                lo: [
                    3.78245636e+00,
                    -2.99673416e-03,
                    9.84730201e-06,
                    -9.68129509e-09,
                    3.24372837e-12,
                    -1.06394356e+03,
                    3.65767573e+00,
                ],
                hi: [
                    3.28253784e+00,
                    1.48308754e-03,
                    -7.57966669e-07,
                    2.09470555e-10,
                    -2.16717794e-14,
                    -1.08845772e+03,
                    5.45323129e+00,
                ],
            },
            transport: Sutherland { a_s: 1.7530e-06, t_s: 139.0 },
        },
        SpeciesData {
            name: "CO2",
            mw: 0.044009,
            thermo: Nasa7 {
                t_low: 200.0,
                t_mid: 1000.0,
                t_high: 3500.0,
                lo: [
                    2.35677352e+00,
                    8.98459677e-03,
                    -7.12356269e-06,
                    2.45919022e-09,
                    -1.43699548e-13,
                    -4.83719697e+04,
                    9.90105222e+00,
                ],
                hi: [
                    3.85746029e+00,
                    4.41437026e-03,
                    -2.21481404e-06,
                    5.23490188e-10,
                    -4.72084164e-14,
                    -4.87591660e+04,
                    2.27163806e+00,
                ],
            },
            transport: Sutherland { a_s: 1.5030e-06, t_s: 222.0 },
        },
        SpeciesData {
            name: "H2O",
            mw: 0.018015,
            thermo: Nasa7 {
                t_low: 200.0,
                t_mid: 1000.0,
                t_high: 3500.0,
                lo: [
                    4.19864056e+00,
                    -2.03643410e-03,
                    6.52040211e-06,
                    -5.48797062e-09,
                    1.77197817e-12,
                    -3.02937267e+04,
                    -8.49032208e-01,
                ],
                hi: [
                    3.03399249e+00,
                    2.17691804e-03,
                    -1.64072518e-07,
                    -9.70419870e-11,
                    1.68200992e-14,
                    -3.00042971e+04,
                    4.96677010e+00,
                ],
            },
            transport: Sutherland { a_s: 2.2400e-06, t_s: 961.0 },
        },
        SpeciesData {
            name: "AR",
            mw: 0.039950,
            thermo: Nasa7 {
                t_low: 200.0,
                t_mid: 1000.0,
                t_high: 5000.0,
                lo: [2.5, 0.0, 0.0, 0.0, 0.0, -745.375, 4.366],
                hi: [2.5, 0.0, 0.0, 0.0, 0.0, -745.375, 4.366],
            },
            transport: Sutherland { a_s: 1.9660e-06, t_s: 144.4 },
        },
        SpeciesData {
            name: "N2",
            mw: 0.028014,
            thermo: Nasa7 {
                t_low: 300.0,
                t_mid: 1000.0,
                t_high: 5000.0,
                lo: [
                    3.29867700e+00,
                    1.40824040e-03,
                    -3.96322200e-06,
                    5.64151500e-09,
                    -2.44485400e-12,
                    -1.02089990e+03,
                    3.95037200e+00,
                ],
                hi: [
                    2.92664000e+00,
                    1.48797680e-03,
                    -5.68476000e-07,
                    1.00970380e-10,
                    -6.75335100e-15,
                    -9.22797700e+02,
                    5.98052800e+00,
                ],
            },
            transport: Sutherland { a_s: 1.4067e-06, t_s: 111.0 },
        },
    ]
}

/// Air composition in mole fractions, as used by the leak model.
pub fn air_composition() -> HashMap<String, f64> {
    HashMap::from([
        ("N2".to_string(), 0.78),
        ("O2".to_string(), 0.21),
        ("AR".to_string(), 0.01),
    ])
}

/// Pure methane fuel in mole fractions.
pub fn methane_fuel() -> HashMap<String, f64> {
    HashMap::from([("CH4".to_string(), 1.0)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fraction_conversion_roundtrip() {
        let gas = Methane1SGas::new(ONE_ATM);
        let y = [0.05, 0.20, 0.03, 0.02, 0.01, 0.69];
        let x = gas.mole_fractions(&y);
        let y_back = gas.mass_fractions(&x);
        for k in 0..N_SPECIES {
            assert_relative_eq!(y[k], y_back[k], epsilon = 1e-12);
        }
        assert_relative_eq!(x.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_air_density_at_ambient() {
        let gas = Methane1SGas::new(ONE_ATM);
        let air = gas.mass_fractions(&[0.0, 0.21, 0.0, 0.0, 0.01, 0.78]);
        let rho = gas.density(298.15, &air);
        assert_relative_eq!(rho, 1.18, epsilon = 0.02);
    }

    #[test]
    fn test_premixed_stoichiometric_ratio() {
        let gas = Methane1SGas::new(ONE_ATM);
        let y = gas
            .premixed(1.0, &methane_fuel(), &air_composition())
            .unwrap();
        let x = gas.mole_fractions(&y);
        // At phi = 1 the mixture carries exactly half a mole CH4 per mole O2.
        assert_relative_eq!(x[0] / x[1], 0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_complete_combustion_consumes_fuel_when_lean() {
        let gas = Methane1SGas::new(ONE_ATM);
        let y0 = gas
            .premixed(0.9, &methane_fuel(), &air_composition())
            .unwrap();
        let y1 = gas.complete_combustion(&y0);
        assert!(y1[0] < 1e-14, "CH4 must be fully consumed, got {}", y1[0]);
        assert!(y1[1] > 0.0, "lean mixture must keep excess O2");
        assert_relative_eq!(y1.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_adiabatic_flame_temperature_magnitude() {
        let gas = Methane1SGas::new(ONE_ATM);
        let y0 = gas
            .premixed(1.0, &methane_fuel(), &air_composition())
            .unwrap();
        let (t_ad, _) = gas.equilibrate_hp(298.15, &y0);
        // Complete-combustion adiabatic flame of methane in air: the
        // no-dissociation estimate lands above the equilibrium 2226 K.
        assert!(t_ad > 2100.0 && t_ad < 2500.0, "T_ad = {}", t_ad);
    }

    #[test]
    fn test_mixing_conserves_enthalpy() {
        let gas = Methane1SGas::new(ONE_ATM);
        let y_hot = gas.complete_combustion(
            &gas.premixed(1.0, &methane_fuel(), &air_composition())
                .unwrap(),
        );
        let y_cold: [f64; 6] = {
            let mut y = [0.0; 6];
            y.copy_from_slice(&gas.mass_fractions(&[0.0, 0.21, 0.0, 0.0, 0.01, 0.78]));
            y
        };
        let (m, t, y) = gas.mix_streams(1.0, 1800.0, &y_hot, 1.0, 300.0, &y_cold);
        assert_relative_eq!(m, 2.0, epsilon = 1e-14);
        let h_mix = gas.enthalpy_mass(t, &y);
        let h_ref = 0.5 * (gas.enthalpy_mass(1800.0, &y_hot) + gas.enthalpy_mass(300.0, &y_cold));
        assert_relative_eq!(h_mix, h_ref, epsilon = 1.0);
        assert!(t > 300.0 && t < 1800.0);
    }
}
