//! # Freeboard gas phase
//!
//! Mass, energy and species balances of the gas region above the bed. The
//! state vector is `[mdot, T, Y...]` in kiln coordinates. Combustion
//! kinetics is a closure selected once at construction: either the
//! mechanism's own mass-action rate, or the eddy break-up blend of
//! Mujumdar (2006) taking the exact minimum of the mixing-limited and
//! Arrhenius-limited rates of single-step methane oxidation.

use crate::Kiln::rotary_kiln::KilnError;
use crate::Models::heat_transfer::arrhenius;
use crate::Phases::bases::{PhaseOdeSystem, SectionLookup};
use crate::Thermophysics::gas_mixture::{
    GasThermo, Methane1SGas, N_SPECIES, STOICH_COEFS,
};
use crate::Utils::interpolation::Interp1d;
use enum_dispatch::enum_dispatch;
use log::info;
use nalgebra::DVector;
use std::collections::HashMap;

/// Combustion rate closure interface.
///
/// Returns species production rates in mass units [kg/(m³.s)]; `ke` is the
/// local turbulence `k/epsilon` ratio consumed by the eddy break-up rate.
#[enum_dispatch]
#[allow(non_snake_case)]
pub trait RateClosure {
    fn wdot_mass(
        &self,
        gas: &Methane1SGas,
        rho: f64,
        T: f64,
        Y: &[f64],
        ke: f64,
    ) -> [f64; N_SPECIES];
}

/// Mass-action kinetics of the single-step mechanism.
#[derive(Debug, Clone, Copy)]
#[allow(non_snake_case)]
pub struct MassActionKinetics {
    pub k0: f64,
    pub Ea: f64,
}

impl Default for MassActionKinetics {
    fn default() -> Self {
        Self {
            k0: 1.600e+10,
            Ea: 1.081e+05,
        }
    }
}

#[allow(non_snake_case)]
impl RateClosure for MassActionKinetics {
    fn wdot_mass(
        &self,
        gas: &Methane1SGas,
        rho: f64,
        T: f64,
        Y: &[f64],
        _ke: f64,
    ) -> [f64; N_SPECIES] {
        let (yf, yo) = (Y[0], Y[1]);
        let rate = rho * rho * yf * yo * arrhenius(self.k0, self.Ea, T);
        species_rates(gas, rate)
    }
}

/// Eddy break-up limited kinetics: `min(R_ebu, R_arr)`.
///
/// The minimum is a combustion-regime switch between mixing-limited and
/// kinetically-limited burning; it is evaluated exactly, without smoothing.
#[derive(Debug, Clone, Copy)]
#[allow(non_snake_case)]
pub struct EddyBreakUpKinetics {
    /// EBU rate constant.
    pub cr: f64,
    /// Stoichiometric oxidizer-to-fuel mass ratio.
    pub bo: f64,
    pub k0: f64,
    pub Ea: f64,
}

impl Default for EddyBreakUpKinetics {
    fn default() -> Self {
        Self {
            cr: 4.000e+00,
            bo: 4.375e+00,
            k0: 1.600e+10,
            Ea: 1.081e+05,
        }
    }
}

#[allow(non_snake_case)]
impl RateClosure for EddyBreakUpKinetics {
    fn wdot_mass(
        &self,
        gas: &Methane1SGas,
        rho: f64,
        T: f64,
        Y: &[f64],
        ke: f64,
    ) -> [f64; N_SPECIES] {
        let (yf, yo) = (Y[0], Y[1]);
        let r_ebu = rho * self.cr * ke * yf.min(yo / self.bo);
        let r_arr = rho * rho * yf * yo * arrhenius(self.k0, self.Ea, T);
        species_rates(gas, r_ebu.min(r_arr))
    }
}

/// Distribute the CH4 consumption rate over all species through the
/// stoichiometric coefficients.
fn species_rates(gas: &Methane1SGas, rate_ch4_mass: f64) -> [f64; N_SPECIES] {
    let mw = gas.molar_masses();
    let rt = rate_ch4_mass / mw[0];
    let mut wdot = [0.0; N_SPECIES];
    for k in 0..N_SPECIES {
        wdot[k] = rt * STOICH_COEFS[k] * mw[k];
    }
    wdot
}

/// Kinetics closure resolved once at model construction.
#[enum_dispatch(RateClosure)]
pub enum KineticsClosure {
    MassAction(MassActionKinetics),
    EddyBreakUp(EddyBreakUpKinetics),
}

/// Freeboard gas balance model for single-step methane combustion.
pub struct FreeboardModel {
    gas: Methane1SGas,
    kinetics: KineticsClosure,
    /// Turbulence k/epsilon ratio profile for the EBU rate.
    ke: Option<Box<dyn Fn(f64) -> f64>>,
    /// Optional bed-gas surface exchange rates [kg/(m².s)].
    surface_rates: Option<[f64; N_SPECIES]>,
    initial_value: DVector<f64>,
    sections: Option<SectionLookup>,
}

impl FreeboardModel {
    /// Build a premixed freeboard inlet state.
    ///
    /// `m0` is the inlet mass flow [kg/s], `t0` the inlet temperature [K],
    /// `lambda0` the equivalence ratio, and `fuel`/`oxid` mole-fraction
    /// compositions. With `equilibrate` the inlet is brought to its
    /// complete-combustion adiabatic state before integration.
    #[allow(non_snake_case)]
    pub fn new(
        gas: Methane1SGas,
        m0: f64,
        t0: f64,
        lambda0: f64,
        fuel: &HashMap<String, f64>,
        oxid: &HashMap<String, f64>,
        kinetics: KineticsClosure,
        equilibrate: bool,
    ) -> Result<Self, KilnError> {
        let Y0 = gas
            .premixed(lambda0, fuel, oxid)
            .map_err(KilnError::MissingData)?;

        let (T0, Y0) = if equilibrate {
            gas.equilibrate_hp(t0, &Y0)
        } else {
            (t0, Y0)
        };

        Ok(Self::from_state(gas, m0, T0, Y0, kinetics))
    }

    /// Build the model directly from a resolved inlet state.
    #[allow(non_snake_case)]
    pub fn from_state(
        gas: Methane1SGas,
        m0: f64,
        T0: f64,
        Y0: [f64; N_SPECIES],
        kinetics: KineticsClosure,
    ) -> Self {
        let mut initial_value = DVector::zeros(2 + N_SPECIES);
        initial_value[0] = m0;
        initial_value[1] = T0;
        for k in 0..N_SPECIES {
            initial_value[2 + k] = Y0[k];
        }

        Self {
            gas,
            kinetics,
            ke: None,
            surface_rates: None,
            initial_value,
            sections: None,
        }
    }

    /// Override the default `k/epsilon` profile.
    pub fn set_ke_ratio(&mut self, ke: Box<dyn Fn(f64) -> f64>) {
        self.ke = Some(ke);
    }

    /// Install bed-gas surface exchange rates (zero when absent).
    pub fn set_surface_rates(&mut self, sdotk: [f64; N_SPECIES]) {
        self.surface_rates = Some(sdotk);
    }

    pub fn gas(&self) -> &Methane1SGas {
        &self.gas
    }

    pub fn species_index(&self, name: &str) -> Option<usize> {
        self.gas.species_index(name)
    }

    /// Density, viscosity and thermal conductivity profiles from the gas
    /// object, one entry per solution row.
    #[allow(non_snake_case)]
    pub fn get_gas_properties(
        &self,
        T: &[f64],
        Y: &[Vec<f64>],
    ) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let mut rho = Vec::with_capacity(T.len());
        let mut mu = Vec::with_capacity(T.len());
        let mut kg = Vec::with_capacity(T.len());
        for (i, t) in T.iter().enumerate() {
            rho.push(self.gas.density(*t, &Y[i]));
            mu.push(self.gas.viscosity(*t, &Y[i]));
            kg.push(self.gas.thermal_conductivity(*t, &Y[i]));
        }
        (rho, mu, kg)
    }
}

impl PhaseOdeSystem for FreeboardModel {
    fn n_vars(&self) -> usize {
        2 + N_SPECIES
    }

    fn initial_value(&self) -> DVector<f64> {
        self.initial_value.clone()
    }

    #[allow(non_snake_case)]
    fn evaluate_rhs(&self, z: f64, state: &[f64], qdot: &Interp1d, rhs: &mut [f64]) {
        let sections = self
            .sections
            .as_ref()
            .expect("geometry registered before integration");

        let (mdot, T) = (state[0], state[1]);
        let Y = &state[2..];

        let q = qdot.eval(z);
        let (Ac, Pc) = sections.section(z);
        let ke = match &self.ke {
            Some(f) => f(z),
            None => 0.0,
        };

        let rho = self.gas.density(T, Y);
        let wdotk = self.kinetics.wdot_mass(&self.gas, rho, T, Y, ke);
        let hk = self.gas.partial_enthalpies_mass(T);
        let sdotk = self.surface_rates.unwrap_or([0.0; N_SPECIES]);

        let hdotv: f64 = -Ac * wdotk.iter().zip(hk.iter()).map(|(w, h)| w * h).sum::<f64>();
        let hdots: f64 = -Pc * sdotk.iter().zip(hk.iter()).map(|(s, h)| s * h).sum::<f64>();
        let cp = self.gas.specific_heat_mass(T, Y);

        let sdot = Pc * sdotk.iter().sum::<f64>();
        rhs[0] = sdot;
        rhs[1] = (hdotv + hdots + q) / (mdot * cp);
        for k in 0..N_SPECIES {
            rhs[2 + k] = (Ac * wdotk[k] + Pc * sdotk[k] - Y[k] * sdot) / mdot;
        }
    }

    fn register_geometry(&mut self, sections: SectionLookup, kiln_length: f64) {
        self.sections = Some(sections);
        if self.ke.is_none() {
            // Approximate k/e ratio proposed by Mujumdar (2006).
            self.ke = Some(Box::new(move |z| z / kiln_length));
        }
        info!("freeboard geometry registered over {} m", kiln_length);
    }
}

/// Find the air leak flow explaining a measured outlet oxygen content.
///
/// The premixed stream is brought to its complete-combustion adiabatic
/// state and mixed with ambient air until the resulting oxygen mole
/// fraction matches `x_o2`; the leak flow is bracketed by bisection.
#[allow(non_snake_case)]
pub fn find_air_leak(
    gas: &Methane1SGas,
    mf0: f64,
    tf0: f64,
    lambda0: f64,
    fuel: &HashMap<String, f64>,
    oxid: &HashMap<String, f64>,
    ta0: f64,
    air: &HashMap<String, f64>,
    x_o2: f64,
) -> Result<(f64, f64, [f64; N_SPECIES]), KilnError> {
    let Y0 = gas
        .premixed(lambda0, fuel, oxid)
        .map_err(KilnError::MissingData)?;
    let (T1, Y1) = gas.equilibrate_hp(tf0, &Y0);

    let mut x_air = [0.0; N_SPECIES];
    for (name, value) in air {
        let idx = gas
            .species_index(name)
            .ok_or_else(|| KilnError::MissingData(format!("Unknown species {}", name)))?;
        x_air[idx] = *value;
    }
    let y_air_vec = gas.mass_fractions(&x_air);
    let mut Y_air = [0.0; N_SPECIES];
    Y_air.copy_from_slice(&y_air_vec);

    let idx_o2 = 1;
    let objective = |m2: f64| -> f64 {
        let (_m, _t, y) = gas.mix_streams(mf0, T1, &Y1, m2, ta0, &Y_air);
        let x = gas.mole_fractions(&y);
        x_o2 - x[idx_o2]
    };

    // Bisection over the leak flow; oxygen content grows with dilution.
    let (mut lo, mut hi) = (0.0, 50.0 * mf0);
    let (flo, fhi) = (objective(lo), objective(hi));
    if flo * fhi > 0.0 {
        return Err(KilnError::MissingData(
            "Could not find required leak flow".to_string(),
        ));
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if objective(mid) * flo > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1.0e-12 * mf0.max(1.0) {
            break;
        }
    }
    let m2 = 0.5 * (lo + hi);

    let (m, T, Y) = gas.mix_streams(mf0, T1, &Y1, m2, ta0, &Y_air);
    info!(
        "air leak identified: {:.4} kg/s at measured O2 {:.3}",
        m2, x_o2
    );
    Ok((m, T, Y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Thermophysics::gas_mixture::{ONE_ATM, air_composition, methane_fuel};
    use approx::assert_relative_eq;

    fn reference_freeboard(kinetics: KineticsClosure) -> FreeboardModel {
        let gas = Methane1SGas::new(ONE_ATM);
        let mut model = FreeboardModel::new(
            gas,
            0.25,
            1200.0,
            0.9,
            &methane_fuel(),
            &air_composition(),
            kinetics,
            false,
        )
        .unwrap();
        let sections = SectionLookup {
            area: Interp1d::constant(0.0, 10.0, 0.7).unwrap(),
            perimeter: Interp1d::constant(0.0, 10.0, 0.8).unwrap(),
        };
        model.register_geometry(sections, 10.0);
        model
    }

    #[test]
    fn test_ebu_rate_is_minimum_of_limits() {
        let gas = Methane1SGas::new(ONE_ATM);
        let ebu = EddyBreakUpKinetics::default();
        let mak = MassActionKinetics::default();
        let y = [0.04, 0.20, 0.0, 0.0, 0.01, 0.75];

        // Cold gas: the Arrhenius branch vanishes and must limit the rate.
        let cold_ebu = ebu.wdot_mass(&gas, 1.0, 400.0, &y, 0.5);
        let cold_mak = mak.wdot_mass(&gas, 1.0, 400.0, &y, 0.5);
        assert_relative_eq!(cold_ebu[0], cold_mak[0], max_relative = 1e-12);

        // Hot gas: mixing limits, the EBU rate stays below mass action.
        let hot_ebu = ebu.wdot_mass(&gas, 1.0, 2200.0, &y, 0.5);
        let hot_mak = mak.wdot_mass(&gas, 1.0, 2200.0, &y, 0.5);
        assert!(hot_ebu[0].abs() < hot_mak[0].abs());
    }

    #[test]
    fn test_rates_conserve_mass() {
        let gas = Methane1SGas::new(ONE_ATM);
        let ebu = EddyBreakUpKinetics::default();
        let y = [0.04, 0.20, 0.0, 0.0, 0.01, 0.75];
        let wdot = ebu.wdot_mass(&gas, 1.0, 1800.0, &y, 0.5);
        let total: f64 = wdot.iter().sum();
        // CH4 + 2 O2 => CO2 + 2 H2O conserves mass to stoichiometry
        // round-off.
        assert!(total.abs() < 1.0e-05 * wdot[0].abs().max(1e-30));
    }

    #[test]
    fn test_rhs_heats_up_on_positive_flux() {
        let model = reference_freeboard(KineticsClosure::EddyBreakUp(
            EddyBreakUpKinetics::default(),
        ));
        let qdot = Interp1d::constant(0.0, 10.0, 5.0e+04).unwrap();
        let state = model.initial_value();
        let mut rhs = vec![0.0; model.n_vars()];
        model.evaluate_rhs(0.0, state.as_slice(), &qdot, &mut rhs);

        // At z = 0 the EBU ke ratio vanishes, so no reaction heat: the
        // temperature derivative reduces to q / (mdot cp).
        let gas = model.gas();
        let cp = gas.specific_heat_mass(state[1], &state.as_slice()[2..]);
        assert_relative_eq!(rhs[1], 5.0e+04 / (0.25 * cp), max_relative = 1e-10);
        assert_relative_eq!(rhs[0], 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_composition_derivative_consumes_fuel() {
        let model = reference_freeboard(KineticsClosure::EddyBreakUp(
            EddyBreakUpKinetics::default(),
        ));
        let qdot = Interp1d::constant(0.0, 10.0, 0.0).unwrap();
        let mut state = model.initial_value().as_slice().to_vec();
        state[1] = 1600.0;
        let mut rhs = vec![0.0; model.n_vars()];
        model.evaluate_rhs(5.0, &state, &qdot, &mut rhs);

        assert!(rhs[2] < 0.0, "CH4 must be consumed");
        assert!(rhs[3] < 0.0, "O2 must be consumed");
        assert!(rhs[4] > 0.0, "CO2 must be produced");
        assert!(rhs[5] > 0.0, "H2O must be produced");
        assert_relative_eq!(rhs[6], 0.0, epsilon = 1e-16);
    }

    #[test]
    fn test_find_air_leak_matches_measurement() {
        let gas = Methane1SGas::new(ONE_ATM);
        let (m, t, y) = find_air_leak(
            &gas,
            0.25,
            300.0,
            0.95,
            &methane_fuel(),
            &air_composition(),
            300.0,
            &air_composition(),
            0.08,
        )
        .unwrap();

        assert!(m > 0.25, "leak must add mass");
        assert!(t < 2300.0 && t > 300.0);
        let x = gas.mole_fractions(&y);
        assert_relative_eq!(x[1], 0.08, epsilon = 1e-6);
    }
}
