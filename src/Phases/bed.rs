//! # Granular bed phase
//!
//! Mass and energy balance of the solids bed. The state vector is
//! `[mdot, T]` and the balance is integrated in the bed's own coordinate,
//! mirrored with respect to the kiln frame because solids flow counter to
//! the gas; see [`mirror_coordinate`](crate::Phases::bases::mirror_coordinate).

use crate::Models::shomate::ShomateEquation;
use crate::Phases::bases::{PhaseOdeSystem, SectionLookup};
use crate::Utils::interpolation::Interp1d;
use log::info;
use nalgebra::DVector;

/// Moisture correction of the bed specific heat.
///
/// Below `t_start` the free water only adds its sensible heat; between
/// `t_start` and `t_end` it is released linearly, carrying the latent heat
/// of vaporization; above `t_end` the bed is dry.
#[derive(Debug, Clone, Copy)]
pub struct MoistureCorrection {
    /// Water mass fraction of the raw feed.
    pub y_h2o: f64,
    /// Liquid water specific heat [J/(kg.K)].
    pub cp_h2o: f64,
    /// Latent heat of vaporization [J/kg].
    pub dh_h2o: f64,
    /// Onset of moisture release [K].
    pub t_start: f64,
    /// End of moisture release [K].
    pub t_end: f64,
}

impl Default for MoistureCorrection {
    fn default() -> Self {
        Self {
            y_h2o: 0.02,
            cp_h2o: 4186.0,
            dh_h2o: 2.26e+06,
            t_start: 353.15,
            t_end: 373.15,
        }
    }
}

/// Silica-based rotary kiln bed material.
pub struct SilicaBasedBed {
    specific_mass: f64,
    repose_angle: f64,
    kb: Box<dyn Fn(f64) -> f64>,
    si1o2: ShomateEquation,
    moisture: MoistureCorrection,
    initial_value: DVector<f64>,
    sections: Option<SectionLookup>,
}

impl SilicaBasedBed {
    /// `m0` in kg/h, `t0` in K, `rho` the apparent specific weight in
    /// kg/m³, `aor` the angle of repose in degrees, `kb` the apparent
    /// thermal conductivity [W/(m.K)] as a function of temperature.
    pub fn new(m0: f64, t0: f64, rho: f64, aor: f64, kb: Box<dyn Fn(f64) -> f64>) -> Self {
        Self {
            specific_mass: rho,
            repose_angle: aor.to_radians(),
            kb,
            si1o2: ShomateEquation::si1o2(),
            moisture: MoistureCorrection::default(),
            initial_value: DVector::from_vec(vec![m0 / 3600.0, t0]),
            sections: None,
        }
    }

    pub fn set_moisture(&mut self, moisture: MoistureCorrection) {
        self.moisture = moisture;
    }

    /// Bed specific heat with water sensible/latent corrections [J/(kg.K)].
    #[allow(non_snake_case)]
    pub fn specific_heat_mass(&self, T: f64) -> f64 {
        let m = &self.moisture;
        let cp_bed = |T: f64| self.si1o2.specific_heat_mass(T);

        if T <= m.t_start {
            m.y_h2o * m.cp_h2o + (1.0 - m.y_h2o) * cp_bed(T)
        } else if T <= m.t_end {
            let slope = 1.0 / (m.t_end - m.t_start);
            let y = m.y_h2o * (1.0 - slope * (T - m.t_start));
            let dcp = slope * m.dh_h2o;
            y * (m.cp_h2o + dcp) + (1.0 - y) * cp_bed(T)
        } else {
            cp_bed(T)
        }
    }

    /// Bed thermal conductivity [W/(m.K)].
    #[allow(non_snake_case)]
    pub fn thermal_conductivity(&self, T: f64) -> f64 {
        (self.kb)(T)
    }

    /// Bed thermal diffusivity [m²/s].
    #[allow(non_snake_case)]
    pub fn thermal_diffusivity(&self, T: f64) -> f64 {
        (self.kb)(T) / (self.specific_mass * self.specific_heat_mass(T))
    }

    /// Bed apparent specific weight [kg/m³].
    pub fn specific_mass(&self) -> f64 {
        self.specific_mass
    }

    /// Bed repose angle [rad].
    pub fn repose_angle(&self) -> f64 {
        self.repose_angle
    }
}

impl PhaseOdeSystem for SilicaBasedBed {
    fn n_vars(&self) -> usize {
        2
    }

    fn initial_value(&self) -> DVector<f64> {
        self.initial_value.clone()
    }

    #[allow(non_snake_case)]
    fn evaluate_rhs(&self, z: f64, state: &[f64], qdot: &Interp1d, rhs: &mut [f64]) {
        let _sections = self
            .sections
            .as_ref()
            .expect("geometry registered before integration");

        let (mdot, T) = (state[0], state[1]);
        let q = qdot.eval(z);
        let cp = self.specific_heat_mass(T);

        rhs[0] = 0.0;
        rhs[1] = q / (mdot * cp);
    }

    fn register_geometry(&mut self, sections: SectionLookup, kiln_length: f64) {
        // The lookups arrive already expressed in the mirrored bed
        // coordinate; no array reversal happens here.
        self.sections = Some(sections);
        info!("bed geometry registered over {} m", kiln_length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference_bed() -> SilicaBasedBed {
        SilicaBasedBed::new(1000.0, 300.0, 1500.0, 35.0, Box::new(|_t| 0.2))
    }

    #[test]
    fn test_specific_heat_piecewise_branches() {
        let bed = reference_bed();

        // Wet branch: water adds sensible heat on top of the dry solid.
        let cp_cold = bed.specific_heat_mass(320.0);
        let cp_dry = ShomateEquation::si1o2().specific_heat_mass(320.0);
        assert!(cp_cold > cp_dry);

        // Evaporation branch carries the latent heat spike.
        let cp_evap = bed.specific_heat_mass(363.15);
        assert!(cp_evap > cp_cold);

        // Dry branch coincides with the Shomate solid.
        let cp_hot = bed.specific_heat_mass(500.0);
        assert_relative_eq!(
            cp_hot,
            ShomateEquation::si1o2().specific_heat_mass(500.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_thermal_diffusivity_consistency() {
        let bed = reference_bed();
        let t = 400.0;
        let alpha = bed.thermal_diffusivity(t);
        assert_relative_eq!(
            alpha,
            0.2 / (1500.0 * bed.specific_heat_mass(t)),
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_rhs_is_flux_over_capacity() {
        let mut bed = reference_bed();
        bed.register_geometry(
            SectionLookup {
                area: Interp1d::constant(0.0, 10.0, 0.05).unwrap(),
                perimeter: Interp1d::constant(0.0, 10.0, 0.4).unwrap(),
            },
            10.0,
        );

        let qdot = Interp1d::constant(0.0, 10.0, 2.0e+03).unwrap();
        let state = [1000.0 / 3600.0, 300.0];
        let mut rhs = [0.0; 2];
        bed.evaluate_rhs(1.0, &state, &qdot, &mut rhs);

        let cp = bed.specific_heat_mass(300.0);
        assert_relative_eq!(rhs[1], 2.0e+03 / (state[0] * cp), max_relative = 1e-12);
        assert_relative_eq!(rhs[0], 0.0, epsilon = 1e-16);
    }
}
