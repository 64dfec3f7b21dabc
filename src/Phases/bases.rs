//! # Phase model contract
//!
//! Each phase of the kiln (freeboard gas, granular bed) is an ODE system
//! integrated along the kiln axis. The contract is deliberately flat: a
//! phase exposes its state size, initial value and right-hand side, and
//! receives the coordinate-dependent section properties as explicit
//! interpolants at registration time. No state is shared between phases.

use crate::Utils::interpolation::Interp1d;
use nalgebra::DVector;

/// Coordinate-dependent cross-section area and exchange perimeter of one
/// phase, interpolated from the resolved bed geometry.
#[derive(Debug, Clone)]
pub struct SectionLookup {
    pub area: Interp1d,
    pub perimeter: Interp1d,
}

impl SectionLookup {
    /// Section properties `(A, P)` at coordinate `z`.
    pub fn section(&self, z: f64) -> (f64, f64) {
        (self.area.eval(z), self.perimeter.eval(z))
    }
}

/// Transform between the kiln coordinate (origin at product discharge) and
/// the bed coordinate (origin at solids feed).
///
/// The bed flows counter to the gas, so its balance is integrated in the
/// mirrored frame; every lookup built for the bed must be expressed in this
/// coordinate once, instead of reversing arrays at call sites.
pub fn mirror_coordinate(length: f64, z: f64) -> f64 {
    length - z
}

/// A model implementing an ODE system along the kiln.
pub trait PhaseOdeSystem {
    /// Number of state variables carried by the integrator.
    fn n_vars(&self) -> usize;

    /// Initial conditions for the integrator.
    fn initial_value(&self) -> DVector<f64>;

    /// Evaluate the right-hand side at `z` for `state`, writing into `rhs`.
    /// `qdot` is the net heat flux boundary condition [W/m].
    fn evaluate_rhs(&self, z: f64, state: &[f64], qdot: &Interp1d, rhs: &mut [f64]);

    /// Receive the section property lookups, already expressed in this
    /// phase's own coordinate, together with the kiln length.
    fn register_geometry(&mut self, sections: SectionLookup, kiln_length: f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_coordinate_involution() {
        let length = 10.0;
        for z in [0.0, 2.5, 10.0] {
            assert_eq!(mirror_coordinate(length, mirror_coordinate(length, z)), z);
        }
    }
}
