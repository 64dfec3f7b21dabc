//! # Kiln geometry
//!
//! Axial discretization of the kiln into `nz` equal cells. Cell centers are
//! displaced half a step from the ends, and the full coordinate array keeps
//! both kiln ends, giving `nz + 2` points; all per-point profiles in the
//! driver follow this convention. The structure is immutable after
//! construction.

use crate::Kiln::rotary_kiln::KilnError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KilnGeometry {
    /// Kiln length [m].
    length: f64,
    /// Internal radius [m].
    radius: f64,
    /// Slope [rad].
    slope: f64,
    /// Rotation rate [rev/s].
    rotation_rate: f64,
    /// Feed rate [kg/s].
    feed_rate: f64,
    n_cells: usize,
    cell_length: f64,
    cell_centers: Vec<f64>,
    z: Vec<f64>,
}

impl KilnGeometry {
    /// `alpha` in degrees, `n` in rev/min and `phim` in kg/h; values are
    /// normalized once here so the whole model works in SI units and the
    /// rev/s convention required by Kramers' equation.
    #[allow(non_snake_case)]
    pub fn new(
        L: f64,
        R: f64,
        alpha: f64,
        n: f64,
        phim: f64,
        nz: usize,
    ) -> Result<Self, KilnError> {
        if L <= 0.0 || R <= 0.0 {
            return Err(KilnError::InvalidConfiguration(
                "Kiln length and radius must be positive".to_string(),
            ));
        }
        if nz < 1 {
            return Err(KilnError::InvalidConfiguration(
                "At least one axial cell is required".to_string(),
            ));
        }
        if n <= 0.0 || phim <= 0.0 {
            return Err(KilnError::InvalidConfiguration(
                "Rotation rate and feed rate must be positive".to_string(),
            ));
        }

        let dz = L / nz as f64;
        let cell_centers: Vec<f64> = (0..nz).map(|i| dz / 2.0 + i as f64 * dz).collect();
        let mut z = Vec::with_capacity(nz + 2);
        z.push(0.0);
        z.extend_from_slice(&cell_centers);
        z.push(L);

        Ok(Self {
            length: L,
            radius: R,
            slope: alpha.to_radians(),
            rotation_rate: n / 60.0,
            feed_rate: phim / 3600.0,
            n_cells: nz,
            cell_length: dz,
            cell_centers,
            z,
        })
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    /// Rotation rate [rev/s].
    pub fn rotation_rate(&self) -> f64 {
        self.rotation_rate
    }

    /// Feed rate [kg/s].
    pub fn feed_rate(&self) -> f64 {
        self.feed_rate
    }

    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    pub fn cell_length(&self) -> f64 {
        self.cell_length
    }

    pub fn cell_centers(&self) -> &[f64] {
        &self.cell_centers
    }

    /// Cell centers extended with both kiln ends, `n_cells + 2` points.
    pub fn coordinates(&self) -> &[f64] {
        &self.z
    }
}
