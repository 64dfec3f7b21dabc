//! # Heat transfer coefficients
//!
//! Tscheng and Watkinson (1979) power-law correlations for gas-bed,
//! gas-wall and wall-bed exchange in rotary kilns, plus the covered-wall
//! coefficient used by Hanein (2016). The correlation constants are
//! published values and are reproduced exactly.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Which wall-bed exchange formulation the radial solver uses.
///
/// The literature is not settled here: Tscheng's penetration correlation
/// and Hanein's contact-film expression give different coefficients, so the
/// choice is an explicit configuration rather than a hard-coded default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallBedExchange {
    Tscheng1979,
    Hanein2016,
}

/// Heat transfer coefficient by Tscheng (1979).
///
/// Constructed once from the cell-wise hydraulic diameter inputs; Reynolds
/// numbers are refreshed every outer iteration through [`update`].
///
/// [`update`]: HtcTscheng1979::update
#[derive(Debug, Clone)]
pub struct HtcTscheng1979 {
    d_e: Vec<f64>,
    eta: Vec<f64>,
    re_d: Vec<f64>,
    re_w: Vec<f64>,
}

impl HtcTscheng1979 {
    /// `d` is the local internal diameter, `beta` the central bed angle and
    /// `eta` the local loading fraction, all cell-wise.
    pub fn new(d: &[f64], beta: &[f64], eta: &[f64]) -> Self {
        // Fraction terms of the hydraulic diameter expression.
        fn f(n: f64, b: f64) -> f64 {
            (3.0 - n) * PI - b / n + (b / n).sin()
        }

        let d_e = d
            .iter()
            .zip(beta.iter())
            .map(|(&di, &bi)| 0.5 * di * f(1.0, bi) / f(2.0, bi))
            .collect();

        Self {
            d_e,
            eta: eta.to_vec(),
            re_d: Vec::new(),
            re_w: Vec::new(),
        }
    }

    /// Update axial and angular Reynolds numbers from the latest gas state.
    ///
    /// `u` is the axial gas speed and `w` the angular velocity [rad/s].
    pub fn update(&mut self, rho: &[f64], mu: &[f64], u: &[f64], w: f64) {
        let re = |rho: f64, v: f64, d: f64, mu: f64| rho * v * d / mu;
        self.re_d = (0..self.d_e.len())
            .map(|i| re(rho[i], u[i], self.d_e[i], mu[i]))
            .collect();
        self.re_w = (0..self.d_e.len())
            .map(|i| re(rho[i], w * self.d_e[i], self.d_e[i], mu[i]))
            .collect();
    }

    fn nusselt(&self, i: usize, a: [f64; 4]) -> f64 {
        a[0] * self.re_d[i].powf(a[1]) * self.re_w[i].powf(a[2]) * self.eta[i].powf(a[3])
    }

    fn model(&self, k: &[f64], a: [f64; 4]) -> Vec<f64> {
        (0..self.d_e.len())
            .map(|i| (k[i] / self.d_e[i]) * self.nusselt(i, a))
            .collect()
    }

    /// Gas-bed heat transfer coefficient [W/(m².K)].
    pub fn h_gb(&self, kg: &[f64]) -> Vec<f64> {
        self.model(kg, [0.46, 0.535, 0.104, -0.341])
    }

    /// Gas-wall heat transfer coefficient [W/(m².K)].
    pub fn h_gw(&self, kg: &[f64]) -> Vec<f64> {
        self.model(kg, [1.54, 0.575, -0.292, 0.000])
    }

    /// Wall-bed heat transfer coefficient [W/(m².K)].
    ///
    /// Tscheng limits the Nusselt argument to 1.0e4; typical kiln
    /// applications slightly disrespect the limit, so no clipping is done
    /// here.
    pub fn h_wb(
        &self,
        kb: &[f64],
        n: f64,
        r: &[f64],
        beta: &[f64],
        a_b: &[f64],
    ) -> Vec<f64> {
        (0..r.len())
            .map(|i| {
                let argnu = n * r[i] * r[i] * beta[i] / a_b[i];
                let nu = 11.6 * argnu.powf(0.3);
                kb[i] * nu / (r[i] * beta[i])
            })
            .collect()
    }
}

/// Wall-bed heat transfer coefficient used by Hanein (2016).
///
/// A gas film of thickness `chi * d_p` combined with the penetration term
/// of the covered bed; `w` is the angular velocity and `beta` the central
/// bed angle.
pub fn h_wb_hanein(
    kg: &[f64],
    kb: &[f64],
    a_b: &[f64],
    w: f64,
    beta: &[f64],
    chi: f64,
    d_p: f64,
) -> Vec<f64> {
    (0..kg.len())
        .map(|i| {
            // k*rho*cp = k^2 / alpha
            let term1 = chi * d_p / kg[i];
            let term2 = 2.0 * (kb[i] * kb[i] / a_b[i]) * w / beta[i];
            term1 + 0.5 / term2.sqrt()
        })
        .collect()
}
