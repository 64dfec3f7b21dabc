//! # Rotary kiln driver
//!
//! Couples the freeboard and bed phase models through the radial
//! heat-exchange constraint system. Every outer iteration integrates the
//! gas balance forward, the bed balance in its mirrored coordinate, and
//! re-solves the per-cell wall/shell temperatures; heat flux estimates fed
//! back into the integrations are optionally relaxed against the previous
//! iteration and radiation stays off for the first `minrad` iterations to
//! keep the early, far-from-converged profiles out of the fourth-power
//! stiffness. The loop ends after a configurable run of consecutive
//! below-tolerance iterations or when the step budget runs out.

use crate::Kiln::geometry::KilnGeometry;
use crate::Kiln::results::ResultsTable;
use crate::Models::heat_transfer::{
    convection, conduction, effective_thermal_conductivity, radiation,
};
use crate::Models::htc_tscheng::{HtcTscheng1979, WallBedExchange, h_wb_hanein};
use crate::Models::kramers_model::solve_kramers_model;
use crate::Models::radcal::GasRadiation;
use crate::Phases::bases::{PhaseOdeSystem, SectionLookup, mirror_coordinate};
use crate::Phases::bed::SilicaBasedBed;
use crate::Phases::freeboard::FreeboardModel;
use crate::Solvers::SolverError;
use crate::Solvers::integration::{IntegrationMethod, integrate_on_grid};
use crate::Solvers::steady_state::{SolverStrategy, solve_radial_stack};
use crate::Utils::interpolation::{Interp1d, InterpolationError};
use crate::Utils::quadrature::{cumtrapz, simpson};
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

/// State capacity of the phase integrators.
pub const MAX_STATE_VARS: usize = 16;

/// Errors raised by the kiln model.
#[derive(Debug, Error)]
pub enum KilnError {
    #[error("Evaluation points outside kiln [0;L]")]
    EvaluationOutsideDomain,
    #[error("Failed to integrate phase model: {0}")]
    Integration(SolverError),
    #[error("Steady-state constraint solve failed: {0}")]
    ConstraintSolve(SolverError),
    #[error("Missing data: {0}")]
    MissingData(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Driver state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationStatus {
    Uninitialized,
    Initializing,
    Iterating,
    Converged,
    MaxStepsReached,
}

/// Outer-loop configuration.
///
/// The relaxation factor and the minimum radiation iteration are tuned
/// stabilization constants with no derivation behind them, so they are
/// configuration rather than hard-coded values; the defaults are the ones
/// the model was validated with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Maximum number of outer iteration steps.
    pub max_steps: usize,
    /// Absolute temperature change tolerance for convergence [K].
    pub atol: f64,
    /// Fraction of the previous flux kept when updating heat transfer.
    pub relax: f64,
    /// Iteration at which radiation activates.
    pub minrad: usize,
    /// Consecutive below-tolerance iterations required to declare
    /// convergence.
    pub min_convergence_steps: usize,
    pub method_gas: IntegrationMethod,
    pub method_bed: IntegrationMethod,
    pub method_bed_height: IntegrationMethod,
    pub rtol_ode: f64,
    pub atol_ode: f64,
    /// Fraction of the local radius standing in for a zero discharge
    /// height in the bed profile solve.
    pub outlet_height_fraction: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_steps: 100,
            atol: 0.01,
            relax: 0.0,
            minrad: 10,
            min_convergence_steps: 5,
            method_gas: IntegrationMethod::Dopri5,
            method_bed: IntegrationMethod::Dopri5,
            method_bed_height: IntegrationMethod::Radau5,
            rtol_ode: 1.0e-06,
            atol_ode: 1.0e-08,
            outlet_height_fraction: 1.0e-03,
        }
    }
}

/// Wall layer definition: thickness and conductivity profiles of the
/// coating, refractory and shell, plus the constant surface emissivities
/// and the external environment.
pub struct WallMaterials {
    /// Coating thickness [m] as a function of position.
    pub thick_coat: Box<dyn Fn(f64) -> f64>,
    /// Refractory thickness [m] as a function of position.
    pub thick_refr: Box<dyn Fn(f64) -> f64>,
    /// Shell thickness [m] as a function of position.
    pub thick_shell: Box<dyn Fn(f64) -> f64>,
    /// Coating conductivity [W/(m.K)] as a function of (z, T).
    pub k_coat: Box<dyn Fn(f64, f64) -> f64>,
    /// Refractory conductivity [W/(m.K)] as a function of (z, T).
    pub k_refr: Box<dyn Fn(f64, f64) -> f64>,
    /// Shell conductivity [W/(m.K)] as a function of (z, T).
    pub k_shell: Box<dyn Fn(f64, f64) -> f64>,
    pub eps_bed: f64,
    pub eps_ref: f64,
    pub eps_env: f64,
    /// Convective coefficient to the environment [W/(m².K)].
    pub h_env: f64,
    /// Environment temperature [K].
    pub T_env: f64,
    /// Gas film parameter of the covered-wall coefficient.
    pub wall_film_chi: f64,
    /// Bed particle diameter [m].
    pub particle_diameter: f64,
    /// Use the coated radius profile in Kramers' equation.
    pub kramers_exp: bool,
}

impl WallMaterials {
    pub fn new(
        thick_coat: Box<dyn Fn(f64) -> f64>,
        thick_refr: Box<dyn Fn(f64) -> f64>,
        thick_shell: Box<dyn Fn(f64) -> f64>,
        k_coat: Box<dyn Fn(f64, f64) -> f64>,
        k_refr: Box<dyn Fn(f64, f64) -> f64>,
        k_shell: Box<dyn Fn(f64, f64) -> f64>,
    ) -> Self {
        Self {
            thick_coat,
            thick_refr,
            thick_shell,
            k_coat,
            k_refr,
            k_shell,
            eps_bed: 0.8,
            eps_ref: 0.8,
            eps_env: 0.8,
            h_env: 8.0,
            T_env: 313.15,
            wall_film_chi: 0.15,
            particle_diameter: 50.0e-06,
            kramers_exp: false,
        }
    }

    pub fn with_emissivities(mut self, eps_bed: f64, eps_ref: f64, eps_env: f64) -> Self {
        self.eps_bed = eps_bed;
        self.eps_ref = eps_ref;
        self.eps_env = eps_env;
        self
    }

    #[allow(non_snake_case)]
    pub fn with_environment(mut self, h_env: f64, T_env: f64) -> Self {
        self.h_env = h_env;
        self.T_env = T_env;
        self
    }

    pub fn with_wall_film(mut self, chi: f64, d_p: f64) -> Self {
        self.wall_film_chi = chi;
        self.particle_diameter = d_p;
        self
    }

    pub fn with_kramers_experimental(mut self, enabled: bool) -> Self {
        self.kramers_exp = enabled;
        self
    }
}

/// Summary of a finished `simulate` call.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub status: SimulationStatus,
    pub steps: usize,
    pub residual_gas: f64,
    pub residual_bed: f64,
    /// Integral environment losses [kW].
    pub shell_loss: f64,
    /// Integral bed heat duty [kW].
    pub bed_duty: f64,
}

/// Implementation of a rotary kiln with Kramers bed height model.
#[allow(non_snake_case)]
pub struct RotaryKilnModel {
    geom: KilnGeometry,
    discharge_height: f64,
    radcal: Option<Box<dyn GasRadiation>>,
    strategy: SolverStrategy,
    wall_bed: WallBedExchange,
    T_min: f64,
    T_max: f64,
    initialized: bool,
    status: SimulationStatus,

    materials: Option<WallMaterials>,

    // Bed geometry, all over the full coordinate array unless noted.
    R_zw: Vec<f64>,
    R_wg: Vec<f64>,
    R_cr: f64,
    R_rs: Vec<f64>,
    R_sh: Vec<f64>,
    central_angle: Vec<f64>,
    bed_height: Vec<f64>,
    bed_cord_length: Vec<f64>,
    bed_cross_area: Vec<f64>,
    gas_cross_area: Vec<f64>,
    local_loading: Vec<f64>,
    mean_loading: f64,

    // Heat exchange geometry.
    P_xgw: Vec<f64>,
    P_xgb: Vec<f64>,
    P_cwb: Vec<f64>,
    P_rwb: Vec<f64>,
    A_cgw: Vec<f64>,
    A_rgw: Vec<f64>,
    A_cgb: Vec<f64>,
    A_rgb: Vec<f64>,
    A_cwb: Vec<f64>,
    A_rwb: Vec<f64>,
    omega: Vec<f64>,
    P_env: Vec<f64>,
    A_env: Vec<f64>,
    beam_length: Vec<f64>,

    // Heat transfer state.
    htc: Option<HtcTscheng1979>,
    eps_bed: f64,
    eps_ref: f64,
    e_env: f64,
    h_env: f64,
    T_env: f64,
    h_cgw: Vec<f64>,
    h_cgb: Vec<f64>,
    h_cwb: Vec<f64>,
    q_cgw: Vec<f64>,
    q_rgw: Vec<f64>,
    q_cgb: Vec<f64>,
    q_rgb: Vec<f64>,
    q_cwb: Vec<f64>,
    q_rwb: Vec<f64>,
    q_env: Vec<f64>,
    bal_gas: Vec<f64>,
    bal_bed: Vec<f64>,

    // Solution state.
    solution_gas: DMatrix<f64>,
    solution_bed: DMatrix<f64>,
    Tg_last: Vec<f64>,
    Tb_last: Vec<f64>,
    qg_last: Vec<f64>,
    qb_last: Vec<f64>,
    guess: DVector<f64>,
    history_gas: Vec<f64>,
    history_bed: Vec<f64>,
    errg: f64,
    errb: f64,
    count: usize,
    relax: f64,

    table: Option<ResultsTable>,
    q_loss: f64,
    q_bed_total: f64,
}

impl RotaryKilnModel {
    /// `L` and `R` in meters, `alpha` in degrees, `n` in rev/min, `phim`
    /// in kg/h, `nz` axial cells and `hl` the bed height at the product
    /// discharge end [m].
    #[allow(non_snake_case)]
    pub fn new(
        L: f64,
        R: f64,
        alpha: f64,
        n: f64,
        phim: f64,
        nz: usize,
        hl: f64,
    ) -> Result<Self, KilnError> {
        let geom = KilnGeometry::new(L, R, alpha, n, phim, nz)?;
        Ok(Self {
            geom,
            discharge_height: hl,
            radcal: None,
            strategy: SolverStrategy::default(),
            wall_bed: WallBedExchange::Hanein2016,
            T_min: 200.0,
            T_max: 5000.0,
            initialized: false,
            status: SimulationStatus::Uninitialized,
            materials: None,
            R_zw: Vec::new(),
            R_wg: Vec::new(),
            R_cr: R,
            R_rs: Vec::new(),
            R_sh: Vec::new(),
            central_angle: Vec::new(),
            bed_height: Vec::new(),
            bed_cord_length: Vec::new(),
            bed_cross_area: Vec::new(),
            gas_cross_area: Vec::new(),
            local_loading: Vec::new(),
            mean_loading: 0.0,
            P_xgw: Vec::new(),
            P_xgb: Vec::new(),
            P_cwb: Vec::new(),
            P_rwb: Vec::new(),
            A_cgw: Vec::new(),
            A_rgw: Vec::new(),
            A_cgb: Vec::new(),
            A_rgb: Vec::new(),
            A_cwb: Vec::new(),
            A_rwb: Vec::new(),
            omega: Vec::new(),
            P_env: Vec::new(),
            A_env: Vec::new(),
            beam_length: Vec::new(),
            htc: None,
            eps_bed: 0.8,
            eps_ref: 0.8,
            e_env: 0.8,
            h_env: 8.0,
            T_env: 313.15,
            h_cgw: Vec::new(),
            h_cgb: Vec::new(),
            h_cwb: Vec::new(),
            q_cgw: Vec::new(),
            q_rgw: Vec::new(),
            q_cgb: Vec::new(),
            q_rgb: Vec::new(),
            q_cwb: Vec::new(),
            q_rwb: Vec::new(),
            q_env: Vec::new(),
            bal_gas: Vec::new(),
            bal_bed: Vec::new(),
            solution_gas: DMatrix::zeros(0, 0),
            solution_bed: DMatrix::zeros(0, 0),
            Tg_last: Vec::new(),
            Tb_last: Vec::new(),
            qg_last: Vec::new(),
            qb_last: Vec::new(),
            guess: DVector::zeros(0),
            history_gas: Vec::new(),
            history_bed: Vec::new(),
            errg: f64::INFINITY,
            errb: f64::INFINITY,
            count: 0,
            relax: 0.0,
            table: None,
            q_loss: 0.0,
            q_bed_total: 0.0,
        })
    }

    /// Install the radiative property surrogate.
    pub fn with_radcal(mut self, radcal: Box<dyn GasRadiation>) -> Self {
        self.radcal = Some(radcal);
        self
    }

    /// Select the constraint solving strategy.
    pub fn with_solver_strategy(mut self, strategy: SolverStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Select the wall-bed exchange formulation.
    pub fn with_wall_bed_exchange(mut self, wall_bed: WallBedExchange) -> Self {
        self.wall_bed = wall_bed;
        self
    }

    /// Temperature box of the constrained solver [K].
    pub fn with_temperature_bounds(mut self, t_min: f64, t_max: f64) -> Self {
        self.T_min = t_min;
        self.T_max = t_max;
        self
    }

    ///////////////////////////////////////////////////////////////
    // Solution array access shortcuts
    ///////////////////////////////////////////////////////////////

    /// Gas temperature profile in kiln coordinates [K].
    pub fn temperature_gas(&self) -> Vec<f64> {
        (0..self.solution_gas.nrows())
            .map(|r| self.solution_gas[(r, 1)])
            .collect()
    }

    /// Bed temperature profile in kiln coordinates [K].
    ///
    /// The bed solution is stored in the mirrored bed frame, so rows are
    /// reversed here.
    pub fn temperature_bed(&self) -> Vec<f64> {
        (0..self.solution_bed.nrows())
            .rev()
            .map(|r| self.solution_bed[(r, 1)])
            .collect()
    }

    /// Gas mass flow rate profile [kg/s].
    pub fn mass_flow_rate_gas(&self) -> Vec<f64> {
        (0..self.solution_gas.nrows())
            .map(|r| self.solution_gas[(r, 0)])
            .collect()
    }

    /// Bed mass flow rate profile in kiln coordinates [kg/s].
    pub fn mass_flow_rate_bed(&self) -> Vec<f64> {
        (0..self.solution_bed.nrows())
            .rev()
            .map(|r| self.solution_bed[(r, 0)])
            .collect()
    }

    /// Gas composition rows in kiln coordinates, mass fractions.
    pub fn mass_fractions_gas(&self) -> Vec<Vec<f64>> {
        (0..self.solution_gas.nrows())
            .map(|r| {
                (2..self.solution_gas.ncols())
                    .map(|c| self.solution_gas[(r, c)])
                    .collect()
            })
            .collect()
    }

    /// Gas composition rows in kiln coordinates, mole fractions.
    pub fn mole_fractions_gas(&self, tfm: &FreeboardModel) -> Vec<Vec<f64>> {
        use crate::Thermophysics::gas_mixture::GasThermo;
        self.mass_fractions_gas()
            .iter()
            .map(|y| tfm.gas().mole_fractions(y))
            .collect()
    }

    ///////////////////////////////////////////////////////////////
    // Initialization
    ///////////////////////////////////////////////////////////////

    #[allow(non_snake_case)]
    fn init_bed_geometry(
        &mut self,
        tfm: &mut FreeboardModel,
        tbm: &mut SilicaBasedBed,
        config: &SimulationConfig,
    ) -> Result<(), KilnError> {
        let z = self.geom.coordinates().to_vec();
        let centers = self.geom.cell_centers().to_vec();
        let L = self.geom.length();
        let R0 = self.geom.radius();

        let (R_zw, R_wg, R_rs, R_sh, kramers_exp) = {
            let m = self
                .materials
                .as_ref()
                .ok_or_else(|| KilnError::MissingData("Wall materials not set".to_string()))?;
            let R_zw: Vec<f64> = z.iter().map(|&zi| R0 - (m.thick_coat)(zi)).collect();
            let R_wg: Vec<f64> = centers.iter().map(|&zi| R0 - (m.thick_coat)(zi)).collect();
            let R_rs: Vec<f64> = centers.iter().map(|&zi| R0 + (m.thick_refr)(zi)).collect();
            let R_sh: Vec<f64> = centers
                .iter()
                .zip(R_rs.iter())
                .map(|(&zi, &r)| r + (m.thick_shell)(zi))
                .collect();
            (R_zw, R_wg, R_rs, R_sh, m.kramers_exp)
        };

        // Kramers' equation is solved on the coated radius profile only in
        // the experimental mode, else on the nominal bore.
        let radius_values = if kramers_exp {
            R_zw.clone()
        } else {
            vec![R0; z.len()]
        };
        let radius_interp = Interp1d::new(z.clone(), radius_values)?;

        let h = solve_kramers_model(
            |zq| radius_interp.eval(zq),
            L,
            self.geom.slope(),
            self.geom.rotation_rate(),
            self.geom.feed_rate(),
            tbm.repose_angle(),
            tbm.specific_mass(),
            self.discharge_height,
            &z,
            config.method_bed_height,
            config.outlet_height_fraction,
        )?;

        let R: Vec<f64> = z.iter().map(|&zi| radius_interp.eval(zi)).collect();

        // Central angle from the bed height; the cord follows by inverting
        // Hanein's expression for the angle.
        let phi: Vec<f64> = h
            .iter()
            .zip(R.iter())
            .map(|(&hi, &ri)| 2.0 * (1.0 - hi / ri).acos())
            .collect();
        let lgb: Vec<f64> = phi
            .iter()
            .zip(R.iter())
            .map(|(&pi_, &ri)| 2.0 * ri * (pi_ / 2.0).sin())
            .collect();

        let Ab: Vec<f64> = (0..z.len())
            .map(|i| 0.5 * (phi[i] * R[i] * R[i] - lgb[i] * (R[i] - h[i])))
            .collect();
        let Ag: Vec<f64> = (0..z.len())
            .map(|i| PI * R[i] * R[i] - Ab[i])
            .collect();

        let eta_loc: Vec<f64> = phi.iter().map(|&p| (p - p.sin()) / (2.0 * PI)).collect();
        let eta_bar = simpson(&eta_loc, &z) / L;

        // Register the section getters: the gas sees the kiln frame, the
        // bed sees the mirrored frame.
        tfm.register_geometry(
            SectionLookup {
                area: Interp1d::new(z.clone(), Ag.clone())?,
                perimeter: Interp1d::new(z.clone(), lgb.clone())?,
            },
            L,
        );

        let z_bed: Vec<f64> = z.iter().rev().map(|&zi| mirror_coordinate(L, zi)).collect();
        let rev = |v: &[f64]| v.iter().rev().copied().collect::<Vec<f64>>();
        tbm.register_geometry(
            SectionLookup {
                area: Interp1d::new(z_bed.clone(), rev(&Ab))?,
                perimeter: Interp1d::new(z_bed, rev(&lgb))?,
            },
            L,
        );

        self.R_zw = R_zw;
        self.R_wg = R_wg;
        self.R_cr = R0;
        self.R_rs = R_rs;
        self.R_sh = R_sh;
        self.central_angle = phi;
        self.bed_height = h;
        self.bed_cord_length = lgb;
        self.bed_cross_area = Ab;
        self.gas_cross_area = Ag;
        self.local_loading = eta_loc;
        self.mean_loading = eta_bar;

        info!("bed geometry resolved, mean loading {:.2} %", 100.0 * eta_bar);
        Ok(())
    }

    #[allow(non_snake_case)]
    fn init_heat_geometry(&mut self) {
        let R = self.geom.radius();
        let dz = self.geom.cell_length();
        let n = self.geom.n_cells();

        // Pair gas-wall: the bed covers the central angle, the gas sees
        // the complement.
        self.P_xgw = self
            .central_angle
            .iter()
            .map(|&p| (2.0 * PI - p) * R)
            .collect();
        self.A_cgw = self.P_xgw.iter().map(|&p| p * dz).collect();
        self.A_rgw = self.A_cgw.clone();

        // Pair gas-bed: the exposed bed plane, taken as a rectangle of
        // cord length by cell length.
        self.P_xgb = self.bed_cord_length.clone();
        self.A_cgb = self.P_xgb.iter().map(|&p| p * dz).collect();
        self.A_rgb = self.A_cgb.clone();

        // Pair wall-bed: radiation through the exposed surface, contact
        // conduction over the covered arc.
        self.P_cwb = self.central_angle.iter().map(|&p| p * R).collect();
        self.P_rwb = self.bed_cord_length.clone();
        self.A_cwb = self.P_cwb.iter().map(|&p| p * dz).collect();
        self.A_rwb = self.P_rwb.iter().map(|&p| p * dz).collect();

        // View factor for wall-bed radiation: receiving bed surface over
        // emitting exposed wall.
        self.omega = self
            .P_rwb
            .iter()
            .zip(self.P_xgw.iter())
            .map(|(&prwb, &pxgw)| prwb / pxgw)
            .collect();

        self.P_env = self.R_sh.iter().map(|&r| 2.0 * PI * r).collect();
        self.A_env = self.P_env.iter().map(|&p| p * dz).collect();

        // Gorog's optical beam correlation used by Hanein (2016).
        self.beam_length = (0..n)
            .map(|i| {
                let d = 2.0 * self.R_wg[i];
                let h = self.bed_height[i + 1];
                0.95 * d * (1.0 - h / d)
            })
            .collect();
    }

    fn init_heat_fluxes(&mut self) -> Result<(), KilnError> {
        let n = self.geom.n_cells();
        let m = self
            .materials
            .as_ref()
            .ok_or_else(|| KilnError::MissingData("Wall materials not set".to_string()))?;

        self.eps_bed = m.eps_bed;
        self.eps_ref = m.eps_ref;
        self.e_env = m.eps_env;
        self.h_env = m.h_env;
        self.T_env = m.T_env;

        self.h_cgw = vec![0.0; n + 2];
        self.h_cgb = vec![0.0; n + 2];
        self.h_cwb = vec![0.0; n + 2];

        self.q_cgw = vec![0.0; n];
        self.q_rgw = vec![0.0; n];
        self.q_cgb = vec![0.0; n];
        self.q_rgb = vec![0.0; n];
        self.q_cwb = vec![0.0; n];
        self.q_rwb = vec![0.0; n];
        self.q_env = vec![0.0; n];

        self.bal_gas = vec![0.0; n];
        self.bal_bed = vec![0.0; n];

        let d: Vec<f64> = self.R_zw.iter().map(|&r| 2.0 * r).collect();
        self.htc = Some(HtcTscheng1979::new(
            &d,
            &self.central_angle,
            &self.local_loading,
        ));
        Ok(())
    }

    fn init_solution(&mut self, tfm: &FreeboardModel, tbm: &SilicaBasedBed) {
        let n = self.geom.n_cells();
        let rows = n + 2;

        self.errg = f64::INFINITY;
        self.errb = f64::INFINITY;

        self.Tg_last = vec![0.0; rows];
        self.Tb_last = vec![0.0; rows];

        let iv_gas = tfm.initial_value();
        let iv_bed = tbm.initial_value();
        self.solution_gas = DMatrix::from_fn(rows, tfm.n_vars(), |_r, c| iv_gas[c]);
        self.solution_bed = DMatrix::from_fn(rows, tbm.n_vars(), |_r, c| iv_bed[c]);

        self.history_gas.clear();
        self.history_bed.clear();

        self.qg_last = vec![0.0; n];
        self.qb_last = vec![0.0; n];

        self.guess = DVector::from_element(4 * n, self.T_max);
        self.count = 0;
        self.table = None;
    }

    /// Evaluate model internals and solve the bed profile.
    ///
    /// Called by `simulate` on its first step; exposed so the resolved bed
    /// and heat geometry can be inspected without running the outer loop.
    pub fn initialize(
        &mut self,
        tfm: &mut FreeboardModel,
        tbm: &mut SilicaBasedBed,
        materials: WallMaterials,
        config: &SimulationConfig,
    ) -> Result<(), KilnError> {
        self.materials = Some(materials);
        self.status = SimulationStatus::Initializing;
        self.init_bed_geometry(tfm, tbm, config)?;
        info!("bed geometry initialized");
        self.init_heat_geometry();
        info!("heat exchange geometry initialized");
        self.init_heat_fluxes()?;
        info!("heat flux buffers initialized");
        self.init_solution(tfm, tbm);
        info!("solution buffers initialized");
        self.initialized = true;
        Ok(())
    }

    ///////////////////////////////////////////////////////////////
    // Heat flux boundary conditions
    ///////////////////////////////////////////////////////////////

    /// Apply the relaxation factor to a flux update array.
    fn relaxer(&self, q: &[f64], q_old: &[f64]) -> Vec<f64> {
        if self.relax > 0.0 {
            q.iter()
                .zip(q_old.iter())
                .map(|(&qn, &qo)| self.relax * qo + (1.0 - self.relax) * qn)
                .collect()
        } else {
            q.to_vec()
        }
    }

    /// Build the full balance interpolation with safe ends.
    fn extended_balance(&self, q: &[f64]) -> Result<Interp1d, KilnError> {
        let mut y = Vec::with_capacity(q.len() + 2);
        y.push(q[0]);
        y.extend_from_slice(q);
        y.push(q[q.len() - 1]);
        Ok(Interp1d::new(self.geom.coordinates().to_vec(), y)?)
    }

    /// Heat flux balance seen by the gas phase [W/m].
    fn gas_balance_interp(&mut self) -> Result<Interp1d, KilnError> {
        let dz = self.geom.cell_length();
        let q: Vec<f64> = self.bal_gas.iter().map(|&b| -b / dz).collect();
        self.qg_last = self.relaxer(&q, &self.qg_last);
        self.extended_balance(&self.qg_last.clone())
    }

    /// Heat flux balance seen by the bed phase [W/m].
    ///
    /// Returned in reversed cell order because the bed model integrates in
    /// the mirrored coordinate.
    fn bed_balance_interp(&mut self) -> Result<Interp1d, KilnError> {
        let dz = self.geom.cell_length();
        let q: Vec<f64> = self.bal_bed.iter().rev().map(|&b| b / dz).collect();
        self.qb_last = self.relaxer(&q, &self.qb_last);
        self.extended_balance(&self.qb_last.clone())
    }

    ///////////////////////////////////////////////////////////////
    // Phase integration
    ///////////////////////////////////////////////////////////////

    fn integrate_phase<P: PhaseOdeSystem>(
        &self,
        model: &P,
        qdot: &Interp1d,
        method: IntegrationMethod,
        config: &SimulationConfig,
        name: &str,
    ) -> Result<DMatrix<f64>, KilnError> {
        let y0 = model.initial_value();
        integrate_on_grid::<MAX_STATE_VARS, _>(
            |z, y, dy| model.evaluate_rhs(z, y, qdot, dy),
            y0.as_slice(),
            self.geom.coordinates(),
            method,
            config.rtol_ode,
            config.atol_ode,
            name,
        )
        .map_err(KilnError::Integration)
    }

    fn integrate_gas(
        &mut self,
        tfm: &FreeboardModel,
        config: &SimulationConfig,
    ) -> Result<(), KilnError> {
        let qdot = self.gas_balance_interp()?;
        self.solution_gas =
            self.integrate_phase(tfm, &qdot, config.method_gas, config, "FreeboardModel")?;
        Ok(())
    }

    fn integrate_bed(
        &mut self,
        tbm: &SilicaBasedBed,
        config: &SimulationConfig,
    ) -> Result<(), KilnError> {
        let qdot = self.bed_balance_interp()?;
        self.solution_bed =
            self.integrate_phase(tbm, &qdot, config.method_bed, config, "SilicaBasedBed")?;
        Ok(())
    }

    ///////////////////////////////////////////////////////////////
    // Partial heat flux expressions
    ///////////////////////////////////////////////////////////////

    #[allow(non_snake_case)]
    fn fn_q_cgw(&self, i: usize, T_g: f64, T_w: f64) -> f64 {
        convection(self.h_cgw[i + 1], self.A_cgw[i + 1], T_g, T_w)
    }

    #[allow(non_snake_case)]
    fn fn_q_rgw(&self, i: usize, T_g: f64, T_w: f64, e_g: f64, a_g: f64) -> f64 {
        let e = (1.0 + self.eps_ref) / 2.0;
        radiation(e, self.A_rgw[i + 1], T_g, T_w, e_g, a_g)
    }

    #[allow(non_snake_case)]
    fn fn_q_cgb(&self, i: usize, T_g: f64, T_b: f64) -> f64 {
        convection(self.h_cgb[i + 1], self.A_cgb[i + 1], T_g, T_b)
    }

    #[allow(non_snake_case)]
    fn fn_q_rgb(&self, i: usize, T_g: f64, T_b: f64, e_g: f64, a_g: f64) -> f64 {
        let e = (1.0 + self.eps_bed) / 2.0;
        radiation(e, self.A_rgb[i + 1], T_g, T_b, e_g, a_g)
    }

    #[allow(non_snake_case)]
    fn fn_q_cwb(&self, i: usize, T_w: f64, T_b: f64) -> f64 {
        convection(self.h_cwb[i + 1], self.A_cwb[i + 1], T_w, T_b)
    }

    #[allow(non_snake_case)]
    fn fn_q_rwb(&self, i: usize, T_w: f64, T_b: f64) -> f64 {
        match self.wall_bed {
            WallBedExchange::Hanein2016 => {
                // Series of surface resistances: emitting exposed wall,
                // unit view factor, receiving exposed bed.
                let ew = self.eps_ref;
                let eb = self.eps_bed;
                let mut a = (1.0 - ew) / (ew * self.A_rgw[i + 1]);
                a += 1.0 / self.A_rwb[i + 1];
                a += (1.0 - eb) / (eb * self.A_rwb[i + 1]);
                radiation(1.0, 1.0 / a, T_w, T_b, 1.0, 1.0)
            }
            WallBedExchange::Tscheng1979 => {
                let e = self.eps_bed * self.eps_ref * self.omega[i + 1];
                radiation(e, self.A_rwb[i + 1], T_w, T_b, 1.0, 1.0)
            }
        }
    }

    #[allow(non_snake_case)]
    fn fn_q_env(&self, i: usize, T_s: f64) -> f64 {
        convection(self.h_env, self.A_env[i], T_s, self.T_env)
            + radiation(self.e_env, self.A_env[i], T_s, self.T_env, 1.0, 1.0)
    }

    /// Steady-state nonlinear constraints of one cell.
    #[allow(non_snake_case)]
    fn steady_constraints_cell(
        &self,
        i: usize,
        x: &[f64; 4],
        T_g: f64,
        T_b: f64,
        e_g: f64,
        a_g: f64,
    ) -> [f64; 4] {
        let m = self
            .materials
            .as_ref()
            .expect("materials are set before the radial solve");
        let dz = self.geom.cell_length();
        let zc = self.geom.cell_centers()[i];
        let (T_wi, T_cr, T_rs, T_sh) = (x[0], x[1], x[2], x[3]);

        let q_coat = conduction(dz, |t| (m.k_coat)(zc, t), T_wi, T_cr, self.R_wg[i], self.R_cr);
        let q_refr = conduction(dz, |t| (m.k_refr)(zc, t), T_cr, T_rs, self.R_cr, self.R_rs[i]);
        let q_shell = conduction(
            dz,
            |t| (m.k_shell)(zc, t),
            T_rs,
            T_sh,
            self.R_rs[i],
            self.R_sh[i],
        );
        let q_env = self.fn_q_env(i, T_sh);

        let q_cgw = self.fn_q_cgw(i, T_g, T_wi);
        let q_rgw = self.fn_q_rgw(i, T_g, T_wi, e_g, a_g);
        let q_cwb = self.fn_q_cwb(i, T_wi, T_b);
        let q_rwb = self.fn_q_rwb(i, T_wi, T_b);

        [
            q_coat - (q_cgw + q_rgw - q_rwb - q_cwb),
            q_refr - q_coat,
            q_shell - q_refr,
            q_env - q_shell,
        ]
    }

    ///////////////////////////////////////////////////////////////
    // Main physics updates
    ///////////////////////////////////////////////////////////////

    /// Refresh heat transfer coefficients from the latest phase states.
    #[allow(non_snake_case)]
    fn update_htc(
        &mut self,
        tfm: &FreeboardModel,
        tbm: &SilicaBasedBed,
    ) -> Result<(), KilnError> {
        let T_g = self.temperature_gas();
        let T_b = self.temperature_bed();
        let Y_g = self.mass_fractions_gas();

        let k_b: Vec<f64> = T_b.iter().map(|&t| tbm.thermal_conductivity(t)).collect();
        let a_b: Vec<f64> = T_b.iter().map(|&t| tbm.thermal_diffusivity(t)).collect();
        let (rho_g, mu, k_g) = tfm.get_gas_properties(&T_g, &Y_g);

        // Effective conductivity of the packed bed seen through its gas.
        let k_b_eff: Vec<f64> = k_g
            .iter()
            .zip(k_b.iter())
            .map(|(&kg, &kb)| effective_thermal_conductivity(kg, kb, 0.5))
            .collect();

        let mdot = self.mass_flow_rate_gas();
        let u: Vec<f64> = (0..mdot.len())
            .map(|i| mdot[i] / (rho_g[i] * self.gas_cross_area[i]))
            .collect();

        // Tscheng is read here as using the rotation rate in the wall-bed
        // Nusselt argument and the angular velocity in Re_w.
        let n_rot = self.geom.rotation_rate();
        let w = 2.0 * PI * n_rot;

        let (chi, d_p) = {
            let m = self
                .materials
                .as_ref()
                .ok_or_else(|| KilnError::MissingData("Wall materials not set".to_string()))?;
            (m.wall_film_chi, m.particle_diameter)
        };

        let htc = self
            .htc
            .as_mut()
            .ok_or_else(|| KilnError::MissingData("HTC model not initialized".to_string()))?;
        htc.update(&rho_g, &mu, &u, w);
        self.h_cgw = htc.h_gw(&k_g);
        self.h_cgb = htc.h_gb(&k_g);
        self.h_cwb = match self.wall_bed {
            WallBedExchange::Hanein2016 => {
                h_wb_hanein(&k_g, &k_b_eff, &a_b, w, &self.central_angle, chi, d_p)
            }
            WallBedExchange::Tscheng1979 => {
                htc.h_wb(&k_b_eff, n_rot, &self.R_zw, &self.central_angle, &a_b)
            }
        };
        Ok(())
    }

    /// Compute all fluxes with the latest radial solution.
    #[allow(non_snake_case)]
    fn update_fluxes(&mut self, T_g: &[f64], T_b: &[f64], e_g: &[f64], a_g: &[f64]) {
        let n = self.geom.n_cells();
        for i in 0..n {
            let T_w = self.guess[i];
            let T_s = self.guess[3 * n + i];

            let q_cgw = self.fn_q_cgw(i, T_g[i], T_w);
            let q_rgw = self.fn_q_rgw(i, T_g[i], T_w, e_g[i], a_g[i]);
            let q_cgb = self.fn_q_cgb(i, T_g[i], T_b[i]);
            let q_rgb = self.fn_q_rgb(i, T_g[i], T_b[i], e_g[i], a_g[i]);
            let q_cwb = self.fn_q_cwb(i, T_w, T_b[i]);
            let q_rwb = self.fn_q_rwb(i, T_w, T_b[i]);
            let q_env = self.fn_q_env(i, T_s);

            self.q_cgw[i] = q_cgw;
            self.q_rgw[i] = q_rgw;
            self.q_cgb[i] = q_cgb;
            self.q_rgb[i] = q_rgb;
            self.q_cwb[i] = q_cwb;
            self.q_rwb[i] = q_rwb;
            self.q_env[i] = q_env;

            self.bal_gas[i] = q_cgw + q_cgb + q_rgw + q_rgb;
            self.bal_bed[i] = q_cwb + q_cgb + q_rwb + q_rgb;
        }
    }

    /// Use the latest model states to compute radial exchanges.
    #[allow(non_snake_case)]
    fn update_exchanges(
        &mut self,
        tfm: &FreeboardModel,
        tbm: &SilicaBasedBed,
        radon: bool,
    ) -> Result<(), KilnError> {
        self.update_htc(tfm, tbm)?;

        let n = self.geom.n_cells();
        let T_g_full = self.temperature_gas();
        let T_b_full = self.temperature_bed();
        let T_g: Vec<f64> = T_g_full[1..=n].to_vec();
        let T_b: Vec<f64> = T_b_full[1..=n].to_vec();

        let (e_g, a_g) = match (&self.radcal, radon) {
            (Some(radcal), true) => {
                let X = self.mole_fractions_gas(tfm);
                let idx_h2o = 3;
                let idx_co2 = 2;
                let x_h2o: Vec<f64> = (1..=n).map(|r| X[r][idx_h2o]).collect();
                let x_co2: Vec<f64> = (1..=n).map(|r| X[r][idx_co2]).collect();
                radcal.properties(&T_b, &T_g, &x_h2o, &x_co2, &self.beam_length)
            }
            _ => (vec![0.0; n], vec![0.0; n]),
        };

        let mut guess = std::mem::take(&mut self.guess);
        let outcome = {
            let residual = |i: usize, x: &[f64; 4]| {
                self.steady_constraints_cell(i, x, T_g[i], T_b[i], e_g[i], a_g[i])
            };
            solve_radial_stack(
                residual,
                &mut guess,
                n,
                &self.strategy,
                (self.T_min, self.T_max),
            )
        };
        self.guess = guess;
        outcome.map_err(KilnError::ConstraintSolve)?;

        self.update_fluxes(&T_g, &T_b, &e_g, &a_g);
        Ok(())
    }

    /// Check whether the absolute temperature change converged.
    fn test_convergence(&mut self, atol: f64, min_convergence_steps: usize) -> bool {
        let tg = self.temperature_gas();
        let tb = self.temperature_bed();

        self.errg = tg
            .iter()
            .zip(self.Tg_last.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        self.errb = tb
            .iter()
            .zip(self.Tb_last.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);

        self.Tg_last = tg;
        self.Tb_last = tb;

        self.history_gas.push(self.errg);
        self.history_bed.push(self.errb);

        if self.errg <= atol && self.errb <= atol {
            self.count += 1;
        } else {
            self.count = 0;
        }

        self.count >= min_convergence_steps
    }

    ///////////////////////////////////////////////////////////////
    // Post-processing
    ///////////////////////////////////////////////////////////////

    /// Compile the model results in tabular format.
    #[allow(non_snake_case)]
    fn tabulate_solution(&mut self, tfm: &FreeboardModel, tbm: &SilicaBasedBed) {
        let n = self.geom.n_cells();
        let dz = self.geom.cell_length();
        let z = self.geom.coordinates();

        let T_g = self.temperature_gas();
        let T_b = self.temperature_bed();
        let Y_g = self.mass_fractions_gas();
        let X_g = self.mole_fractions_gas(tfm);
        let (rho, mu, k_g) = tfm.get_gas_properties(&T_g, &Y_g);

        let mdot_gas = self.mass_flow_rate_gas();
        let mdot_bed = self.mass_flow_rate_bed();
        let u: Vec<f64> = (0..mdot_gas.len())
            .map(|i| mdot_gas[i] / (rho[i] * self.gas_cross_area[i]))
            .collect();

        // Bed residence time accumulated from the feed end [min].
        let tau_cells: Vec<f64> = (0..mdot_bed.len())
            .map(|i| tbm.specific_mass() * self.bed_cross_area[i] * dz / mdot_bed[i])
            .collect();
        let tau_acc = cumtrapz(&tau_cells, 1.0);
        let tau: Vec<f64> = tau_acc.iter().rev().map(|&t| t / 60.0).collect();

        let mut df = ResultsTable::new();
        df.push("z", z.to_vec());
        df.push("t", tau);
        df.push("h", self.bed_height.clone());
        df.push("load", self.local_loading.clone());
        df.push("area_bed", self.bed_cross_area.clone());
        df.push("area_gas", self.gas_cross_area.clone());

        df.push("temp_gas", T_g.clone());
        df.push("temp_bed", T_b.clone());

        df.push("mdot_gas", mdot_gas);
        df.push("mdot_bed", mdot_bed);

        df.push("gas_density", rho);
        df.push("gas_viscosity", mu);
        df.push("gas_conductivity", k_g);
        df.push("gas_speed", u);

        // Wall temperatures from the converged radial solution.
        let unpack = |offset: usize| -> Vec<f64> {
            (0..n).map(|i| self.guess[offset * n + i]).collect()
        };
        df.push_cell_based("temp_inner", &unpack(0));
        df.push_cell_based("temp_coat", &unpack(1));
        df.push_cell_based("temp_refr", &unpack(2));
        df.push_cell_based("temp_shell", &unpack(3));

        df.push("P_xgw", self.P_xgw.clone());
        df.push("P_xgb", self.P_xgb.clone());
        df.push("P_cwb", self.P_cwb.clone());
        df.push("P_rwb", self.P_rwb.clone());

        df.push("A_cgw", self.A_cgw.clone());
        df.push("A_rgw", self.A_rgw.clone());
        df.push("A_cgb", self.A_cgb.clone());
        df.push("A_rgb", self.A_rgb.clone());
        df.push("A_cwb", self.A_cwb.clone());
        df.push("A_rwb", self.A_rwb.clone());

        df.push("h_cgb", self.h_cgb.clone());
        df.push("h_cgw", self.h_cgw.clone());
        df.push("h_cwb", self.h_cwb.clone());

        // Flux densities per unit length [W/m].
        let density = |q: &[f64], sign: f64| -> Vec<f64> {
            q.iter().map(|&v| sign * v / dz).collect()
        };
        df.push_cell_based("q_gas", &density(&self.bal_gas, -1.0));
        df.push_cell_based("q_bed", &density(&self.bal_bed, 1.0));
        df.push_cell_based("q_env", &density(&self.q_env, 1.0));
        df.push_cell_based("q_cgw", &density(&self.q_cgw, 1.0));
        df.push_cell_based("q_rgw", &density(&self.q_rgw, 1.0));
        df.push_cell_based("q_cgb", &density(&self.q_cgb, 1.0));
        df.push_cell_based("q_rgb", &density(&self.q_rgb, 1.0));
        df.push_cell_based("q_cwb", &density(&self.q_cwb, 1.0));
        df.push_cell_based("q_rwb", &density(&self.q_rwb, 1.0));

        let mole = |idx: usize| -> Vec<f64> { X_g.iter().map(|row| row[idx]).collect() };
        df.push("x_o2", mole(1));
        df.push("x_h2o", mole(3));
        df.push("x_co2", mole(2));
        df.push("x_n2", mole(5));

        // Per-cell closure of the radial balance, zero at convergence.
        let residual: Vec<f64> = (0..n)
            .map(|i| {
                let bg = self.q_cgw[i] + self.q_rgw[i] - self.q_rwb[i] - self.q_cwb[i];
                (self.q_env[i] - bg) / dz
            })
            .collect();
        df.push_cell_based("balance_residual", &residual);

        // Integral diagnostics over the cell centers.
        let z_cells = &z[1..=n];
        let q_env_cells: Vec<f64> = self.q_env.iter().map(|&q| q / dz).collect();
        let q_bed_cells: Vec<f64> = self.bal_bed.iter().map(|&q| q / dz).collect();
        self.q_loss = simpson(&q_env_cells, z_cells) / 1000.0;
        self.q_bed_total = simpson(&q_bed_cells, z_cells) / 1000.0;

        info!("Environment losses ... {:.2} kW", self.q_loss);
        info!("Bed total heat flux .. {:.2} kW", self.q_bed_total);

        self.table = Some(df);
    }

    ///////////////////////////////////////////////////////////////
    // External API
    ///////////////////////////////////////////////////////////////

    /// Iteratively solve the kiln problem in 1D.
    ///
    /// Alternates gas and bed integrations with the radial constraint
    /// solve until the temperature profiles converge, then tabulates the
    /// final state. Running out of `max_steps` is not an error: the
    /// returned outcome carries `MaxStepsReached` and the table holds the
    /// best-effort state.
    pub fn simulate(
        &mut self,
        tfm: &mut FreeboardModel,
        tbm: &mut SilicaBasedBed,
        materials: WallMaterials,
        config: &SimulationConfig,
    ) -> Result<SimulationOutcome, KilnError> {
        self.relax = config.relax;
        self.count = 0;

        if !self.initialized {
            info!("Running initialization");
            self.initialize(tfm, tbm, materials, config)?;
        } else {
            self.materials = Some(materials);
        }

        let mut steps_run = 0;
        for step in 0..config.max_steps {
            self.status = SimulationStatus::Iterating;

            debug!("Integrating at step {}", step);
            self.integrate_gas(tfm, config)?;
            self.integrate_bed(tbm, config)?;

            debug!("Solving nonlinear constraints ({})", step);
            self.update_exchanges(tfm, tbm, step >= config.minrad)?;

            steps_run = step + 1;
            if self.test_convergence(config.atol, config.min_convergence_steps)
                && step > config.minrad
            {
                info!(
                    "Leaving on step {} with res = {:.6}",
                    step,
                    self.errg.max(self.errb)
                );
                self.status = SimulationStatus::Converged;
                break;
            }

            debug!("Gas integration ({}) res = {:.6}", step, self.errg);
            debug!("Bed integration ({}) res = {:.6}", step, self.errb);
        }

        if self.status != SimulationStatus::Converged {
            self.status = SimulationStatus::MaxStepsReached;
            warn!(
                "Iteration budget exhausted after {} steps, res = {:.6}",
                steps_run,
                self.errg.max(self.errb)
            );
        }

        self.update_exchanges(tfm, tbm, true)?;
        self.tabulate_solution(tfm, tbm);

        Ok(SimulationOutcome {
            status: self.status,
            steps: steps_run,
            residual_gas: self.errg,
            residual_bed: self.errb,
            shell_loss: self.q_loss,
            bed_duty: self.q_bed_total,
        })
    }

    ///////////////////////////////////////////////////////////////
    // Public properties
    ///////////////////////////////////////////////////////////////

    /// Kiln length [m].
    pub fn length(&self) -> f64 {
        self.geom.length()
    }

    /// Kiln cell centers and ends [m].
    pub fn coordinates(&self) -> &[f64] {
        self.geom.coordinates()
    }

    pub fn geometry(&self) -> &KilnGeometry {
        &self.geom
    }

    /// Bed height profile [m].
    pub fn bed_height(&self) -> &[f64] {
        &self.bed_height
    }

    /// Bed cord length profile [m].
    pub fn bed_cord_length(&self) -> &[f64] {
        &self.bed_cord_length
    }

    /// Bed cross section profile [m²].
    pub fn bed_cross_area(&self) -> &[f64] {
        &self.bed_cross_area
    }

    /// Gas cross section profile [m²].
    pub fn gas_cross_area(&self) -> &[f64] {
        &self.gas_cross_area
    }

    /// Local kiln loading fraction profile.
    pub fn local_loading(&self) -> &[f64] {
        &self.local_loading
    }

    /// Mean kiln loading fraction.
    pub fn mean_loading(&self) -> f64 {
        self.mean_loading
    }

    /// Results table of the last `simulate` call.
    pub fn table(&self) -> Option<&ResultsTable> {
        self.table.as_ref()
    }

    /// Shell loss of the last `simulate` call [kW].
    pub fn shell_loss(&self) -> f64 {
        self.q_loss
    }

    /// Bed energy supply of the last `simulate` call [kW].
    pub fn bed_heat_flux(&self) -> f64 {
        self.q_bed_total
    }

    /// Per-iteration maximum temperature changes (gas, bed).
    pub fn history(&self) -> (&[f64], &[f64]) {
        (&self.history_gas, &self.history_bed)
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }
}
