#[cfg(test)]
mod tests {
    use crate::Kiln::rotary_kiln::{
        RotaryKilnModel, SimulationConfig, SimulationStatus, WallMaterials,
    };
    use crate::Phases::freeboard::{EddyBreakUpKinetics, FreeboardModel, KineticsClosure};
    use crate::Phases::bed::SilicaBasedBed;
    use crate::Solvers::steady_state::SolverStrategy;
    use crate::Thermophysics::gas_mixture::{
        Methane1SGas, ONE_ATM, air_composition, methane_fuel,
    };
    use approx::assert_relative_eq;

    fn reference_materials() -> WallMaterials {
        WallMaterials::new(
            Box::new(|_z| 0.01),
            Box::new(|_z| 0.15),
            Box::new(|_z| 0.01),
            Box::new(|_z, _t| 2.0),
            Box::new(|_z, _t| 1.5),
            Box::new(|_z, _t| 50.0),
        )
    }

    fn reference_freeboard() -> FreeboardModel {
        // Pre-equilibrated inlet: burnt fumes cooling down the kiln, which
        // keeps the coupled test independent of the kinetics path.
        FreeboardModel::new(
            Methane1SGas::new(ONE_ATM),
            0.12,
            300.0,
            0.9,
            &methane_fuel(),
            &air_composition(),
            KineticsClosure::EddyBreakUp(EddyBreakUpKinetics::default()),
            true,
        )
        .unwrap()
    }

    fn reference_bed() -> SilicaBasedBed {
        SilicaBasedBed::new(500.0, 300.0, 1500.0, 35.0, Box::new(|_t| 0.2))
    }

    fn reference_kiln(nz: usize) -> RotaryKilnModel {
        RotaryKilnModel::new(8.0, 0.4, 2.0, 2.0, 500.0, nz, 0.05).unwrap()
    }

    fn reference_config() -> SimulationConfig {
        SimulationConfig {
            max_steps: 80,
            atol: 10.0,
            relax: 0.5,
            minrad: 5,
            min_convergence_steps: 3,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_zero_feed_limit_empties_bed() {
        // Vanishing feed rate: the bed collapses and the gas sees the full
        // bore in every cell.
        let mut kiln = RotaryKilnModel::new(8.0, 0.4, 2.0, 2.0, 1.0, 4, 0.0).unwrap();
        let mut tfm = reference_freeboard();
        let mut tbm = reference_bed();
        kiln.initialize(
            &mut tfm,
            &mut tbm,
            reference_materials(),
            &reference_config(),
        )
        .unwrap();

        let full_bore = std::f64::consts::PI * 0.4 * 0.4;
        for (ab, ag) in kiln
            .bed_cross_area()
            .iter()
            .zip(kiln.gas_cross_area().iter())
        {
            assert!(*ab < 1.0e-03 * full_bore, "bed area must vanish, got {}", ab);
            assert_relative_eq!(*ag, full_bore, max_relative = 1.0e-03);
        }
        assert!(kiln.mean_loading() < 1.0e-03);
    }

    #[test]
    fn test_scenario_bed_profile_in_bounds() {
        // L = 10 m, R = 0.5 m, 2 deg slope, 1000 kg/h at 2 rpm, 35 deg
        // repose, 1500 kg/m3, open discharge.
        let mut kiln = RotaryKilnModel::new(10.0, 0.5, 2.0, 2.0, 1000.0, 10, 0.0).unwrap();
        let mut tfm = reference_freeboard();
        let mut tbm = SilicaBasedBed::new(1000.0, 300.0, 1500.0, 35.0, Box::new(|_t| 0.2));
        kiln.initialize(
            &mut tfm,
            &mut tbm,
            reference_materials(),
            &reference_config(),
        )
        .unwrap();

        let h = kiln.bed_height();
        for w in h.windows(2) {
            assert!(
                w[1] >= w[0] - 1.0e-10,
                "height must not increase towards discharge: {:?}",
                w
            );
        }
        for hk in h {
            assert!(*hk > 0.0 && *hk < 0.5, "height out of (0, R): {}", hk);
        }
    }

    #[test]
    fn test_simulation_converges_and_conserves_energy() {
        let mut kiln = reference_kiln(4);
        let mut tfm = reference_freeboard();
        let mut tbm = reference_bed();
        let config = reference_config();

        let outcome = kiln
            .simulate(&mut tfm, &mut tbm, reference_materials(), &config)
            .unwrap();

        assert_eq!(outcome.status, SimulationStatus::Converged);
        assert!(outcome.steps > config.minrad);

        // Energy conservation: the radial balance closes in every cell.
        let table = kiln.table().unwrap();
        for r in table.cells("balance_residual").unwrap() {
            assert!(r.abs() < 1.0e-04, "balance residual too large: {}", r);
        }

        // The hot fumes must heat the bed along the kiln.
        let temp_bed = table.get("temp_bed").unwrap();
        assert!(temp_bed[0] > temp_bed[temp_bed.len() - 1]);
        assert!(outcome.bed_duty > 0.0);
        assert!(outcome.shell_loss > 0.0);
    }

    #[test]
    fn test_convergence_streak_is_terminal() {
        let mut kiln = reference_kiln(4);
        let mut tfm = reference_freeboard();
        let mut tbm = reference_bed();
        let config = reference_config();

        let outcome = kiln
            .simulate(&mut tfm, &mut tbm, reference_materials(), &config)
            .unwrap();
        assert_eq!(outcome.status, SimulationStatus::Converged);

        // Once the terminal streak begins the change must never exceed the
        // tolerance again before the loop exits.
        let (gas, bed) = kiln.history();
        assert!(gas.len() >= config.min_convergence_steps);
        for k in gas.len() - config.min_convergence_steps..gas.len() {
            assert!(gas[k] <= config.atol, "gas streak broken at {}: {}", k, gas[k]);
            assert!(bed[k] <= config.atol, "bed streak broken at {}: {}", k, bed[k]);
        }
    }

    #[test]
    fn test_solver_strategies_agree() {
        let config = SimulationConfig {
            max_steps: 3,
            minrad: 1,
            relax: 0.5,
            ..reference_config()
        };

        let run = |strategy: SolverStrategy| -> (Vec<f64>, Vec<f64>) {
            let mut kiln = reference_kiln(4).with_solver_strategy(strategy);
            let mut tfm = reference_freeboard();
            let mut tbm = reference_bed();
            kiln.simulate(&mut tfm, &mut tbm, reference_materials(), &config)
                .unwrap();
            let table = kiln.table().unwrap();
            (
                table.cells("temp_inner").unwrap().to_vec(),
                table.cells("temp_shell").unwrap().to_vec(),
            )
        };

        let (inner_root, shell_root) = run(SolverStrategy::RootFinder {
            tolerance: 1.0e-06,
            max_iterations: 200,
        });
        let (inner_nlp, shell_nlp) = run(SolverStrategy::ConstrainedNlp {
            nlptol: 1.0e-06,
            max_iterations: 2000,
        });

        for i in 0..inner_root.len() {
            assert_relative_eq!(inner_root[i], inner_nlp[i], max_relative = 1.0e-04);
            assert_relative_eq!(shell_root[i], shell_nlp[i], max_relative = 1.0e-04);
        }
    }

    #[test]
    fn test_simulate_is_idempotent() {
        let run = || -> Vec<f64> {
            let mut kiln = reference_kiln(4);
            let mut tfm = reference_freeboard();
            let mut tbm = reference_bed();
            kiln.simulate(
                &mut tfm,
                &mut tbm,
                reference_materials(),
                &reference_config(),
            )
            .unwrap();
            let table = kiln.table().unwrap();
            let mut state = table.get("temp_gas").unwrap().to_vec();
            state.extend_from_slice(table.get("temp_bed").unwrap());
            state.extend_from_slice(table.cells("temp_shell").unwrap());
            state
        };

        let first = run();
        let second = run();
        for (a, b) in first.iter().zip(second.iter()) {
            assert_relative_eq!(a, b, max_relative = 1.0e-12);
        }
    }

    #[test]
    fn test_single_cell_kiln_runs() {
        // One axial cell still carries the two ghost ends everywhere.
        let mut kiln = reference_kiln(1);
        let mut tfm = reference_freeboard();
        let mut tbm = reference_bed();
        let config = SimulationConfig {
            max_steps: 10,
            minrad: 1,
            min_convergence_steps: 2,
            ..reference_config()
        };

        kiln.simulate(&mut tfm, &mut tbm, reference_materials(), &config)
            .unwrap();

        let table = kiln.table().unwrap();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(kiln.coordinates().len(), 3);
        assert_eq!(table.cells("temp_inner").unwrap().len(), 1);
    }

    #[test]
    fn test_budget_exhaustion_is_not_an_error() {
        let mut kiln = reference_kiln(4);
        let mut tfm = reference_freeboard();
        let mut tbm = reference_bed();
        let config = SimulationConfig {
            max_steps: 2,
            minrad: 1,
            atol: 1.0e-09,
            ..reference_config()
        };

        let outcome = kiln
            .simulate(&mut tfm, &mut tbm, reference_materials(), &config)
            .unwrap();
        assert_eq!(outcome.status, SimulationStatus::MaxStepsReached);
        // Best-effort table is still produced.
        assert!(kiln.table().is_some());
    }
}
