/// NASA-7 polynomial evaluation of ideal gas thermodynamic properties
pub mod nasa7;
/// Sutherland viscosity law and Eucken-corrected thermal conductivity
pub mod sutherland;
/// eng
/// Gas mixture thermophysics provider: the `GasThermo` trait exposes species
/// bookkeeping, mass/mole fraction conversion and mixture properties as
/// functions of (T, Y), so the phase models are indifferent to whether a
/// full kinetics library or the built-in closed-form surrogate backs them.
/// The built-in `Methane1SGas` covers the 6-species single-step methane
/// combustion system `CH4 + 2 O2 => CO2 + 2 H2O` (+ AR, N2 as inerts).
/// ----------------------------------------------------------------
/// ru
/// Модуль теплофизики газовой смеси: трейт `GasThermo` предоставляет
/// свойства смеси как функции (T, Y); встроенная реализация `Methane1SGas`
/// охватывает шестикомпонентную систему одностадийного горения метана
pub mod gas_mixture;
