#[allow(non_snake_case)]
pub mod Examples;
#[allow(non_snake_case)]
pub mod Kiln;
#[allow(non_snake_case)]
pub mod Models;
#[allow(non_snake_case)]
pub mod Phases;
#[allow(non_snake_case)]
pub mod Solvers;
#[allow(non_snake_case)]
pub mod Thermophysics;
#[allow(non_snake_case)]
pub mod Utils;
