/// standard-format heat transfer expressions: radial conduction through
/// cylindrical shells, convection, radiation, Arrhenius rate and Maxwell
/// effective thermal conductivity
pub mod heat_transfer;
/// Tscheng (1979) heat transfer coefficient correlations and the
/// Hanein (2016) wall-bed alternative
pub mod htc_tscheng;
/// Kramers (1952) bed height equation and its solver
pub mod kramers_model;
/// neural network surrogate for gas radiative properties (RADCAL data)
pub mod radcal;
/// thermophysical data in Shomate's format
pub mod shomate;
