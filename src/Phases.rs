/// phase model contract: ODE right-hand side evaluation against the kiln
/// geometry, with section properties supplied as explicit interpolants
pub mod bases;
/// granular bed energy balance with silica thermophysics and moisture
/// correction
pub mod bed;
/// freeboard gas mass/energy/species balances with selectable combustion
/// kinetics closure
pub mod freeboard;
