/// end-to-end silica kiln case: natural gas freeboard with air leak
/// identification, silica bed and a refractory wall stack
pub mod silica_kiln;
