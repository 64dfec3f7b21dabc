/// immutable axial discretization and unit-normalized kiln parameters
pub mod geometry;
/// per-cell results tabulation, pretty printing and CSV export
pub mod results;
/// eng
/// Implementation of the rotary kiln outer fixed-point driver: alternates
/// freeboard and bed integrations with the radial heat-exchange constraint
/// solve, relaxing flux estimates and staging radiation activation until the
/// axial temperature profiles converge.
/// ----------------------------------------------------------------
/// ru
/// Реализация внешнего итерационного цикла вращающейся печи: чередует
/// интегрирование газовой и твердой фаз с решением радиальной системы
/// теплообмена до сходимости осевых температурных профилей
pub mod rotary_kiln;
/// tests
pub mod rotary_kiln_tests;
