//! Physical constants in the crate's working units (energies in meV).

// Boltzmann constant [meV / K]
pub const KB: f64 = 1.0 / 11.604;

// Bohr magneton [meV / T]
pub const MU_B: f64 = 0.057883818066;

// spin and orbital g-factors used in the Landé formula
pub const G_S: f64 = 2.002319;
pub const G_L: f64 = 1.0;
