#![allow(dead_code, non_snake_case, non_upper_case_globals)]

//! Crystal-field and Zeeman level structure of a single magnetic ion.
//!
//! Hamiltonians are assembled from lazily rebuilt terms (see [`node`] and
//! [`system`]); changing any parameter marks every dependent quantity stale,
//! and energies and eigenstates are recomputed only when next requested.

pub mod error;
pub mod constants;
pub mod spin;
pub mod operators;
pub mod stevens;
pub mod time_reversal;
pub mod node;
pub mod symmetry;
pub mod system;
pub mod ion;
pub mod mixer;
pub mod config;

pub use error::{ Error, Result };
