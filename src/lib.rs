//! Dimerscreen - Primer-Dimer Screening Tool
//!
//! Flags primer pairs in large multiplex sets whose 3' tails can anneal to
//! each other, using a mismatch-tolerant tail index, reverse-complement
//! j-mer signatures and exact edit-distance alignment.

pub mod analysis;

pub use analysis::*;
