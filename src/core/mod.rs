//! Core deterministic primitives.
//!
//! All types in this module are designed for perfect cross-platform
//! determinism. Combat math is integer-only; every roll flows through
//! the seeded RNG.

pub mod dice;
pub mod rng;

// Re-export core types
pub use dice::{DiceExpr, DiceParseError};
pub use rng::{DeterministicRng, derive_match_seed};
