//! Core primitives.
//!
//! Seeded randomness and colour math. Nothing here knows about rounds or
//! sessions.

pub mod rng;
pub mod color;

// Re-export core types
pub use rng::{DeterministicRng, RandomSource, derive_session_seed};
pub use color::Hsl;
