//! # Shade Spotter
//!
//! Game session engine for a "spot the differently-shaded tile" puzzle.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SHADE SPOTTER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── rng.rs      - Seeded Xorshift128+ and RandomSource      │
//! │  └── color.rs    - HSL colours                               │
//! │                                                              │
//! │  game/           - Rules (no I/O)                            │
//! │  ├── difficulty.rs - Level to grid/timer/shape/delta         │
//! │  ├── round.rs    - Grid generation                           │
//! │  ├── state.rs    - Game state and transforms                 │
//! │  ├── timer.rs    - Cancellable countdown                     │
//! │  └── events.rs   - UI events                                 │
//! │                                                              │
//! │  session/        - Concurrency and collaborators             │
//! │  ├── engine.rs   - GameSession state machine                 │
//! │  ├── config.rs   - Tunables                                  │
//! │  ├── debounce.rs - Tap debouncing                            │
//! │  └── store.rs    - Progress persistence                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Every state mutation, whether it comes from a tap, a UI command or the
//! countdown, runs under one async mutex. Tap and timeout race for that
//! gate; the winner flips `is_game_active` and the loser sees an inactive
//! round. Countdown runs carry an id and signals from a cancelled run are
//! dropped under the same gate.
//!
//! ## Determinism
//!
//! Round generation only draws from an injected [`RandomSource`]. A session
//! built with [`GameSession::with_seed`] produces the same grids for the
//! same sequence of commands.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod session;

// Re-export commonly used types
pub use crate::core::rng::{DeterministicRng, RandomSource};
pub use crate::core::color::Hsl;
pub use crate::game::difficulty::DifficultyProfile;
pub use crate::game::events::GameUiEvent;
pub use crate::game::round::{generate, CellId, Round};
pub use crate::game::state::{GameState, Outcome, TapResolution};
pub use crate::session::{CommandOutcome, GameSession, MemoryStore, ProgressStore, SessionConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
