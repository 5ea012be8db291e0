//! Game Logic Module
//!
//! Pure gameplay rules plus the countdown and event plumbing the session
//! builds on.
//!
//! ## Module Structure
//!
//! - `difficulty`: Level to grid size, timer, shape and colour delta
//! - `round`: Round (grid) generation
//! - `state`: Session state and the transforms applied to it
//! - `timer`: Cancellable per-second countdown
//! - `events`: UI notifications

pub mod difficulty;
pub mod round;
pub mod state;
pub mod timer;
pub mod events;

// Re-export key types
pub use difficulty::{DifficultyLabel, DifficultyProfile, Shape};
pub use round::{CellId, GridCell, Round};
pub use state::{GameState, Outcome, TapResolution};
pub use timer::{CountdownTimer, TimerEvent, TimerState};
pub use events::{EventChannel, GameUiEvent};
