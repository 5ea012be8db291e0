//! Session Layer
//!
//! The authoritative game session and its collaborators: configuration,
//! tap debouncing and progress persistence.

pub mod config;
pub mod debounce;
pub mod engine;
pub mod store;

pub use config::{ConfigError, SessionConfig};
pub use debounce::TapDebouncer;
pub use engine::{CommandOutcome, GameSession, SessionId};
pub use store::{JsonFileStore, MemoryStore, ProgressRecord, ProgressStore, StoreError};
