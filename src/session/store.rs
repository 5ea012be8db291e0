//! Progress Store
//!
//! Contract for the persistence collaborator. The session treats every call
//! as best-effort: a failure is logged and surfaced as an advisory event,
//! never as a gameplay error.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// Persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend cannot be reached or refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Underlying I/O failed.
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be encoded or decoded.
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Long-lived player progress.
pub trait ProgressStore: Send + Sync {
    /// Best score so far.
    fn high_score(&self) -> Result<u32, StoreError>;
    /// Overwrite the best score.
    fn set_high_score(&self, score: u32) -> Result<(), StoreError>;
    /// Highest level reached so far.
    fn highest_level(&self) -> Result<u32, StoreError>;
    /// Overwrite the highest level.
    fn set_highest_level(&self, level: u32) -> Result<(), StoreError>;
    /// Count one started session.
    fn increment_games_played(&self) -> Result<(), StoreError>;
    /// Count one correct answer.
    fn increment_correct_answers(&self) -> Result<(), StoreError>;
}

/// Snapshot of everything a store keeps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Best score
    pub high_score: u32,
    /// Highest level reached
    pub highest_level: u32,
    /// Sessions started
    pub games_played: u32,
    /// Correct taps overall
    pub correct_answers: u32,
    /// Last write
    pub last_played: Option<DateTime<Utc>>,
}

/// In-memory store.
///
/// Can be switched into a failing mode to exercise the session's
/// collaborator-failure path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Mutex<ProgressRecord>,
    failing: AtomicBool,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with `record`.
    pub fn with_record(record: ProgressRecord) -> Self {
        Self {
            record: Mutex::new(record),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Copy of the current record.
    pub fn record(&self) -> Result<ProgressRecord, StoreError> {
        self.read(|r| r.clone())
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".into()));
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&ProgressRecord) -> T) -> Result<T, StoreError> {
        self.check()?;
        let record = self
            .record
            .lock()
            .map_err(|_| StoreError::Unavailable("record lock poisoned".into()))?;
        Ok(f(&record))
    }

    fn write(&self, f: impl FnOnce(&mut ProgressRecord)) -> Result<(), StoreError> {
        self.check()?;
        let mut record = self
            .record
            .lock()
            .map_err(|_| StoreError::Unavailable("record lock poisoned".into()))?;
        f(&mut record);
        record.last_played = Some(Utc::now());
        Ok(())
    }
}

impl ProgressStore for MemoryStore {
    fn high_score(&self) -> Result<u32, StoreError> {
        self.read(|r| r.high_score)
    }

    fn set_high_score(&self, score: u32) -> Result<(), StoreError> {
        self.write(|r| r.high_score = score)
    }

    fn highest_level(&self) -> Result<u32, StoreError> {
        self.read(|r| r.highest_level)
    }

    fn set_highest_level(&self, level: u32) -> Result<(), StoreError> {
        self.write(|r| r.highest_level = level)
    }

    fn increment_games_played(&self) -> Result<(), StoreError> {
        self.write(|r| r.games_played += 1)
    }

    fn increment_correct_answers(&self) -> Result<(), StoreError> {
        self.write(|r| r.correct_answers += 1)
    }
}

// =============================================================================
// JSON FILE STORE
// =============================================================================

/// Store backed by a JSON document on disk.
///
/// The record is cached in memory and the whole document is rewritten on
/// every update, through a temporary file renamed over the target.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    record: Mutex<ProgressRecord>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file starts an empty record.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let record = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == ErrorKind::NotFound => ProgressRecord::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            record: Mutex::new(record),
        })
    }

    /// Location of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the cached record.
    pub fn record(&self) -> Result<ProgressRecord, StoreError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ProgressRecord>, StoreError> {
        self.record
            .lock()
            .map_err(|_| StoreError::Unavailable("record lock poisoned".into()))
    }

    fn update(&self, f: impl FnOnce(&mut ProgressRecord)) -> Result<(), StoreError> {
        let mut record = self.lock()?;
        let mut next = record.clone();
        f(&mut next);
        next.last_played = Some(Utc::now());

        let json = serde_json::to_vec_pretty(&next)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        // Cache only changes once they are on disk
        *record = next;
        Ok(())
    }
}

impl ProgressStore for JsonFileStore {
    fn high_score(&self) -> Result<u32, StoreError> {
        Ok(self.lock()?.high_score)
    }

    fn set_high_score(&self, score: u32) -> Result<(), StoreError> {
        self.update(|r| r.high_score = score)
    }

    fn highest_level(&self) -> Result<u32, StoreError> {
        Ok(self.lock()?.highest_level)
    }

    fn set_highest_level(&self, level: u32) -> Result<(), StoreError> {
        self.update(|r| r.highest_level = level)
    }

    fn increment_games_played(&self) -> Result<(), StoreError> {
        self.update(|r| r.games_played += 1)
    }

    fn increment_correct_answers(&self) -> Result<(), StoreError> {
        self.update(|r| r.correct_answers += 1)
    }
}
