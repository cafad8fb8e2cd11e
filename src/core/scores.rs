/// High scores: best completion times in a flat key-value store.
///
/// One `f32` per stage under `HighScore_<stage>`, lower is better. A value
/// of zero or below means "no score" and is never reported as a best.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON serialization error: {0}")]
    Serialize(#[from] ron::error::Error),
}

/// Stages that were saved under another name by older builds.
const LEGACY_ALIASES: &[(&str, &str)] = &[("Scene2", "Stage2")];

/// Store key for a stage's best time.
pub fn high_score_key(stage: &str) -> String {
    format!("HighScore_{stage}")
}

/// Flat numeric key-value persistence. Last writer wins.
pub trait ScoreStore {
    fn get(&self, key: &str) -> Option<f32>;
    fn set(&mut self, key: &str, value: f32);
    /// Returns true if the key existed.
    fn remove(&mut self, key: &str) -> bool;
    fn keys(&self) -> Vec<String>;
    /// Flush to the backing medium.
    fn save(&mut self) -> Result<(), ScoreError>;
}

/// Non-persistent store for tests and tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryStore {
    values: BTreeMap<String, f32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryStore {
    fn get(&self, key: &str) -> Option<f32> {
        self.values.get(key).copied()
    }

    fn set(&mut self, key: &str, value: f32) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn save(&mut self) -> Result<(), ScoreError> {
        Ok(())
    }
}

/// Store backed by a RON map on disk. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct RonFileStore {
    path: PathBuf,
    values: MemoryStore,
}

impl RonFileStore {
    pub fn open(path: &Path) -> Result<Self, ScoreError> {
        let values = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            ron::from_str(&contents)?
        } else {
            debug!("no score file at {}, starting empty", path.display());
            MemoryStore::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScoreStore for RonFileStore {
    fn get(&self, key: &str) -> Option<f32> {
        self.values.get(key)
    }

    fn set(&mut self, key: &str, value: f32) {
        self.values.set(key, value);
    }

    fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key)
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys()
    }

    fn save(&mut self) -> Result<(), ScoreError> {
        let serialized =
            ron::ser::to_string_pretty(&self.values, ron::ser::PrettyConfig::default())?;
        std::fs::write(&self.path, serialized)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordOutcome {
    NewBest { time: f32, previous: Option<f32> },
    NotImproved { time: f32, best: f32 },
}

impl RecordOutcome {
    pub fn is_new_best(&self) -> bool {
        matches!(self, Self::NewBest { .. })
    }
}

/// Best-time bookkeeping over a `ScoreStore`.
pub struct HighScores {
    store: Box<dyn ScoreStore>,
}

impl Default for HighScores {
    fn default() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl HighScores {
    pub fn new(store: impl ScoreStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub fn store(&self) -> &dyn ScoreStore {
        self.store.as_ref()
    }

    /// Best time for a stage, including any legacy key it was saved under.
    pub fn best(&self, stage: &str) -> Option<f32> {
        let mut keys = vec![high_score_key(stage)];
        keys.extend(
            LEGACY_ALIASES
                .iter()
                .filter(|(name, _)| *name == stage)
                .map(|(_, legacy)| high_score_key(legacy)),
        );
        self.best_of(&keys)
    }

    /// Lowest positive value among `keys`.
    pub fn best_of<S: AsRef<str>>(&self, keys: &[S]) -> Option<f32> {
        keys.iter()
            .filter_map(|key| self.store.get(key.as_ref()))
            .filter(|time| *time > 0.0)
            .reduce(f32::min)
    }

    pub fn has_completed(&self, stage: &str) -> bool {
        self.best(stage).is_some()
    }

    /// Store `time` if it beats the current best. Ties do not overwrite.
    pub fn record(&mut self, stage: &str, time: f32) -> Result<RecordOutcome, ScoreError> {
        match self.best(stage) {
            Some(best) if time >= best => {
                info!(
                    "{stage}: time {} (best {})",
                    format_time(time, true),
                    format_time(best, true)
                );
                Ok(RecordOutcome::NotImproved { time, best })
            }
            previous => {
                self.store.set(&high_score_key(stage), time);
                self.store.save()?;
                info!("{stage}: new best time {}", format_time(time, true));
                Ok(RecordOutcome::NewBest { time, previous })
            }
        }
    }

    /// Forget a stage's best time, legacy keys included.
    pub fn clear(&mut self, stage: &str) -> Result<(), ScoreError> {
        self.store.remove(&high_score_key(stage));
        for (_, legacy) in LEGACY_ALIASES.iter().filter(|(name, _)| *name == stage) {
            self.store.remove(&high_score_key(legacy));
        }
        self.store.save()
    }

    /// Forget every stored best time.
    pub fn clear_all(&mut self) -> Result<(), ScoreError> {
        for key in self.store.keys() {
            if key.starts_with("HighScore_") {
                self.store.remove(&key);
            }
        }
        self.store.save()
    }
}

/// `mm:ss.mmm`, or `mm:ss` without milliseconds. Fractions are floored.
pub fn format_time(seconds: f32, show_milliseconds: bool) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor() as u32;
    let secs = (seconds % 60.0).floor() as u32;
    if show_milliseconds {
        let millis = ((seconds * 1000.0) % 1000.0).floor() as u32;
        format!("{minutes:02}:{secs:02}.{millis:03}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

/// A best time for display, `--:--` when there is none.
pub fn format_best(best: Option<f32>, show_milliseconds: bool) -> String {
    match best {
        Some(time) => format_time(time, show_milliseconds),
        None => "--:--".to_string(),
    }
}
