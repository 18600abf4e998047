use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::{
    config::EngineConfig,
    errors::StorageError,
    event_log::EventLog,
    history::{HistoryStore, HistoryWindow},
    paths,
    structs::{DailyRecord, ReminderProfile},
};

pub const DAILY_GOAL_KEY: &str = "dailyGoal";
pub const LAST_RESET_DATE_KEY: &str = "lastResetDate";
pub const TODAY_INTAKE_KEY: &str = "todayIntake";
pub const DAILY_HISTORY_KEY: &str = "dailyHistory";
pub const REMINDER_PROFILE_KEY: &str = "reminderProfile";
pub const AVERAGE_GAP_KEY: &str = "averageGapSeconds";
pub const DRINKING_PATTERN_KEY: &str = "drinkingPattern";
pub const SETTINGS_KEY: &str = "settings";

/// Key/value store of opaque blobs.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Writes several keys as one update. Stores that can commit atomically should
    /// override this; the fallback writes the keys one after another.
    fn set_many(&self, entries: &[(&str, Vec<u8>)]) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// Keeps everything in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemorySettingsStore(RwLock<BTreeMap<String, Vec<u8>>>);

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let map = self.0.read().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut map = self.0.write().unwrap_or_else(|e| e.into_inner());
        map.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn set_many(&self, entries: &[(&str, Vec<u8>)]) -> Result<(), StorageError> {
        let mut map = self.0.write().unwrap_or_else(|e| e.into_inner());
        for (key, value) in entries {
            map.insert(key.to_string(), value.clone());
        }
        Ok(())
    }
}

/// Stores every key in a single JSON document on disk. Values must themselves be JSON
/// so the file stays readable.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    document: RwLock<BTreeMap<String, serde_json::Value>>,
}

impl FileSettingsStore {
    /// Opens the settings document in the platform data directory.
    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(paths::settings_path()?)
    }

    /// Opens (or starts) the document at `path`. A corrupted document is set aside
    /// and replaced with an empty one.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        debug!("Settings path: {:?}", path);

        if let Some(dir) = path.parent() {
            if !dir.try_exists()? {
                std::fs::create_dir_all(dir)?;
            }
        }

        let document = if path.exists() {
            let raw = std::fs::read(&path)?;
            match serde_json::from_slice(&raw) {
                Ok(document) => document,
                Err(e) => {
                    warn!("{}, starting over", StorageError::Corrupted(e));
                    std::fs::rename(&path, path.with_extension("json.bak"))?;
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            document: RwLock::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the file with the current document through a temporary file and a rename.
    fn commit(&self, document: &BTreeMap<String, serde_json::Value>) -> Result<(), StorageError> {
        let serialized = serde_json::to_vec_pretty(document).map_err(StorageError::Corrupted)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serialized)?;
        std::fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

fn parse_json(key: &str, value: &[u8]) -> Result<serde_json::Value, StorageError> {
    serde_json::from_slice(value).map_err(|_| StorageError::NotJson(key.to_string()))
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let document = self.document.read().unwrap_or_else(|e| e.into_inner());
        let Some(value) = document.get(key) else {
            return Ok(None);
        };

        serde_json::to_vec(value)
            .map(Some)
            .map_err(StorageError::Corrupted)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.set_many(&[(key, value.to_vec())])
    }

    /// Parses every value first, then commits them with a single file write. Nothing
    /// changes, in memory or on disk, if any value is rejected or the write fails.
    fn set_many(&self, entries: &[(&str, Vec<u8>)]) -> Result<(), StorageError> {
        let parsed = entries
            .iter()
            .map(|(key, value)| -> Result<_, StorageError> {
                Ok((key.to_string(), parse_json(key, value)?))
            })
            .collect::<Result<Vec<_>, StorageError>>()?;

        let mut document = self.document.write().unwrap_or_else(|e| e.into_inner());
        let mut updated = document.clone();
        updated.extend(parsed);
        self.commit(&updated)?;
        *document = updated;

        Ok(())
    }
}

/// Reads and decodes `key`. `Ok(None)` when the key was never written.
pub fn read_value<T: DeserializeOwned>(
    store: &dyn SettingsStore,
    key: &'static str,
) -> Result<Option<T>, StorageError> {
    let Some(bytes) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StorageError::Decode { key, source })
}

pub fn write_value<T: Serialize + ?Sized>(
    store: &dyn SettingsStore,
    key: &'static str,
    value: &T,
) -> Result<(), StorageError> {
    store.set(key, &encode(key, value)?)
}

fn encode<T: Serialize + ?Sized>(key: &'static str, value: &T) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(value).map_err(|source| StorageError::Encode { key, source })
}

/// Like [`read_value`], except absent and malformed values both come back as `None`.
fn read_or_absent<T: DeserializeOwned>(store: &dyn SettingsStore, key: &'static str) -> Option<T> {
    match read_value(store, key) {
        Ok(value) => value,
        Err(e) => {
            warn!("{e}, falling back to defaults");
            None
        }
    }
}

/// Everything the engine persists.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedState {
    pub config: EngineConfig,
    pub history: HistoryStore,
    pub profile: ReminderProfile,
    pub events: EventLog,
}

/// Loads persisted state. Missing or unreadable keys fall back to defaults.
///
/// An injected `config` wins over the stored settings.
pub fn load_state(
    store: &dyn SettingsStore,
    config: Option<EngineConfig>,
    now: DateTime<FixedOffset>,
) -> PersistedState {
    let config = config.unwrap_or_else(|| {
        let mut config: EngineConfig = read_or_absent(store, SETTINGS_KEY).unwrap_or_default();
        if let Some(goal) = read_or_absent::<u32>(store, DAILY_GOAL_KEY).filter(|g| *g > 0) {
            config.daily_goal_ml = goal;
        }
        if config.validate().is_err() {
            warn!("Stored settings are invalid, using defaults");
            config = EngineConfig::default();
        }
        config
    });

    let window: HistoryWindow = read_or_absent(store, DAILY_HISTORY_KEY).unwrap_or_default();
    let last_reset_date: NaiveDate =
        read_or_absent(store, LAST_RESET_DATE_KEY).unwrap_or_else(|| now.date_naive());
    let mut history = HistoryStore::from_parts(window, last_reset_date, config.daily_goal_ml);

    // The history blob can be lost while the day counter survives
    if history.window().get(last_reset_date).is_none() {
        if let Some(intake) = read_or_absent::<u32>(store, TODAY_INTAKE_KEY).filter(|i| *i > 0) {
            let mut window = history.window().clone();
            window.upsert(DailyRecord {
                date: last_reset_date,
                total_intake_ml: intake,
                goal_ml: config.daily_goal_ml,
            });
            history = HistoryStore::from_parts(window, last_reset_date, config.daily_goal_ml);
        }
    }

    let mut profile = read_or_absent::<ReminderProfile>(store, REMINDER_PROFILE_KEY)
        .filter(|p| {
            let valid = p.is_valid();
            if !valid {
                warn!("Stored reminder profile is out of range, using defaults");
            }
            valid
        })
        .unwrap_or_default();
    if let Some(gap) =
        read_or_absent::<f64>(store, AVERAGE_GAP_KEY).filter(|g| g.is_finite() && *g > 0.0)
    {
        profile.average_gap_seconds = gap;
    }

    let events = read_or_absent(store, DRINKING_PATTERN_KEY).unwrap_or_default();

    PersistedState {
        config,
        history,
        profile,
        events,
    }
}

/// Writes every key in one [`SettingsStore::set_many`] call.
pub fn save_state(
    store: &dyn SettingsStore,
    state: &PersistedState,
    now: DateTime<FixedOffset>,
) -> Result<(), StorageError> {
    let entries = [
        (SETTINGS_KEY, encode(SETTINGS_KEY, &state.config)?),
        (DAILY_GOAL_KEY, encode(DAILY_GOAL_KEY, &state.config.daily_goal_ml)?),
        (
            LAST_RESET_DATE_KEY,
            encode(LAST_RESET_DATE_KEY, &state.history.last_reset_date())?,
        ),
        (
            TODAY_INTAKE_KEY,
            encode(TODAY_INTAKE_KEY, &state.history.today_intake(now))?,
        ),
        (DAILY_HISTORY_KEY, encode(DAILY_HISTORY_KEY, state.history.window())?),
        (REMINDER_PROFILE_KEY, encode(REMINDER_PROFILE_KEY, &state.profile)?),
        (
            AVERAGE_GAP_KEY,
            encode(AVERAGE_GAP_KEY, &state.profile.average_gap_seconds)?,
        ),
        (DRINKING_PATTERN_KEY, encode(DRINKING_PATTERN_KEY, &state.events)?),
    ];
    store.set_many(&entries)
}
