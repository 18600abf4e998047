use thiserror::Error;

/// Failures of the persistent settings store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unable to encode '{key}': {source}")]
    Encode {
        key: &'static str,
        source: serde_json::Error,
    },

    #[error("Stored value for '{key}' is malformed: {source}")]
    Decode {
        key: &'static str,
        source: serde_json::Error,
    },

    #[error("Settings document is corrupted: {0}")]
    Corrupted(serde_json::Error),

    #[error("Value for '{0}' is not a JSON document")]
    NotJson(String),

    #[error("Could not determine a data directory for this platform")]
    NoDataDir,
}

/// Errors surfaced to callers of the engine. Everything else degrades to defaults.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Intake volume must be a positive amount of milliliters")]
    InvalidVolume,

    #[error("Daily goal must be a positive amount of milliliters")]
    InvalidGoal,

    #[error("Checkpoint hour {0} is not an hour of the day")]
    InvalidCheckpointHour(u32),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
}
