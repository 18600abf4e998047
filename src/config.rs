use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{ConfigError, EngineError};

pub const DEFAULT_DAILY_GOAL_ML: u32 = 2250;
pub const DEFAULT_CHECKPOINT_HOUR: u32 = 20;

pub const DEFAULT_MESSAGE: &str =
    "You still have {volume}ml left to reach your daily goal. Keep hydrating!";
pub const DEFAULT_PARTNER_MESSAGE: &str = "My love, you still have {volume}ml of water you need to drink. Please complete it while knowing that I love you.";

/// Settings injected into the engine. Replaced wholesale through
/// [`HydrationEngine::update_config`](crate::engine::HydrationEngine::update_config).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Daily intake goal in milliliters
    pub daily_goal_ml: u32,

    /// Hour of the fixed end-of-day progress check
    pub checkpoint_hour: u32,

    /// Checkpoint body. `{volume}` is replaced with the milliliters still missing.
    pub default_message: String,

    pub partner: PartnerConfig,

    /// Only learn from the last N days of events. `None` learns from everything.
    pub learning_window_days: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            daily_goal_ml: DEFAULT_DAILY_GOAL_ML,
            checkpoint_hour: DEFAULT_CHECKPOINT_HOUR,
            default_message: DEFAULT_MESSAGE.into(),
            partner: PartnerConfig::default(),
            learning_window_days: None,
        }
    }
}

/// Cosmetic partner metadata. Nothing is ever sent to the partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartnerConfig {
    pub connected: bool,
    pub name: String,
    pub message: String,
}

impl Default for PartnerConfig {
    fn default() -> Self {
        Self {
            connected: false,
            name: String::new(),
            message: DEFAULT_PARTNER_MESSAGE.into(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.daily_goal_ml == 0 {
            return Err(EngineError::InvalidGoal);
        }
        if self.checkpoint_hour > 23 {
            return Err(EngineError::InvalidCheckpointHour(self.checkpoint_hour));
        }
        Ok(())
    }

    /// The template rendered into the checkpoint reminder body.
    pub fn checkpoint_template(&self) -> &str {
        if self.partner.connected {
            &self.partner.message
        } else {
            &self.default_message
        }
    }
}

pub fn parse_config(raw: &str) -> Result<EngineConfig, ConfigError> {
    Ok(toml::from_str(raw)?)
}

/// Loads the TOML config at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    if !path.exists() {
        debug!(?path, "No config file, using defaults");
        return Ok(EngineConfig::default());
    }

    let raw = std::fs::read_to_string(path)?;
    let config = parse_config(&raw)?;

    if let Err(e) = config.validate() {
        warn!("Ignoring invalid config at {path:?}: {e}");
        return Ok(EngineConfig::default());
    }

    Ok(config)
}
