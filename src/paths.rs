use std::{path::PathBuf, sync::LazyLock};

use directories::ProjectDirs;

use crate::errors::StorageError;

static PROJECT_DIR: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("fyi", "angelo", "hydrate-reminder"));

fn project_dir() -> Result<&'static ProjectDirs, StorageError> {
    PROJECT_DIR.as_ref().ok_or(StorageError::NoDataDir)
}

pub fn data_dir() -> Result<PathBuf, StorageError> {
    Ok(project_dir()?.data_dir().to_path_buf())
}

pub fn config_file_path() -> Result<PathBuf, StorageError> {
    Ok(project_dir()?.config_dir().join("config.toml"))
}

/// Where the settings document lives
pub fn settings_path() -> Result<PathBuf, StorageError> {
    Ok(data_dir()?.join("settings.json"))
}

pub fn log_dir() -> Result<PathBuf, StorageError> {
    Ok(data_dir()?.join("logs"))
}
