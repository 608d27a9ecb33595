use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::theme::{Background, PaletteId};
use crate::transcribe::{DEFAULT_ENDPOINT, DEFAULT_MODEL};

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "lrc-player", "lrc-player")
}

pub fn default_cache_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.cache_dir().join("lyrics"))
        .unwrap_or_else(|| PathBuf::from(".lrc-cache"))
}

pub fn default_log_file() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_local_dir().join("lrc-player.log"))
        .unwrap_or_else(|| PathBuf::from("lrc-player.log"))
}

/// Persisted user settings. Missing fields fall back to defaults so older
/// files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub palette: PaletteId,
    pub background: Background,
    pub volume: f32,
    pub model: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub cache_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            palette: PaletteId::default(),
            background: Background::default(),
            volume: 1.0,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            timeout_secs: 120,
            cache_dir: None,
        }
    }
}

impl Settings {
    pub fn file_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from the default file, or defaults if there is none.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::file_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut settings: Settings = serde_json::from_str(&content)?;
        settings.volume = settings.volume.clamp(0.0, 2.0);
        Ok(settings)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::file_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to_file(&path)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }

    /// First non-blank key from the command line, `API_KEY`, then the file.
    pub fn api_key(&self, cli: Option<&str>, env_fallback: Option<&str>) -> Option<String> {
        [cli, env_fallback, self.api_key.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|k| !k.is_empty())
            .map(str::to_string)
    }
}
