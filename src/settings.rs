use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pdf::{DEFAULT_SCALE, DEFAULT_USER_AGENT};
use crate::renderer::DEFAULT_WORKER_NAME;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pdfcanvas";

/// What to do when the viewer element is not on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingElementPolicy {
    /// Do nothing, as if the page had no viewer
    #[default]
    Ignore,
    /// Report a `MissingElement` error
    Error,
}

/// What the lifecycle trigger does with a failed render chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log a warning and leave the canvas as it was
    #[default]
    Log,
    /// Return the error to the caller
    Propagate,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("reading {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("writing {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serializing settings: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("scale must be a positive finite number, got {0}")]
    InvalidScale(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Id of the canvas element that hosts the viewer
    #[serde(default = "default_element_id")]
    pub element_id: String,

    /// Dataset key holding the document URL (`url` reads `data-url`)
    #[serde(default = "default_data_attribute")]
    pub data_attribute: String,

    #[serde(default = "default_scale")]
    pub scale: f32,

    #[serde(default)]
    pub on_missing_element: MissingElementPolicy,

    #[serde(default)]
    pub on_failure: FailurePolicy,

    #[serde(default = "default_worker_thread_name")]
    pub worker_thread_name: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_element_id() -> String {
    "pdf-viewer".to_string()
}

fn default_data_attribute() -> String {
    "url".to_string()
}

fn default_scale() -> f32 {
    DEFAULT_SCALE
}

fn default_worker_thread_name() -> String {
    DEFAULT_WORKER_NAME.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            element_id: default_element_id(),
            data_attribute: default_data_attribute(),
            scale: default_scale(),
            on_missing_element: MissingElementPolicy::default(),
            on_failure: FailurePolicy::default(),
            worker_thread_name: default_worker_thread_name(),
            user_agent: default_user_agent(),
        }
    }
}

impl Settings {
    /// Per-user config location, `<config dir>/pdfcanvas/config.yaml`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
    }

    /// Read settings from `path`, migrating older versions in memory
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: Settings =
            serde_yaml::from_str(&content).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Loaded settings from {path:?}");

        if settings.version < CURRENT_VERSION {
            migrate_settings(&mut settings);
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Settings from an explicit file, else the per-user file, else defaults.
    ///
    /// An explicit file must load; problems with the per-user file are logged
    /// and fall back to defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let Some(path) = Self::default_path() else {
            warn!("Could not determine config directory, using default settings");
            return Ok(Self::default());
        };
        if !path.exists() {
            info!("Settings file not found at {path:?}, using defaults");
            return Ok(Self::default());
        }
        match Self::load(&path) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!("Ignoring settings file: {e}");
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Saved settings to {path:?}");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(SettingsError::InvalidScale(self.scale));
        }
        Ok(())
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    // Future migrations go here:
    // if settings.version < 2 {
    //     migrate_v1_to_v2(settings);
    // }

    settings.version = CURRENT_VERSION;
}
