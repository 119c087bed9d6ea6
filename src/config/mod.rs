//! Configuration for the widget kit
//!
//! Settings come from, in increasing priority: built-in defaults, a TOML file
//! (explicit path or `uikit.toml` in the platform config directory) and
//! `UIKIT_*` environment variables, with `.env` files honoured.

pub mod env;
pub mod keys;
pub mod validation;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::theme::ThemeVariant;
use crate::widgets::log_viewer::DEFAULT_CAPACITY;
use crate::widgets::progress::DEFAULT_TEMPLATE;
use env::{EnvParser, EnvVars};
use keys::KeyConfig;
use validation::ConfigValidator;

type ConfigResult<T> = std::result::Result<T, ConfigError>;

const CONFIG_FILE: &str = "uikit.toml";
const MAX_VIEWER_CAPACITY: usize = 1_000_000;

fn default_true() -> bool {
    true
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

fn default_level() -> String {
    "info".to_string()
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// `[focus]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusConfig {
    /// Traversal wraps around at the ends of the active scope
    #[serde(default = "default_true")]
    pub wrap: bool,

    /// A mouse click focuses the nearest focusable widget under the pointer
    #[serde(default = "default_true")]
    pub click_to_focus: bool,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            wrap: true,
            click_to_focus: true,
        }
    }
}

/// `[progress]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Label template; `{}` is replaced by the percentage
    #[serde(default = "default_template")]
    pub template: String,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
        }
    }
}

/// `[theme]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(default)]
    pub variant: ThemeVariant,
}

/// `[log]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,

    /// Lines kept by the log viewer
    #[serde(default = "default_capacity")]
    pub viewer_capacity: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            viewer_capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitConfig {
    #[serde(default)]
    pub keys: KeyConfig,

    #[serde(default)]
    pub focus: FocusConfig,

    #[serde(default)]
    pub progress: ProgressConfig,

    #[serde(default)]
    pub theme: ThemeConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl KitConfig {
    /// Load configuration from `config_path`, `UIKIT_CONFIG` or the default
    /// location, then apply environment overrides.
    ///
    /// A missing file at the default location is not an error; a missing
    /// explicit file is.
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        // Try to load .env file if it exists
        dotenvy::dotenv().ok();

        let explicit = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => EnvParser::parse_string(EnvVars::CONFIG_PATH)?.map(PathBuf::from),
        };

        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound { path });
                }
                Self::from_file(&path)?
            }
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(path = %path.display(), "no config file, using defaults");
                    Self::default()
                }
                None => {
                    warn!("ProjectDirs unavailable; using default configuration");
                    Self::default()
                }
            },
        };

        config.load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from environment variables
    fn load_from_env(&mut self) -> ConfigResult<()> {
        if let Some(variant) = EnvParser::parse_string(EnvVars::THEME)? {
            self.theme.variant = match variant.to_lowercase().as_str() {
                "dark" => ThemeVariant::Dark,
                "light" => ThemeVariant::Light,
                "high_contrast" | "high-contrast" => ThemeVariant::HighContrast,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: EnvVars::THEME.to_string(),
                        value: variant,
                    })
                }
            };
        }

        if let Some(wrap) = EnvParser::parse_bool(EnvVars::FOCUS_WRAP)? {
            self.focus.wrap = wrap;
        }

        if let Some(click) = EnvParser::parse_bool(EnvVars::CLICK_TO_FOCUS)? {
            self.focus.click_to_focus = click;
        }

        if let Some(template) = EnvParser::parse_string(EnvVars::PROGRESS_TEMPLATE)? {
            self.progress.template = template;
        }

        if let Some(level) = EnvParser::parse_string(EnvVars::LOG_LEVEL)? {
            self.log.level = level;
        }

        if let Some(capacity) =
            EnvParser::parse_usize(EnvVars::LOG_VIEWER_CAPACITY, 1, MAX_VIEWER_CAPACITY)?
        {
            self.log.viewer_capacity = capacity;
        }

        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        ConfigValidator::validate_keys(&self.keys)?;
        ConfigValidator::validate_template(&self.progress.template, "progress.template")?;
        ConfigValidator::validate_log_level(&self.log.level, "log.level")?;
        ConfigValidator::validate_range(
            self.log.viewer_capacity,
            1,
            MAX_VIEWER_CAPACITY,
            "log.viewer_capacity",
        )?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "uikit", "tui-uikit")
            .map(|project_dirs| project_dirs.config_dir().join(CONFIG_FILE))
    }
}
