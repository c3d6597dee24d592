//! Engine configuration and loader.
//!
//! Configuration lives in a small TOML file. The one option authors normally touch is the
//! event tag: when set, only events whose note contains it get their extra conditions
//! checked.
//!
//! ```toml
//! event_tag = "<Extra Page>"
//! plugin_name = "GGZironExtraPageConditions"
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Default identifier written by the host as the first plugin command parameter.
/// The host writes the plugin's file name there.
pub const DEFAULT_PLUGIN_NAME: &str = "GGZironExtraPageConditions";

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Substring an event note must contain for extra conditions to apply.
    /// Compared trimmed and case-insensitively; empty applies to every event.
    pub event_tag: String,
    /// Plugin identifier that marks this system's commands.
    pub plugin_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            event_tag: String::new(),
            plugin_name: DEFAULT_PLUGIN_NAME.to_string(),
        }
    }
}

impl Config {
    /// Configuration with the given event tag and the default plugin name.
    pub fn with_event_tag(tag: impl Into<String>) -> Self {
        Self {
            event_tag: tag.into(),
            ..Self::default()
        }
    }

    /// The event tag as it is matched: trimmed and lower-cased.
    pub fn normalized_tag(&self) -> String {
        self.event_tag.trim().to_lowercase()
    }
}

/// Load configuration from a TOML file, falling back to defaults on any error.
///
/// # Logging
/// - `info!` on successful load
/// - `warn!` if the file cannot be read or parsed
pub fn load_config(toml_path: &Path) -> Config {
    match try_load_config(toml_path) {
        Ok(config) => {
            info!(
                "configuration loaded from '{}' (event tag: {:?})",
                toml_path.display(),
                config.event_tag
            );
            config
        },
        Err(e) => {
            warn!(
                "Could not load configuration from '{}': {e:#}. Using defaults.",
                toml_path.display()
            );
            Config::default()
        },
    }
}

fn try_load_config(toml_path: &Path) -> Result<Config> {
    let text = fs::read_to_string(toml_path)
        .with_context(|| format!("reading configuration from '{}'", toml_path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing configuration from '{}'", toml_path.display()))
}
