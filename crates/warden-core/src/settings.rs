//! Persisted user setup, stored as TOML by named slot
//!
//! This is the on-device persistence collaborator: the control plane never
//! reads storage itself, it only consumes the hydrated [`ServerConfig`] /
//! [`RoutingConfig`] structures produced here. List-shaped fields (DNS
//! servers, routing rules) are kept as free text the way the setup surface
//! edits them, and split on hydration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{split_list, RoutingConfig, RoutingMode, ServerConfig};

const SETTINGS_DIR: &str = "tunnel-warden";
const SLOT_EXTENSION: &str = "toml";

/// Persisted user setup for one named slot.
///
/// Defaults are all empty; persistence is the sole source of truth after
/// first hydration. A hard-coded credential default is a bug.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub routing_mode: RoutingMode,
    pub dns_servers_text: String,
    pub local_rules_text: String,
    pub remote_rules_url: String,
    pub rules_text: String,
    // Last so the TOML table serializes after the scalar keys
    pub server: ServerConfig,
}

impl Settings {
    /// Load a named slot from the default settings directory.
    pub fn load_slot(name: &str) -> Result<Self> {
        Self::load_from(&slot_path(&default_settings_dir(), name))
    }

    /// Save this setup into a named slot in the default settings directory.
    pub fn save_slot(&self, name: &str) -> Result<()> {
        let dir = default_settings_dir();
        std::fs::create_dir_all(&dir)?;
        self.save_to(&slot_path(&dir, name))
    }

    /// Load settings from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::settings_not_found(path));
        }
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::config(format!("invalid settings file: {e}")))
    }

    /// Save settings to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("failed to serialize settings: {e}")))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Remove a named slot. Missing slots are not an error.
    pub fn clear_slot(name: &str) -> Result<()> {
        let path = slot_path(&default_settings_dir(), name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Hydrate the in-memory server config, with DNS text split into a list.
    pub fn server_config(&self) -> ServerConfig {
        let mut server = self.server.clone();
        server.dns_servers = split_list(&self.dns_servers_text);
        server
    }

    /// Hydrate the in-memory routing config from the merged rules text.
    pub fn routing_config(&self) -> RoutingConfig {
        RoutingConfig {
            mode: self.routing_mode,
            rules: split_list(&self.rules_text),
        }
    }
}

fn default_settings_dir() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join(SETTINGS_DIR)
}

fn slot_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{SLOT_EXTENSION}"))
}
