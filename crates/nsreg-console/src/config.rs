//! Console configuration and instance persistence.
//!
//! ```toml
//! tick_ms = 100
//! persist_instances = true
//!
//! [[instances]]
//! name = "local"
//! url = "http://localhost:19950"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nsreg_explorer::InstanceStore;
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "nsreg";
const CONFIG_FILE: &str = "config.toml";
const INSTANCES_FILE: &str = "instances.toml";
const LOG_FILE: &str = "console.log";

/// An instance declared in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSeed {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Render and input poll interval in milliseconds.
    pub tick_ms: u64,
    pub log_file: Option<PathBuf>,
    /// Keep the instance list across runs.
    pub persist_instances: bool,
    pub instances_file: Option<PathBuf>,
    pub instances: Vec<InstanceSeed>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            log_file: None,
            persist_instances: false,
            instances_file: None,
            instances: Vec::new(),
        }
    }
}

impl ConsoleConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from `explicit`, or from the default location if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join(LOG_FILE)
        })
    }

    /// Where the instance list is persisted, if persistence is on.
    pub fn instances_file(&self) -> Option<PathBuf> {
        if !self.persist_instances {
            return None;
        }
        self.instances_file
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join(APP_DIR).join(INSTANCES_FILE)))
    }

    /// Build the starting instance list.
    ///
    /// A persisted list wins over the config seeds; `extra` entries are
    /// appended unless an identical name/url pair is already present.
    pub fn initial_store(&self, extra: &[(String, String)]) -> Result<InstanceStore> {
        let persisted = match self.instances_file() {
            Some(path) if path.exists() => Some(load_instances(&path)?),
            _ => None,
        };
        let mut store = match persisted {
            Some(store) => store,
            None => {
                let mut store = InstanceStore::new();
                for seed in &self.instances {
                    store.add(seed.name.clone(), seed.url.clone());
                }
                store
            }
        };

        for (name, url) in extra {
            if !store.iter().any(|i| &i.name == name && &i.url == url) {
                store.add(name.clone(), url.clone());
            }
        }
        Ok(store)
    }
}

pub fn load_instances(path: &Path) -> Result<InstanceStore> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read instances {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid instances file {}", path.display()))
}

pub fn save_instances(path: &Path, store: &InstanceStore) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let text = toml::to_string_pretty(store).context("failed to encode instances")?;
    fs::write(path, text).with_context(|| format!("failed to write instances {}", path.display()))
}
