//! Configuration file
//!
//! Loaded from `<config dir>/dualshock/config.toml`. Every section and field is
//! optional; anything missing falls back to its default, and a missing file
//! yields the full default configuration.
//!
//! ```toml
//! [controller]
//! classification_reads = 100
//! stick_smoothing = 4
//! read_timeout_ms = 100
//!
//! [device]
//! vendor_id = 1356
//! product_ids = [2508, 1476]
//!
//! [demo]
//! led = "blue"
//! flash_on = 0
//! flash_off = 0
//! rumble = "off"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::controller::ControllerSettings;
use crate::hid::{DUALSHOCK4_PRODUCT_IDS, SONY_VENDOR_ID};
use crate::led::Led;
use crate::rumble::Rumble;

const CONFIG_DIR: &str = "dualshock";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown {kind} preset: {name}")]
    UnknownPreset { kind: &'static str, name: String },
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub controller: ControllerSettings,
    pub device: DeviceFilter,
    pub demo: DemoConfig,
}

/// Which HID devices count as controllers
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DeviceFilter {
    pub vendor_id: u16,
    pub product_ids: Vec<u16>,
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self {
            vendor_id: SONY_VENDOR_ID,
            product_ids: DUALSHOCK4_PRODUCT_IDS.to_vec(),
        }
    }
}

impl DeviceFilter {
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        vendor_id == self.vendor_id && self.product_ids.contains(&product_id)
    }
}

/// Actuator settings applied by the demo after connecting
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    pub led: String,
    pub flash_on: u8,
    pub flash_off: u8,
    pub rumble: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            led: "blue".to_string(),
            flash_on: 0,
            flash_off: 0,
            rumble: "off".to_string(),
        }
    }
}

impl DemoConfig {
    pub fn led(&self) -> Result<Led, ConfigError> {
        Led::preset(&self.led)
            .map(|led| led.with_flash(self.flash_on, self.flash_off))
            .ok_or_else(|| ConfigError::UnknownPreset {
                kind: "LED",
                name: self.led.clone(),
            })
    }

    pub fn rumble(&self) -> Result<Rumble, ConfigError> {
        Rumble::preset(&self.rumble).ok_or_else(|| ConfigError::UnknownPreset {
            kind: "rumble",
            name: self.rumble.clone(),
        })
    }
}

impl Config {
    /// `<config dir>/dualshock/config.toml`, or `./dualshock/config.toml`
    /// when the platform has no config directory
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        });
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    pub async fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path()).await
    }

    pub async fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        if !exists {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Loaded config file {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
