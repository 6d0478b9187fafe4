use crate::cli::Cli;
use airsensor_types::{DeviceSelector, SelectionPolicy, SensorConfig};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DEBUG: u8 = 3;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device: Option<DeviceSelector>,
    pub config: Option<u8>,
    pub interface: Option<u8>,
    pub setup: Option<u8>,
    pub endpoint: Option<u8>,
    pub write_endpoint: Option<u8>,
    pub selection: Option<SelectionPolicy>,
    pub debug: Option<u8>,
    pub timeout_ms: Option<u64>,
}

impl Settings {
    pub fn read(path: &Path) -> Result<Settings> {
        match File::open(path) {
            Ok(reader) => serde_json::from_reader(reader).context(format!(
                "Could not parse settings file at {}",
                path.to_string_lossy()
            )),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(Settings::default()),
            Err(error) => Err(error).context(format!(
                "Could not open settings file for reading at {}",
                path.to_string_lossy()
            )),
        }
    }
}

pub fn default_settings_location() -> Option<PathBuf> {
    ProjectDirs::from("org", "airsensor", "airsensor")
        .map(|dirs| dirs.config_dir().join("settings.json"))
}

/// Everything a single run needs, after flags, settings file and defaults have been layered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub sensor: SensorConfig,
    pub debug: u8,
    pub timeout: Duration,
}

impl RunSettings {
    pub fn resolve(args: &Cli, settings: Settings) -> Self {
        let defaults = SensorConfig::default();

        let sensor = SensorConfig {
            selector: args.device.or(settings.device).unwrap_or(defaults.selector),
            configuration: args
                .config
                .or(settings.config)
                .unwrap_or(defaults.configuration),
            interface: args
                .interface
                .or(settings.interface)
                .unwrap_or(defaults.interface),
            alt_setting: args.setup.or(settings.setup).unwrap_or(defaults.alt_setting),
            read_endpoint: args
                .endpoint
                .or(settings.endpoint)
                .unwrap_or(defaults.read_endpoint),
            write_endpoint: args
                .write_endpoint
                .or(settings.write_endpoint)
                .unwrap_or(defaults.write_endpoint),
            selection: args
                .selection
                .or(settings.selection)
                .unwrap_or(defaults.selection),
        };

        Self {
            sensor,
            debug: args.debug.or(settings.debug).unwrap_or(DEFAULT_DEBUG),
            timeout: Duration::from_millis(args.timeout_ms.or(settings.timeout_ms).unwrap_or(0)),
        }
    }
}
