//! Configuration system for the oxidized-ctr emulator

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub system: SystemConfig,
    pub paths: PathConfig,
    pub debug: DebugConfig,
}

/// Emulated console settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Console region, used for applet title resolution
    pub region: Region,
    /// Emulate a New 3DS instead of an Old 3DS
    pub is_new_3ds: bool,
}

/// Console region
///
/// The discriminants match the region values stored in the console's
/// configuration savegame.
#[repr(u32)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum Region {
    Japan = 0,
    #[default]
    UnitedStates = 1,
    Europe = 2,
    Australia = 3,
    China = 4,
    Korea = 5,
    Taiwan = 6,
}

impl Region {
    pub const COUNT: usize = 7;

    /// Index into per-region lookup tables
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub nand: PathBuf,
    pub sdmc: PathBuf,
}

/// Debug settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub log_level: LogLevel,
    pub log_to_file: bool,
    pub log_path: PathBuf,
}

/// Logging level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            region: Region::default(),
            is_new_3ds: false,
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("oxidized-ctr");

        Self {
            nand: base.join("nand"),
            sdmc: base.join("sdmc"),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_to_file: false,
            log_path: PathBuf::from("octr.log"),
        }
    }
}

impl Config {
    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::config_path();

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("oxidized-ctr")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.system.region, Region::UnitedStates);
        assert!(!config.system.is_new_3ds);
    }

    #[test]
    fn test_region_index() {
        assert_eq!(Region::Japan.index(), 0);
        assert_eq!(Region::Taiwan.index(), 6);
        assert!(Region::Taiwan.index() < Region::COUNT);
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.system.region = Region::Korea;
        config.system.is_new_3ds = true;

        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.system.region, Region::Korea);
        assert!(parsed.system.is_new_3ds);
    }
}
