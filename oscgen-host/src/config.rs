//! Host configuration
//!
//! Loaded from a TOML file; every field has a default so an empty file (or
//! no file) gives a working setup.
//!
//! ```toml
//! [scope]
//! path = "/dev/ttyACM0"
//!
//! [generator]
//! path = "/dev/ttyACM1"
//! baud_rate = 115200
//!
//! [waveform]
//! shape = "square"
//! frequency_hz = 440.0
//! duty_per_mille = 250
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::generator::GeneratorSettings;

/// One serial endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfig {
    pub path: String,
    pub baud_rate: u32,
    /// Read timeout; bounds how long a stop request can take to be noticed
    pub timeout_ms: u64,
}

impl PortConfig {
    fn with_path(path: &str) -> Self {
        Self {
            path: path.to_string(),
            baud_rate: 115_200,
            timeout_ms: 100,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Port table as written in the file; missing keys fall back per port
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PortSection {
    path: Option<String>,
    baud_rate: Option<u32>,
    timeout_ms: Option<u64>,
}

impl PortSection {
    fn resolve(self, defaults: PortConfig) -> PortConfig {
        PortConfig {
            path: self.path.unwrap_or(defaults.path),
            baud_rate: self.baud_rate.unwrap_or(defaults.baud_rate),
            timeout_ms: self.timeout_ms.unwrap_or(defaults.timeout_ms),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    scope: PortSection,
    generator: PortSection,
    waveform: GeneratorSettings,
}

/// Everything the CLI needs to reach both boards
#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub scope: PortConfig,
    pub generator: PortConfig,
    /// Settings sent by `gen apply`
    pub waveform: GeneratorSettings,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            scope: PortConfig::with_path("/dev/ttyACM0"),
            generator: PortConfig::with_path("/dev/ttyACM1"),
            waveform: GeneratorSettings::default(),
        }
    }
}

impl HostConfig {
    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)?;
        let defaults = Self::default();
        Ok(Self {
            scope: file.scope.resolve(defaults.scope),
            generator: file.generator.resolve(defaults.generator),
            waveform: file.waveform,
        })
    }

    /// Load from a file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load from a file if it exists, otherwise use the defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Shape;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = HostConfig::from_toml_str("").unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.scope.path, "/dev/ttyACM0");
        assert_eq!(config.generator.path, "/dev/ttyACM1");
        assert_eq!(config.generator.baud_rate, 115_200);
    }

    #[test]
    fn test_partial_config() {
        let config = HostConfig::from_toml_str(
            r#"
            [generator]
            path = "COM4"

            [waveform]
            shape = "full-rectified"
            amplitude_mv_pp = 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.generator.path, "COM4");
        assert_eq!(config.generator.baud_rate, 115_200);
        assert_eq!(config.scope, HostConfig::default().scope);
        assert_eq!(config.waveform.shape, Shape::FullRectified);
        assert_eq!(config.waveform.amplitude_mv_pp, 1500);
        assert_eq!(config.waveform.duty_per_mille, 500);
    }

    #[test]
    fn test_port_keeps_its_own_default_path() {
        let config = HostConfig::from_toml_str("[generator]\nbaud_rate = 921600").unwrap();
        assert_eq!(config.generator.path, "/dev/ttyACM1");
        assert_eq!(config.generator.baud_rate, 921_600);
    }

    #[test]
    fn test_bad_config_rejected() {
        assert!(HostConfig::from_toml_str("[scope]\nbaud_rate = \"fast\"").is_err());
        assert!(HostConfig::from_toml_str("[scope]\nbaud = 9600").is_err());
    }
}
