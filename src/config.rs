//! Capture configuration.
//!
//! All options are start-time constants: a config value is built once (in
//! code or from a YAML file), validated, and passed into the capture
//! workers. Nothing here is runtime-reconfigurable.
//!
//! ```yaml
//! baud_rate: 2000000
//! ports:
//!   - port: COM3
//!     module_name: module_1
//! flags:
//!   acc: true
//!   sts: true
//! output_root: output
//! flush_writes: false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{CaptureError, Result, SampleFlags};

fn default_baud_rate() -> u32 {
    2_000_000
}

fn default_output_root() -> PathBuf {
    PathBuf::from("output")
}

/// One serial channel to capture from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    /// Serial port identifier (`COM3`, `/dev/ttyUSB0`, ...).
    pub port: String,
    /// Module name used for the session directory prefix.
    pub module_name: String,
}

/// Start-time configuration for a capture run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Baud rate shared by all configured ports.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Serial channels; one worker is spawned per entry.
    pub ports: Vec<PortConfig>,
    /// Which optional sample blocks the firmware streams.
    #[serde(default)]
    pub flags: SampleFlags,
    /// Directory under which session directories are created.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    /// Flush ordinal files after every frame append.
    #[serde(default)]
    pub flush_writes: bool,
}

impl CaptureConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| CaptureError::config_error(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| CaptureError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml(&yaml)
    }

    fn validate(&self) -> Result<()> {
        if self.ports.is_empty() {
            return Err(CaptureError::config_error("at least one port must be configured"));
        }
        if self.baud_rate == 0 {
            return Err(CaptureError::config_error("baud_rate must be non-zero"));
        }
        for port in &self.ports {
            if port.port.is_empty() || port.module_name.is_empty() {
                return Err(CaptureError::config_error(
                    "port and module_name must be non-empty",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_yaml() {
        let yaml = r#"
baud_rate: 500000
ports:
  - port: COM3
    module_name: module_1
  - port: COM4
    module_name: module_2
flags:
  acc: true
  sts: true
output_root: /tmp/uwb
flush_writes: true
"#;
        let config = CaptureConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.baud_rate, 500_000);
        assert_eq!(config.ports.len(), 2);
        assert_eq!(config.ports[1].module_name, "module_2");
        assert!(config.flags.acc);
        assert!(config.flags.sts);
        assert_eq!(config.output_root, PathBuf::from("/tmp/uwb"));
        assert!(config.flush_writes);
    }

    #[test]
    fn defaults_apply() {
        let yaml = r#"
ports:
  - port: /dev/ttyUSB0
    module_name: module_1
"#;
        let config = CaptureConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.baud_rate, 2_000_000);
        assert_eq!(config.flags, SampleFlags::default());
        assert_eq!(config.output_root, PathBuf::from("output"));
        assert!(!config.flush_writes);
    }

    #[test]
    fn rejects_empty_port_list() {
        let result = CaptureConfig::from_yaml("ports: []");
        assert!(matches!(result, Err(CaptureError::Config { .. })));
    }

    #[test]
    fn rejects_malformed_yaml() {
        let result = CaptureConfig::from_yaml(": not yaml");
        assert!(matches!(result, Err(CaptureError::Config { .. })));
    }
}
