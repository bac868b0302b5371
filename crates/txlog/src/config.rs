//! Configuration file support.
//!
//! A configuration file is a flat JSON object of string values:
//!
//! ```json
//! {
//!   "loggerName": "checkout",
//!   "serviceName": "shop-api",
//!   "level": "WARNING",
//!   "filepath": "./logs",
//!   "filename": "checkout"
//! }
//! ```
//!
//! `loggerName`, `serviceName` and `level` configure the registry. The whole
//! map, including those keys, is handed to the exporter on every flush.

use std::path::Path;

use crate::error::ConfigError;
use crate::exporter::{ConfigMap, FILENAME_KEY, FILEPATH_KEY};
use crate::registry::{DEFAULT_LOGGER_NAME, DEFAULT_SERVICE_NAME};
use crate::types::Level;

pub const LOGGER_NAME_KEY: &str = "loggerName";
pub const SERVICE_NAME_KEY: &str = "serviceName";
pub const LEVEL_KEY: &str = "level";

/// Registry settings found in a configuration map.
///
/// Absent keys leave the corresponding setting untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggerConfig {
    pub logger_name: Option<String>,
    pub service_name: Option<String>,
    /// Unrecognized values have already been mapped to `INFO`.
    pub level: Option<Level>,
}

impl LoggerConfig {
    /// Extract registry settings from a configuration map.
    pub fn from_map(map: &ConfigMap) -> Self {
        Self {
            logger_name: map.get(LOGGER_NAME_KEY).cloned(),
            service_name: map.get(SERVICE_NAME_KEY).cloned(),
            level: map.get(LEVEL_KEY).map(|v| Level::from_config_value(v)),
        }
    }
}

/// Read a configuration file.
pub fn load(path: &Path) -> Result<ConfigMap, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// A starter configuration with every recognized key filled in.
pub fn starter() -> ConfigMap {
    ConfigMap::from([
        (LOGGER_NAME_KEY.to_string(), DEFAULT_LOGGER_NAME.to_string()),
        (SERVICE_NAME_KEY.to_string(), DEFAULT_SERVICE_NAME.to_string()),
        (LEVEL_KEY.to_string(), Level::Info.to_string()),
        (FILEPATH_KEY.to_string(), "./logs".to_string()),
        (FILENAME_KEY.to_string(), "txlog".to_string()),
    ])
}
