use config::{self, File};
use log::{debug, error};
use serde::Deserialize;
use std::path::Path;

use crate::error::{ExporterError, Result};

/// A monitored array's management endpoint
#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    /// Management address (hostname or IP)
    pub address: String,
    /// Management port
    #[serde(default = "default_target_port")]
    pub port: u16,
    /// API username
    pub username: String,
    /// API password
    pub password: String,
    /// Display name override; resolved from the array when unset
    #[serde(default)]
    pub name: Option<String>,
    /// Accept self-signed management certificates
    #[serde(default)]
    pub insecure: bool,
}

/// Default management port
fn default_target_port() -> u16 {
    443
}

/// Exporter configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ExporterConfig {
    /// Listen port for the exposition endpoint
    #[serde(default = "default_listen_port")]
    pub port: u16,
    /// Collection interval in seconds, shared by all targets
    #[serde(default = "default_collection_interval")]
    pub interval: u64,
    /// Names of catalog metrics to collect
    #[serde(default)]
    pub metrics: Vec<String>,
    /// Collect pool capacity summaries
    #[serde(default)]
    pub pools: bool,
    /// Collect storage-resource capacity summaries
    #[serde(default)]
    pub storage_resources: bool,
    /// Logging level
    #[serde(default)]
    pub log_level: LogLevel,
    /// Monitored arrays
    pub targets: Vec<TargetConfig>,
}

/// Default exposition listen port
fn default_listen_port() -> u16 {
    9459
}

/// Default collection interval
fn default_collection_interval() -> u64 {
    60
}

/// Logging level
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level
    Info,
    /// Debug level
    Debug,
    /// Trace level
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl ExporterConfig {
    /// Reject configurations that cannot run
    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            return Err(ExporterError::Config(
                "collection interval must be at least 1 second".to_string(),
            ));
        }
        if self.targets.is_empty() {
            return Err(ExporterError::Config("no targets configured".to_string()));
        }
        for target in &self.targets {
            if target.address.is_empty() {
                return Err(ExporterError::Config(
                    "target with empty address".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Load exporter configuration from a file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ExporterConfig> {
    let path = path.as_ref();
    debug!("Loading configuration from {}", path.display());

    // Check if the file exists
    if !path.exists() {
        error!("Configuration file {} does not exist", path.display());
        return Err(ExporterError::Config(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    // Get the file extension
    let extension = match path.extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => {
            error!("Configuration file has no extension");
            return Err(ExporterError::Config(format!(
                "Configuration file has no extension: {}",
                path.display()
            )));
        }
    };

    // Check if the extension is supported and create the appropriate FileFormat
    let format = match extension.as_str() {
        "toml" => config::FileFormat::Toml,
        "json" => config::FileFormat::Json,
        "yaml" | "yml" => config::FileFormat::Yaml,
        format => {
            error!("Unsupported configuration format: {}", format);
            return Err(ExporterError::Config(format!(
                "Unsupported config format: {format}"
            )));
        }
    };

    // Build configuration
    let config = config::Config::builder()
        .add_source(File::with_name(&path.to_string_lossy()).format(format))
        .build()
        .map_err(|e| ExporterError::Config(e.to_string()))?;

    // Deserialize and validate
    let config: ExporterConfig = config
        .try_deserialize()
        .map_err(|e| ExporterError::Config(e.to_string()))?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_TOML: &str = r#"
        port = 9459
        interval = 30
        metrics = ["sp_cpu_utilization"]
        pools = true
        log_level = "debug"

        [[targets]]
        address = "unity01.example.net"
        username = "monitor"
        password = "secret"
        insecure = true

        [[targets]]
        address = "192.0.2.17"
        port = 8443
        username = "monitor"
        password = "secret"
        name = "lab-array"
    "#;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_toml_config() {
        let file = write_config(".toml", SAMPLE_TOML);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.port, 9459);
        assert_eq!(config.interval, 30);
        assert_eq!(config.metrics, vec!["sp_cpu_utilization".to_string()]);
        assert!(config.pools);
        assert!(!config.storage_resources);
        assert_eq!(config.log_level, LogLevel::Debug);

        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].port, 443);
        assert!(config.targets[0].insecure);
        assert_eq!(config.targets[0].name, None);
        assert_eq!(config.targets[1].port, 8443);
        assert_eq!(config.targets[1].name, Some("lab-array".to_string()));
    }

    #[test]
    fn test_defaults_applied() {
        let minimal = r#"
            [[targets]]
            address = "unity01"
            username = "monitor"
            password = "secret"
        "#;
        let file = write_config(".toml", minimal);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.port, 9459);
        assert_eq!(config.interval, 60);
        assert!(config.metrics.is_empty());
        assert!(!config.pools);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(load_config("/nonexistent/spindle.toml").is_err());
    }

    #[test]
    fn test_unsupported_extension_fails() {
        let file = write_config(".ini", "port = 1");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let broken = r#"
            interval = 0

            [[targets]]
            address = "unity01"
            username = "monitor"
            password = "secret"
        "#;
        let file = write_config(".toml", broken);
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_no_targets_rejected() {
        let broken = r#"
            interval = 60
            targets = []
        "#;
        let file = write_config(".toml", broken);
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_yaml_config_supported() {
        let yaml = r#"
interval: 45
targets:
  - address: unity01
    username: monitor
    password: secret
"#;
        let file = write_config(".yaml", yaml);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.interval, 45);
        assert_eq!(config.targets.len(), 1);
    }
}
