use anyhow::{Context, Result};
use config::{Config, File};
use log::{debug, info, LevelFilter};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Address a freshly constructed extension points at until the user sets one.
pub const PLACEHOLDER_ADDRESS: &str = "192.168.x.x";

fn default_address() -> String {
    PLACEHOLDER_ADDRESS.to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_long_timeout_ms() -> u64 {
    18000
}

fn default_interval_secs() -> u64 {
    10
}

fn default_descriptor_file() -> String {
    "blocks.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_long_timeout_ms")]
    pub long_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            long_timeout_ms: default_long_timeout_ms(),
        }
    }
}

impl HttpConfig {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            short: Duration::from_millis(self.timeout_ms),
            long: Duration::from_millis(self.long_timeout_ms),
        }
    }
}

/// Request timeouts handed to each device façade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub short: Duration,
    /// Used by commands that keep the device busy, such as IR capture.
    pub long: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        HttpConfig::default().timeouts()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DescriptorConfig {
    #[serde(default)]
    pub save_to_file: bool,
    #[serde(default = "default_descriptor_file")]
    pub file: String,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            save_to_file: false,
            file: default_descriptor_file(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(rename = "CAR", alias = "car", default)]
    pub car: DeviceConfig,
    #[serde(rename = "REMOCON", alias = "remocon", default)]
    pub remocon: DeviceConfig,
    #[serde(rename = "HTTP", alias = "http", default)]
    pub http: HttpConfig,
    #[serde(rename = "POLL", alias = "poll", default)]
    pub poll: PollConfig,
    #[serde(rename = "DESCRIPTOR", alias = "descriptor", default)]
    pub descriptor: DescriptorConfig,
    #[serde(rename = "LOGGING", alias = "logging", default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        Self::from_file("config.ini")
    }

    pub fn get_log_level(&self) -> LevelFilter {
        match self.logging.level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info, // Default to Info if invalid
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();
        debug!("Loading configuration from {}", config_path.display());

        let config = Config::builder()
            .add_source(File::from(config_path).format(config::FileFormat::Ini))
            .build()
            .context(format!("Failed to load config from {}", config_path.display()))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize config")?;

        Ok(app_config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_path = path.as_ref();

        let mut config_str = String::new();

        config_str.push_str(&format!("[CAR]\naddress = {}\n\n", self.car.address));
        config_str.push_str(&format!("[REMOCON]\naddress = {}\n\n", self.remocon.address));

        config_str.push_str(&format!(
            "[HTTP]\ntimeout_ms = {}\nlong_timeout_ms = {}\n\n",
            self.http.timeout_ms, self.http.long_timeout_ms
        ));

        config_str.push_str(&format!(
            "[POLL]\nenabled = {}\ninterval_secs = {}\n\n",
            self.poll.enabled, self.poll.interval_secs
        ));

        config_str.push_str(&format!(
            "[DESCRIPTOR]\nsave_to_file = {}\nfile = {}\n\n",
            self.descriptor.save_to_file, self.descriptor.file
        ));

        config_str.push_str(&format!("[LOGGING]\nlevel = {}\n", self.logging.level));

        fs::write(config_path, config_str)
            .context(format!("Failed to save config to {}", config_path.display()))?;

        info!("Configuration saved to {}", config_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_ini(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.car.address, "192.168.x.x");
        assert_eq!(config.remocon.address, "192.168.x.x");
        assert_eq!(config.http.timeout_ms, 5000);
        assert_eq!(config.http.long_timeout_ms, 18000);
        assert!(!config.poll.enabled);
        assert_eq!(config.poll.interval_secs, 10);
        assert!(!config.descriptor.save_to_file);
        assert_eq!(config.descriptor.file, "blocks.json");
        assert_eq!(config.get_log_level(), LevelFilter::Info);
    }

    #[test]
    fn test_from_file() {
        let temp_file = write_ini(
            "[CAR]\naddress = 10.0.0.7\n\n[REMOCON]\naddress = 10.0.0.8\n\n[HTTP]\ntimeout_ms = 1500\nlong_timeout_ms = 9000\n\n[POLL]\nenabled = true\ninterval_secs = 3\n\n[LOGGING]\nlevel = debug\n",
        );

        let config = AppConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config.car.address, "10.0.0.7");
        assert_eq!(config.remocon.address, "10.0.0.8");
        assert_eq!(config.http.timeout_ms, 1500);
        assert_eq!(config.http.long_timeout_ms, 9000);
        assert!(config.poll.enabled);
        assert_eq!(config.poll.interval_secs, 3);
        assert_eq!(config.get_log_level(), LevelFilter::Debug);
    }

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let temp_file = write_ini("[CAR]\naddress = 10.0.0.7\n");

        let config = AppConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config.car.address, "10.0.0.7");
        assert_eq!(config.remocon.address, PLACEHOLDER_ADDRESS);
        assert_eq!(config.http.timeouts(), Timeouts::default());
    }

    #[test]
    fn test_save_config() {
        let mut config = AppConfig::default();
        config.car.address = "car.local".to_string();
        config.http.long_timeout_ms = 20000;
        config.poll.enabled = true;
        config.descriptor.save_to_file = true;
        config.descriptor.file = "surface.json".to_string();
        config.logging.level = "warn".to_string();

        let temp_file = NamedTempFile::new().unwrap();
        config.save(temp_file.path()).unwrap();

        let loaded_config = AppConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(loaded_config.car.address, "car.local");
        assert_eq!(loaded_config.remocon.address, PLACEHOLDER_ADDRESS);
        assert_eq!(loaded_config.http.long_timeout_ms, 20000);
        assert!(loaded_config.poll.enabled);
        assert!(loaded_config.descriptor.save_to_file);
        assert_eq!(loaded_config.descriptor.file, "surface.json");
        assert_eq!(loaded_config.get_log_level(), LevelFilter::Warn);
    }

    #[test]
    fn test_timeouts_from_http_section() {
        let http = HttpConfig {
            timeout_ms: 250,
            long_timeout_ms: 1000,
        };
        let timeouts = http.timeouts();
        assert_eq!(timeouts.short, Duration::from_millis(250));
        assert_eq!(timeouts.long, Duration::from_millis(1000));
    }
}
