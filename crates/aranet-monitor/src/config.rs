//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use aranet_core::{AlertThresholds, GapPolicy};
use aranet_store::{CsvFormat, DEFAULT_DATE_FORMAT};
use serde::{Deserialize, Serialize};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default device address
    #[serde(default)]
    pub device: Option<String>,

    /// History database path
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Date format of the CSV time column
    #[serde(default)]
    pub date_format: Option<String>,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,

    /// What to do with a reading that follows a missed measurement
    #[serde(default)]
    pub gap_policy: GapPolicy,

    /// Alert limits
    #[serde(default)]
    pub alerts: AlertThresholds,

    /// Pushover credentials
    #[serde(default)]
    pub pushover: PushoverConfig,
}

/// Pushover credentials.
///
/// Both must be set for alerts to be pushed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushoverConfig {
    /// Application token
    #[serde(default)]
    pub token: Option<String>,

    /// User key
    #[serde(default)]
    pub user: Option<String>,
}

impl Config {
    /// Get the default config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aranet-monitor")
            .join("config.toml")
    }

    /// Load config from file, or return default if not found.
    ///
    /// # Errors
    ///
    /// A file that exists but cannot be read, parsed or validated is an
    /// error, never a silent fallback to defaults: it may name the database.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(path).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Load and validate config from a file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = toml::from_str(&content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Check values that parse but cannot work.
    pub fn validate(&self) -> Result<()> {
        if let Some(device) = &self.device
            && device.trim().is_empty()
        {
            bail!("device is empty");
        }
        if let Some(format) = &self.date_format {
            CsvFormat::new(format).context("date_format")?;
        }
        self.alerts
            .validate()
            .map_err(|e| anyhow::anyhow!("alerts: {}", e))?;
        if self.pushover.token.is_some() != self.pushover.user.is_some() {
            bail!("pushover needs both token and user");
        }
        Ok(())
    }
}

/// Resolve device from arg, env var, or config.
pub fn resolve_device(device: Option<String>, config: &Config) -> Option<String> {
    device
        .filter(|d| !d.trim().is_empty())
        .or_else(|| config.device.clone())
}

/// Resolve the database path: arg, then config, then the platform default.
pub fn resolve_database(database: Option<PathBuf>, config: &Config) -> PathBuf {
    database
        .or_else(|| config.database.clone())
        .unwrap_or_else(aranet_store::default_db_path)
}

/// Resolve the CSV date format: arg, then config, then the default.
pub fn resolve_csv_format(date_format: Option<&str>, config: &Config) -> Result<CsvFormat> {
    let format = date_format
        .or(config.date_format.as_deref())
        .unwrap_or(DEFAULT_DATE_FORMAT);
    CsvFormat::new(format).with_context(|| format!("Invalid date format '{}'", format))
}

/// Resolve Pushover credentials: args override config, and both are needed.
pub fn resolve_pushover(
    token: Option<String>,
    user: Option<String>,
    config: &Config,
) -> Option<(String, String)> {
    let token = token.or_else(|| config.pushover.token.clone())?;
    let user = user.or_else(|| config.pushover.user.clone())?;
    Some((token, user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_device_prefers_arg() {
        let config = Config {
            device: Some("config-device".to_string()),
            ..Default::default()
        };
        let result = resolve_device(Some("arg-device".to_string()), &config);
        assert_eq!(result, Some("arg-device".to_string()));
    }

    #[test]
    fn test_resolve_device_falls_back_to_config() {
        let config = Config {
            device: Some("config-device".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_device(None, &config), Some("config-device".to_string()));
        // An empty env var counts as unset
        assert_eq!(
            resolve_device(Some(String::new()), &config),
            Some("config-device".to_string())
        );
    }

    #[test]
    fn test_resolve_device_none_when_both_empty() {
        assert_eq!(resolve_device(None, &Config::default()), None);
    }

    #[test]
    fn test_resolve_database() {
        let config = Config {
            database: Some(PathBuf::from("/data/config.db")),
            ..Default::default()
        };
        assert_eq!(
            resolve_database(Some(PathBuf::from("arg.db")), &config),
            PathBuf::from("arg.db")
        );
        assert_eq!(
            resolve_database(None, &config),
            PathBuf::from("/data/config.db")
        );
        assert_eq!(
            resolve_database(None, &Config::default()),
            aranet_store::default_db_path()
        );
    }

    #[test]
    fn test_resolve_pushover_needs_both() {
        let config = Config {
            pushover: PushoverConfig {
                token: Some("tok".to_string()),
                user: None,
            },
            ..Default::default()
        };
        assert_eq!(resolve_pushover(None, None, &config), None);
        assert_eq!(
            resolve_pushover(None, Some("usr".to_string()), &config),
            Some(("tok".to_string(), "usr".to_string()))
        );
    }

    #[test]
    fn test_resolve_csv_format() {
        let config = Config {
            date_format: Some("[year]-[month]-[day] [hour]:[minute]:[second]".to_string()),
            ..Default::default()
        };
        assert!(resolve_csv_format(None, &config).is_ok());
        assert!(resolve_csv_format(Some("[nonsense"), &config).is_err());
    }

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            device = "AA:BB:CC:DD:EE:FF"
            gap_policy = "persist-through-gap"

            [alerts]
            co2_rising_above = 1200

            [pushover]
            token = "tok"
            user = "usr"
            "#,
        )
        .unwrap();

        assert_eq!(config.device.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(config.gap_policy, GapPolicy::PersistThroughGap);
        assert_eq!(config.alerts.co2_rising_above, 1200);
        // Unset thresholds keep their defaults
        assert_eq!(config.alerts.high_temperature, 90.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.gap_policy, GapPolicy::SkipPersist);
    }

    #[test]
    fn test_validate_rejects_half_pushover() {
        let config = Config {
            pushover: PushoverConfig {
                token: None,
                user: Some("usr".to_string()),
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = Config::default();
        config.alerts.low_temperature = 95.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config {
            device: Some("AA:BB:CC:DD:EE:FF".to_string()),
            no_color: true,
            gap_policy: GapPolicy::PersistThroughGap,
            ..Default::default()
        };
        config.save(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_load_unparsable_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "gap_policy = 7").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }

    #[test]
    fn test_load_invalid_does_not_drop_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "database = \"/data/a.db\"\n\n[alerts]\nlow_temperature = 95.0\n",
        )
        .unwrap();

        // Never falls back to defaults, which would pick another database
        assert!(Config::load(&path).is_err());
    }
}
