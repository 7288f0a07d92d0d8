use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::ArnPrefix;

/// Root configuration file structure
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DashConfig {
    /// Region the orchestration service is queried in
    #[serde(default = "default_region")]
    pub region: String,

    /// Account owning the resources; enables exact prefix stripping
    #[serde(default)]
    pub account_id: Option<String>,

    /// Period of the slow tree rebuild
    #[serde(default = "default_tree_refresh")]
    pub tree_refresh_secs: u64,

    /// Period of the repaint tick
    #[serde(default = "default_repaint")]
    pub repaint_millis: u64,

    /// Bound on every remote call
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Max services per batched describe call
    #[serde(default = "default_batch")]
    pub describe_batch_size: usize,

    /// Number of service events shown in the event log
    #[serde(default = "default_event_limit")]
    pub event_limit: usize,

    #[serde(default = "default_log_capacity")]
    pub debug_log_capacity: usize,

    /// Serve the inventory from a YAML fixture instead of the demo fleet
    #[serde(default)]
    pub fixture: Option<PathBuf>,
}

fn default_region() -> String {
    "eu-west-1".into()
}
fn default_tree_refresh() -> u64 {
    60
}
fn default_repaint() -> u64 {
    1000
}
fn default_timeout() -> u64 {
    10
}
fn default_batch() -> usize {
    10
}
fn default_event_limit() -> usize {
    50
}
fn default_log_capacity() -> usize {
    500
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            account_id: None,
            tree_refresh_secs: default_tree_refresh(),
            repaint_millis: default_repaint(),
            request_timeout_secs: default_timeout(),
            describe_batch_size: default_batch(),
            event_limit: default_event_limit(),
            debug_log_capacity: default_log_capacity(),
            fixture: None,
        }
    }
}

const CONFIG_NAMES: [&str; 4] = [
    "ecsdash.yaml",
    "ecsdash.yml",
    ".ecsdash.yaml",
    ".ecsdash.yml",
];

impl DashConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        // relative fixture paths are resolved against the config file
        if let (Some(fixture), Some(dir)) = (&config.fixture, path.parent()) {
            if fixture.is_relative() {
                config.fixture = Some(dir.join(fixture));
            }
        }
        Ok(config)
    }

    /// Load configuration from a string (useful for testing)
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: DashConfig = if content.trim().is_empty() {
            DashConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Search for config file in standard locations
    pub fn discover(start_dir: &Path) -> Result<(PathBuf, Self), ConfigError> {
        let mut searched = Vec::new();

        if let Ok(env_path) = std::env::var("ECSDASH_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Ok((path.clone(), Self::load(&path)?));
            }
            searched.push(path);
        }

        let mut dir = Some(start_dir);
        while let Some(current) = dir {
            for name in &CONFIG_NAMES {
                let path = current.join(name);
                if path.exists() {
                    return Ok((path.clone(), Self::load(&path)?));
                }
                searched.push(path);
            }
            dir = current.parent();
        }

        Err(ConfigError::NotFound { searched })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn nonzero(field: &str, value: u64) -> Result<(), ConfigError> {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: "must be greater than zero".into(),
                });
            }
            Ok(())
        }

        if self.region.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "region".into(),
                reason: "must not be empty".into(),
            });
        }
        nonzero("tree_refresh_secs", self.tree_refresh_secs)?;
        nonzero("repaint_millis", self.repaint_millis)?;
        nonzero("request_timeout_secs", self.request_timeout_secs)?;
        nonzero("describe_batch_size", self.describe_batch_size as u64)?;
        nonzero("event_limit", self.event_limit as u64)?;
        nonzero("debug_log_capacity", self.debug_log_capacity as u64)?;
        Ok(())
    }

    pub fn arn_prefix(&self) -> ArnPrefix {
        ArnPrefix::new(self.region.clone(), self.account_id.clone())
    }

    pub fn tree_refresh(&self) -> Duration {
        Duration::from_secs(self.tree_refresh_secs)
    }

    pub fn repaint(&self) -> Duration {
        Duration::from_millis(self.repaint_millis)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = DashConfig::from_str("").unwrap();
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.tree_refresh(), Duration::from_secs(60));
        assert_eq!(config.repaint(), Duration::from_secs(1));
        assert_eq!(config.describe_batch_size, 10);
        assert_eq!(config.event_limit, 50);
    }

    #[test]
    fn test_parse_overrides() {
        let yaml = r#"
region: us-east-1
account_id: "123456789012"
tree_refresh_secs: 30
describe_batch_size: 5
"#;
        let config = DashConfig::from_str(yaml).unwrap();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.tree_refresh_secs, 30);
        assert_eq!(config.describe_batch_size, 5);
        assert_eq!(
            config.arn_prefix().literal().as_deref(),
            Some("arn:aws:ecs:us-east-1:123456789012:")
        );
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = DashConfig::from_str("repaint_millis: 0\n");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { ref field, .. }) if field == "repaint_millis"
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = DashConfig::from_str("refresh: 10\n");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }
}
