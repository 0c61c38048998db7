//! Configuration validation

use std::collections::HashSet;

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::Config;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_changes(config)?;
    validate_packages(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_changes(config: &Config) -> Result<()> {
    if let Some(since) = &config.changes.since {
        if since.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "changes.since".to_string(),
                message: "since cannot be empty".to_string(),
            }
            .into());
        }
    }

    Ok(())
}

fn validate_packages(config: &Config) -> Result<()> {
    if !config.packages.is_empty() {
        debug!(count = config.packages.len(), "validating packages");
    }
    let mut seen = HashSet::new();
    for (i, package) in config.packages.iter().enumerate() {
        if package.name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("packages[{}].name", i),
                message: "package name cannot be empty".to_string(),
            }
            .into());
        }

        if !seen.insert(package.name.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: format!("packages[{}].name", i),
                message: format!("duplicate override for '{}'", package.name),
            }
            .into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PackageConfig;

    fn package(name: &str) -> PackageConfig {
        PackageConfig {
            name: name.to_string(),
            bump_version: true,
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_since() {
        let mut config = Config::default();
        config.changes.since = Some("  ".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_duplicate_package() {
        let mut config = Config::default();
        config.packages = vec![package("a"), package("a")];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_package_name() {
        let mut config = Config::default();
        config.packages = vec![package("")];
        assert!(validate_config(&config).is_err());
    }
}
