//! Configuration for the API schema generator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (apischema.toml)
//! - Environment variables (APISCHEMA_*)
//!
//! ## Example config file (apischema.toml):
//! ```toml
//! [school_year]
//! minimum = 1900
//! maximum = 2100
//!
//! [open_api]
//! title = "Ed-Fi Data Management Service API"
//! version = "1"
//!
//! [output]
//! format = "pretty"
//! include_fingerprint = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration for artifact generation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneratorConfig {
    /// School year enumeration bounds
    #[serde(default)]
    pub school_year: SchoolYearConfig,

    /// OpenAPI document metadata
    #[serde(default)]
    pub open_api: OpenApiConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Bounds applied to every school year field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolYearConfig {
    #[serde(default = "default_school_year_minimum")]
    pub minimum: i64,

    #[serde(default = "default_school_year_maximum")]
    pub maximum: i64,
}

/// Values emitted into the OpenAPI `info` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiConfig {
    #[serde(default = "default_api_title")]
    pub title: String,

    #[serde(default = "default_api_description")]
    pub description: String,

    #[serde(default = "default_api_version")]
    pub version: String,

    #[serde(default = "default_contact_url")]
    pub contact_url: String,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format (pretty or compact)
    #[serde(default)]
    pub format: OutputFormat,

    /// Include the SHA-256 fingerprint in the artifact bundle
    #[serde(default = "default_true")]
    pub include_fingerprint: bool,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_school_year_minimum() -> i64 {
    1900
}

fn default_school_year_maximum() -> i64 {
    2100
}

fn default_api_title() -> String {
    "Ed-Fi Data Management Service API".to_string()
}

fn default_api_description() -> String {
    "The Ed-Fi DMS API enables applications to read and write education data stored in an Ed-Fi DMS \
     through a secure REST interface. \n***\n > *Note: Consumers of DMS information should sanitize \
     all data for display and storage. DMS provides reasonable safeguards against cross-site scripting \
     attacks and other malicious content, but the platform does not and cannot guarantee that the data \
     it contains is free of all potentially harmful content.* \n***\n"
        .to_string()
}

fn default_api_version() -> String {
    "1".to_string()
}

fn default_contact_url() -> String {
    "https://www.ed-fi.org/what-is-ed-fi/contact/".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SchoolYearConfig {
    fn default() -> Self {
        Self {
            minimum: default_school_year_minimum(),
            maximum: default_school_year_maximum(),
        }
    }
}

impl Default for OpenApiConfig {
    fn default() -> Self {
        Self {
            title: default_api_title(),
            description: default_api_description(),
            version: default_api_version(),
            contact_url: default_contact_url(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Pretty,
            include_fingerprint: true,
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["apischema.toml", ".apischema.toml", "config/apischema.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Environment variables (APISCHEMA_*)
        builder = builder.add_source(
            Environment::with_prefix("APISCHEMA")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();
        assert_eq!(config.school_year.minimum, 1900);
        assert_eq!(config.school_year.maximum, 2100);
        assert_eq!(config.open_api.version, "1");
        assert!(config.output.include_fingerprint);
    }

    #[test]
    fn test_serialize_config() {
        let config = GeneratorConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[school_year]"));
        assert!(toml_str.contains("[open_api]"));
    }
}
