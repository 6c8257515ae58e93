//! Configuration management for cms-fields
//!
//! Upload handling and per-field settings are loaded from multiple sources
//! with clear precedence:
//!
//! 1. Environment variables (highest priority, `CMS_FIELDS_` prefix)
//! 2. `./config.toml` (development)
//! 3. `~/.config/cms-fields/{service}/config.toml` (user config, XDG)
//! 4. `/etc/cms-fields/{service}/config.toml` (system config)
//! 5. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # config.toml
//! [uploads]
//! dest_root = "./public"
//! temp_dir = "/var/tmp/cms-uploads"
//! max_file_size = 10485760
//!
//! [fields.hero_image]
//! dest = "images/heroes"
//! allowed_types = ["image/png", "image/jpeg"]
//! date_prefix = "YYYY-MM-DD"
//! auto_cleanup = true
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use cms_fields::config::FieldsConfig;
//! use cms_fields::fields::LocalImageType;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = FieldsConfig::load_for_service("blog")?;
//! let options = config.local_image_options("hero_image")?;
//! let field = LocalImageType::new("Post", "heroImage", options)?;
//! # Ok(())
//! # }
//! ```

use crate::error::{FieldError, FieldResult};
use crate::fields::localimage::{LocalImageOptions, LocalImageSettings};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Default maximum size of one uploaded file (10MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Multipart upload handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadsConfig {
    /// Root directory field destinations are resolved against
    ///
    /// Used for fields that do not set their own `dest_root`.
    pub dest_root: PathBuf,

    /// Directory uploaded parts are parked in until moved
    pub temp_dir: PathBuf,

    /// Maximum size of one uploaded file in bytes
    pub max_file_size: u64,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dest_root: PathBuf::from("./public"),
            temp_dir: std::env::temp_dir(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Complete cms-fields configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldsConfig {
    /// Upload handling
    #[serde(default)]
    pub uploads: UploadsConfig,

    /// Local image field settings keyed by field name
    #[serde(default)]
    pub fields: HashMap<String, LocalImageSettings>,
}

impl FieldsConfig {
    /// Load configuration for a specific service
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Default configuration cannot be serialized to TOML
    /// - A configuration file cannot be read or parsed
    /// - Configuration values fail type conversion
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use cms_fields::config::FieldsConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = FieldsConfig::load_for_service("blog")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn load_for_service(service_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::new()
            // 5. Start with defaults (lowest priority)
            .merge(Toml::string(&toml::to_string(&Self::default())?));

        // 4. System config: /etc/cms-fields/{service_name}/config.toml
        let system_config = PathBuf::from("/etc/cms-fields")
            .join(service_name)
            .join("config.toml");
        if system_config.exists() {
            figment = figment.merge(Toml::file(&system_config));
        }

        // 3. User config: ~/.config/cms-fields/{service_name}/config.toml
        let user_config = Self::recommended_path(service_name);
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }

        // 2. Local config: ./config.toml
        let local_config = PathBuf::from("./config.toml");
        if local_config.exists() {
            figment = figment.merge(Toml::file(&local_config));
        }

        // 1. Environment variables (double underscore for nesting)
        figment = figment.merge(Env::prefixed("CMS_FIELDS_").split("__").lowercase(true));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// # Errors
    ///
    /// Returns an error if the file contains invalid TOML or values fail type
    /// conversion. A missing file yields the defaults.
    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        let config = Figment::new()
            .merge(Toml::string(&toml::to_string(&Self::default())?))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CMS_FIELDS_").split("__").lowercase(true))
            .extract()?;

        Ok(config)
    }

    /// Get the recommended XDG config path for a service
    ///
    /// # Example
    ///
    /// ```rust
    /// use cms_fields::config::FieldsConfig;
    ///
    /// let path = FieldsConfig::recommended_path("blog");
    /// // Returns: ~/.config/cms-fields/blog/config.toml
    /// ```
    #[must_use]
    pub fn recommended_path(service_name: &str) -> PathBuf {
        dirs::config_dir().map_or_else(
            || PathBuf::from("./config.toml"),
            |config_dir| {
                config_dir
                    .join("cms-fields")
                    .join(service_name)
                    .join("config.toml")
            },
        )
    }

    /// Options for the local image field configured under `[fields.<name>]`
    ///
    /// Fields without their own `dest_root` inherit `[uploads].dest_root`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Configuration`] if no such section exists.
    pub fn local_image_options(&self, name: &str) -> FieldResult<LocalImageOptions> {
        let mut settings = self
            .fields
            .get(name)
            .cloned()
            .ok_or_else(|| FieldError::Configuration(format!("No settings for field \"{name}\"")))?;

        if settings.dest_root.as_os_str().is_empty() {
            settings.dest_root.clone_from(&self.uploads.dest_root);
        }

        Ok(LocalImageOptions::from_settings(settings))
    }
}
