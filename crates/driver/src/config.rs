// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Connection Configuration
//!
//! Everything a connection needs to reach an XMLA provider:
//! - Server URL (HTTP or HTTPS endpoint of the provider)
//! - Catalog, data-source descriptor, locale and role
//! - Query timeout
//! - Member cache sizing and the batch lookup mode
//!
//! ## Sources
//!
//! A configuration can be built in code, read from a YAML document, taken
//! from a JSON settings object (under the `"xmla"` key), or parsed from a
//! classic XMLA connect string:
//!
//! ```rust
//! use xmla_olap_driver::XmlaConfig;
//!
//! let config = XmlaConfig::from_connect_string(
//!     "jdbc:xmla:Server=http://localhost:8080/mondrian/xmla;Catalog=FoodMart",
//! )
//! .unwrap();
//! assert_eq!(config.catalog.as_deref(), Some("FoodMart"));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use xmla_olap_metadata::session::{DEFAULT_LEVEL_CACHE_CAPACITY, DEFAULT_MEMBER_CACHE_CAPACITY};
use xmla_olap_metadata::{BatchLookupMode, SessionSettings};
use xmla_olap_protocol::XmlaError;

/// Prefix tolerated in front of a connect string
const CONNECT_STRING_PREFIX: &str = "jdbc:xmla:";

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct XmlaConfig {
    /// Provider endpoint, e.g. `http://localhost:8080/mondrian/xmla`
    pub server_url: String,

    /// Catalog selected for requests that name none
    pub catalog: Option<String>,

    /// Data-source descriptor; discovered from the server when absent
    pub data_source_info: Option<String>,

    pub locale: Option<String>,
    pub role: Option<String>,

    /// Query timeout in seconds; zero or negative waits indefinitely
    pub query_timeout_secs: i64,

    pub member_cache_capacity: usize,
    pub level_cache_capacity: usize,

    pub batch_lookup: BatchLookupMode,

    /// HTTP basic credentials
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Default for XmlaConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            catalog: None,
            data_source_info: None,
            locale: None,
            role: None,
            query_timeout_secs: 0,
            member_cache_capacity: DEFAULT_MEMBER_CACHE_CAPACITY,
            level_cache_capacity: DEFAULT_LEVEL_CACHE_CAPACITY,
            batch_lookup: BatchLookupMode::Auto,
            user: None,
            password: None,
        }
    }
}

impl XmlaConfig {
    /// Create a configuration for a server URL
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn with_data_source_info(mut self, info: impl Into<String>) -> Self {
        self.data_source_info = Some(info.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_query_timeout(mut self, secs: i64) -> Self {
        self.query_timeout_secs = secs;
        self
    }

    pub fn with_batch_lookup(mut self, mode: BatchLookupMode) -> Self {
        self.batch_lookup = mode;
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Validate the configuration
    ///
    /// Checks that:
    /// - The server URL is present and uses HTTP or HTTPS
    /// - Cache capacities are positive
    /// - A password is only given together with a user
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::MissingServerUrl);
        }

        let lower = self.server_url.to_ascii_lowercase();
        if !lower.starts_with("http://") && !lower.starts_with("https://") {
            return Err(ConfigError::InvalidServerUrl {
                url: self.server_url.clone(),
                reason: "expected an http:// or https:// URL".to_string(),
            });
        }

        if self.member_cache_capacity == 0 {
            return Err(ConfigError::InvalidCacheCapacity {
                reason: "member_cache_capacity must be > 0".to_string(),
            });
        }

        if self.level_cache_capacity == 0 {
            return Err(ConfigError::InvalidCacheCapacity {
                reason: "level_cache_capacity must be > 0".to_string(),
            });
        }

        if self.password.is_some() && self.user.is_none() {
            return Err(ConfigError::InvalidCredentials);
        }

        Ok(())
    }

    /// Query timeout as a wait budget; `None` waits indefinitely
    pub fn query_timeout(&self) -> Option<Duration> {
        timeout_from_secs(self.query_timeout_secs)
    }

    /// Settings for the session this configuration opens
    pub fn session_settings(&self) -> SessionSettings {
        let mut settings = SessionSettings::default()
            .with_batch_lookup(self.batch_lookup)
            .with_member_cache_capacity(self.member_cache_capacity);
        settings.data_source_info = self.data_source_info.clone();
        settings.catalog = self.catalog.clone();
        settings.locale = self.locale.clone();
        settings.role = self.role.clone();
        settings.level_cache_capacity = self.level_cache_capacity;
        settings
    }

    /// Parse configuration from a settings payload
    ///
    /// Expected shape:
    /// {
    ///   "xmla": {
    ///     "serverUrl": "http://localhost:8080/mondrian/xmla",
    ///     "catalog": "FoodMart",
    ///     "queryTimeoutSecs": 30
    ///   }
    /// }
    pub fn from_settings(settings: &Value) -> Result<Self, ConfigError> {
        let section = settings.get("xmla").ok_or(ConfigError::MissingSection("xmla"))?;
        let config: Self = serde_json::from_value(section.clone())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a `Key=Value;` connect string
    ///
    /// Recognized keys (case-insensitive): `Server`, `Catalog`, `DataSource`
    /// (or `DataSourceInfo`), `Role`, `Locale` (or `LocaleIdentifier`),
    /// `Timeout`, `User`, `Password`, `BatchLookup`. Unknown keys are ignored.
    pub fn from_connect_string(connect_string: &str) -> Result<Self, ConfigError> {
        let trimmed = connect_string.trim();
        let body = if trimmed
            .get(..CONNECT_STRING_PREFIX.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(CONNECT_STRING_PREFIX))
        {
            &trimmed[CONNECT_STRING_PREFIX.len()..]
        } else {
            trimmed
        };

        let mut config = Self::default();
        for part in body.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                ConfigError::Parse(format!("expected Key=Value, found '{}'", part))
            })?;
            let value = value.trim().to_string();
            match key.trim().to_ascii_lowercase().as_str() {
                "server" => config.server_url = value,
                "catalog" => config.catalog = Some(value),
                "datasource" | "datasourceinfo" => config.data_source_info = Some(value),
                "role" => config.role = Some(value),
                "locale" | "localeidentifier" => config.locale = Some(value),
                "timeout" => {
                    config.query_timeout_secs = value.parse().map_err(|_| {
                        ConfigError::Parse(format!("Timeout must be an integer, found '{}'", value))
                    })?
                }
                "user" => config.user = Some(value),
                "password" => config.password = Some(value),
                "batchlookup" => {
                    config.batch_lookup = value.parse().map_err(ConfigError::Parse)?;
                }
                _ => {}
            }
        }
        config.validate()?;
        Ok(config)
    }
}

/// Seconds to a wait budget; zero or negative means no limit
pub(crate) fn timeout_from_secs(secs: i64) -> Option<Duration> {
    u64::try_from(secs)
        .ok()
        .filter(|&s| s > 0)
        .map(Duration::from_secs)
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Missing server URL
    #[error("Server URL is required")]
    MissingServerUrl,

    /// Server URL with an unsupported scheme
    #[error("Invalid server URL '{url}': {reason}")]
    InvalidServerUrl { url: String, reason: String },

    #[error("Invalid cache configuration: {reason}")]
    InvalidCacheCapacity { reason: String },

    #[error("A password was given without a user")]
    InvalidCredentials,

    /// Settings payload lacks the configuration section
    #[error("Settings have no '{0}' section")]
    MissingSection(&'static str),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl From<ConfigError> for XmlaError {
    fn from(err: ConfigError) -> Self {
        XmlaError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config_needs_server() {
        assert_eq!(XmlaConfig::default().validate(), Err(ConfigError::MissingServerUrl));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = XmlaConfig::new("ftp://olap").validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidServerUrl { .. }));
    }

    #[test]
    fn test_rejects_zero_cache_capacity() {
        let mut config = XmlaConfig::new("http://localhost/xmla");
        config.member_cache_capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCacheCapacity { .. })
        ));
    }

    #[test]
    fn test_connect_string() {
        let config = XmlaConfig::from_connect_string(
            "jdbc:xmla:Server=http://localhost:8080/mondrian/xmla;catalog=FoodMart;\
             DataSource=Provider=Mondrian;Role=Admin;Timeout=30;Flavor=ignored",
        )
        .unwrap();
        assert_eq!(config.server_url, "http://localhost:8080/mondrian/xmla");
        assert_eq!(config.catalog.as_deref(), Some("FoodMart"));
        assert_eq!(config.data_source_info.as_deref(), Some("Provider=Mondrian"));
        assert_eq!(config.role.as_deref(), Some("Admin"));
        assert_eq!(config.query_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_connect_string_rejects_bad_timeout() {
        let err = XmlaConfig::from_connect_string("Server=http://h/x;Timeout=soon").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_non_positive_timeout_waits_forever() {
        assert_eq!(XmlaConfig::new("http://h").with_query_timeout(0).query_timeout(), None);
        assert_eq!(XmlaConfig::new("http://h").with_query_timeout(-5).query_timeout(), None);
    }

    #[test]
    fn test_from_settings() {
        let settings = json!({
            "xmla": {
                "serverUrl": "https://olap.example.com/xmla",
                "catalog": "FoodMart",
                "batchLookup": "sequential",
                "memberCacheCapacity": 500
            }
        });
        let config = XmlaConfig::from_settings(&settings).unwrap();
        assert_eq!(config.batch_lookup, BatchLookupMode::Sequential);
        assert_eq!(config.member_cache_capacity, 500);
        assert_eq!(config.level_cache_capacity, DEFAULT_LEVEL_CACHE_CAPACITY);

        assert_eq!(
            XmlaConfig::from_settings(&json!({})),
            Err(ConfigError::MissingSection("xmla"))
        );
    }

    #[test]
    fn test_from_yaml() {
        let config = XmlaConfig::from_yaml_str(
            "serverUrl: http://localhost:8080/mondrian/xmla\ncatalog: FoodMart\nqueryTimeoutSecs: 10\n",
        )
        .unwrap();
        assert_eq!(config.query_timeout_secs, 10);
        assert_eq!(config.session_settings().catalog.as_deref(), Some("FoodMart"));
    }
}
