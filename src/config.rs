//! Runtime configuration.
//!
//! Values come from an optional TOML file, then command-line flags (or their
//! environment fallbacks) override them.

use std::path::Path;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::AppError;
use crate::salesforce::{OrgCredentials, DEFAULT_APEX_RESOURCE};
use crate::salesforce::client::DEFAULT_TIMEOUT_SECS;

/// On-disk shape of the config file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    instance_url: Option<String>,
    access_token: Option<String>,
    apex_resource: Option<String>,
    timeout_secs: Option<u64>,
}

/// Resolved settings for one run.
#[derive(Clone)]
pub struct Config {
    pub instance_url: Option<String>,
    pub access_token: Option<SecretString>,
    pub apex_resource: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instance_url: None,
            access_token: None,
            apex_resource: DEFAULT_APEX_RESOURCE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("instance_url", &self.instance_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("apex_resource", &self.apex_resource)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Reads `path` when given, otherwise starts from defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&text)?;
        debug!("[CONFIG] Loaded {}", path.display());
        Ok(config)
    }

    /// Parses TOML text, filling missing fields with defaults.
    pub fn from_toml(text: &str) -> Result<Self, AppError> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| AppError::Config(e.message().to_string()))?;
        let defaults = Self::default();

        Ok(Self {
            instance_url: file.instance_url.filter(|s| !s.trim().is_empty()),
            access_token: file
                .access_token
                .filter(|s| !s.trim().is_empty())
                .map(SecretString::from),
            apex_resource: file.apex_resource.unwrap_or(defaults.apex_resource),
            timeout_secs: file.timeout_secs.unwrap_or(defaults.timeout_secs),
        })
    }

    /// Applies flag/env values on top of the file values.
    pub fn with_overrides(mut self, instance_url: Option<String>, access_token: Option<String>) -> Self {
        if let Some(url) = instance_url.filter(|s| !s.trim().is_empty()) {
            self.instance_url = Some(url);
        }
        if let Some(token) = access_token.filter(|s| !s.trim().is_empty()) {
            self.access_token = Some(SecretString::from(token));
        }
        self
    }

    /// Checks that everything needed to reach the org is present.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first problem found.
    pub fn validate(&self) -> Result<(), AppError> {
        let raw = self
            .instance_url
            .as_deref()
            .ok_or_else(|| AppError::Config("instance_url is not set".into()))?;
        let url = Url::parse(raw.trim())
            .map_err(|e| AppError::Config(format!("instance_url is invalid: {}", e)))?;
        if !matches!(url.scheme(), "https" | "http") || url.host_str().is_none() {
            return Err(AppError::Config(
                "instance_url must be an http(s) URL with a host".into(),
            ));
        }

        match &self.access_token {
            Some(token) if !token.expose_secret().trim().is_empty() => {}
            _ => return Err(AppError::Config("access_token is not set".into())),
        }

        if self.apex_resource.trim_matches('/').is_empty() {
            return Err(AppError::Config("apex_resource is empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::Config("timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validates and converts into client credentials.
    pub fn credentials(&self) -> Result<OrgCredentials, AppError> {
        self.validate()?;
        let instance_url = self.instance_url.clone().unwrap_or_default();
        let access_token = self
            .access_token
            .clone()
            .ok_or_else(|| AppError::Config("access_token is not set".into()))?;

        Ok(OrgCredentials {
            instance_url: instance_url.trim().trim_end_matches('/').to_string(),
            access_token,
        })
    }
}
