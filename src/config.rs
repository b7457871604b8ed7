//! Generator configuration.
//!
//! Loaded from a YAML or JSON file (camelCase keys, every field optional) and then overridden
//! by command-line flags. See [`GeneratorConfig::default`] for the defaults.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorConfig {
    pub title: String,
    pub description: Option<String>,
    pub version: String,
    pub contact: Option<Contact>,
    pub license: Option<License>,
    pub servers: Vec<ServerConfig>,
    pub security: SecurityConfig,
    /// Every operation requires exactly the bearer scheme, regardless of middleware
    pub always_require_bearer: bool,
    /// Order in which inferred evidence is merged into resource schemas.
    /// Explicit annotations are always applied after these.
    pub evidence_order: Vec<EvidenceSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecurityConfig {
    pub bearer: BearerConfig,
    pub oauth2: OAuth2Config,
    pub api_key: ApiKeyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BearerConfig {
    pub enabled: bool,
}

impl Default for BearerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuth2Config {
    pub enabled: bool,
    /// Flow name (`password`, `clientCredentials`, ...) to flow definition
    pub flows: IndexMap<String, OAuthFlow>,
    /// Scopes required by authenticated operations
    pub scopes: Vec<String>,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        let password = OAuthFlow {
            token_url: Some("/oauth/token".to_string()),
            ..OAuthFlow::default()
        };
        Self {
            enabled: false,
            flows: IndexMap::from([("password".to_string(), password)]),
            scopes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OAuthFlow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,
    pub scopes: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeyConfig {
    pub enabled: bool,
    #[serde(rename = "in")]
    pub location: ApiKeyLocation,
    pub name: String,
}

impl Default for ApiKeyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            location: ApiKeyLocation::Header,
            name: "X-API-Key".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Header,
    Query,
    Cookie,
}

/// Inferred evidence sources for resource schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvidenceSource {
    /// `@property` tags in the type's documentation
    DocTags,
    /// Columns of the persisted record the type wraps
    Storage,
    /// Literal shape of the serialization method
    Shape,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            title: "API Documentation".to_string(),
            description: None,
            version: "1.0.0".to_string(),
            contact: None,
            license: None,
            servers: Vec::new(),
            security: SecurityConfig::default(),
            always_require_bearer: false,
            evidence_order: vec![
                EvidenceSource::DocTags,
                EvidenceSource::Storage,
                EvidenceSource::Shape,
            ],
        }
    }
}

impl GeneratorConfig {
    /// Load and validate a configuration file; the format follows the file extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let config: GeneratorConfig = match extension.as_deref() {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?,
            _ => {
                return Err(Error::InvalidConfig(format!(
                    "{}: expected a .json, .yaml or .yml file",
                    path.display()
                )))
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidConfig("title must not be empty".to_string()));
        }
        if self.version.trim().is_empty() {
            return Err(Error::InvalidConfig("version must not be empty".to_string()));
        }
        if self.security.oauth2.enabled && self.security.oauth2.flows.is_empty() {
            return Err(Error::InvalidConfig(
                "oauth2 is enabled but no flows are configured".to_string(),
            ));
        }
        if self.security.api_key.enabled && self.security.api_key.name.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "apiKey is enabled but has no name".to_string(),
            ));
        }
        for (index, source) in self.evidence_order.iter().enumerate() {
            if self.evidence_order[..index].contains(source) {
                return Err(Error::InvalidConfig(format!(
                    "evidenceOrder lists {:?} more than once",
                    source
                )));
            }
        }
        Ok(())
    }
}
