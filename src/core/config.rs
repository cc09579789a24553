//! Configuration management
//!
//! Settings live in a single YAML file (by default in the platform config
//! directory). Values from the environment or the command line are layered
//! on top with [`Config::apply_overrides`]. The loaded [`Config`] is then
//! split up and handed explicitly to the pieces that need it: the remote
//! client gets a [`ServerConfig`] and [`Credentials`], tree reconstruction
//! and sync get an [`AttributeConfig`].

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::bom::{RevisionRule, IDENTITY_KEYS};
use crate::error::{TcError, TcResult};

/// File name of the user configuration inside the config directory
pub const CONFIG_FILE: &str = "config.yaml";

/// Value used wherever an attribute could not be resolved
pub const PLACEHOLDER: &str = "N/A";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub credentials: Credentials,
    /// Revision rule used when opening a structure (`None` = server default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_rule: Option<RevisionRule>,
    pub attributes: AttributeConfig,
    pub sync: SyncConfig,
}

/// Where the server lives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base address, e.g. `http://plm.example.com`
    pub url: String,
    /// Web-tier port (kept as a string; some sites route without one)
    pub port: String,
    /// Web-tier application name
    pub app_name: String,
    /// Base address of the web viewer used for deep links
    pub awc_url: String,
    /// Per-request timeout enforced by the HTTP transport
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            port: "7001".to_string(),
            app_name: "tc".to_string(),
            awc_url: String::new(),
            timeout_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Full URL of a JSON REST service, e.g. `Core-2011-06-Session/login`
    pub fn service_url(&self, service: &str) -> String {
        let base = self.url.trim_end_matches('/');
        let app = self.app_name.trim_matches('/');
        if self.port.is_empty() {
            format!("{}/{}/JsonRestServices/{}", base, app, service)
        } else {
            format!("{}:{}/{}/JsonRestServices/{}", base, self.port, app, service)
        }
    }

    /// Deep link that opens an object in the web viewer
    pub fn deep_link(&self, uid: &str) -> String {
        format!(
            "{}#/com.siemens.splm.clientfx.tcui.xrt.showObject?uid={}",
            self.awc_url, uid
        )
    }

    pub fn validate(&self) -> TcResult<()> {
        if self.url.trim().is_empty() {
            return Err(TcError::Config(
                "server.url is not set (use --url, TCBOM_URL or the config file)".to_string(),
            ));
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(TcError::Config(format!(
                "server.url must start with http:// or https:// (got '{}')",
                self.url
            )));
        }
        Ok(())
    }
}

/// Login credentials, forwarded to the server as opaque strings
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// One displayed attribute: the server property name and its label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub key: String,
    pub label: String,
}

impl AttributeDef {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// Ordered list of attributes to fetch, display and write into notes
///
/// Order is significant: it is the column order of every rendering and the
/// row order of the attribute table in each note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeConfig(Vec<AttributeDef>);

impl Default for AttributeConfig {
    fn default() -> Self {
        Self(vec![
            AttributeDef::new("item_id", "Item ID"),
            AttributeDef::new("item_revision_id", "Revision ID"),
            AttributeDef::new("object_name", "Name"),
            AttributeDef::new("object_desc", "Description"),
            AttributeDef::new("object_type", "Type"),
            AttributeDef::new("owning_user", "Owner"),
            AttributeDef::new("last_mod_date", "Last Modified"),
        ])
    }
}

impl AttributeConfig {
    pub fn new(defs: Vec<AttributeDef>) -> Self {
        Self(defs)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeDef> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|d| d.key.as_str())
    }

    /// Keys to request from the server: the configured ones, then each
    /// identity key the list leaves out
    pub fn fetch_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.keys().collect();
        for key in IDENTITY_KEYS {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|d| d.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Options for writing notes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Folder created under the vault that holds every synced BOM
    pub root_folder: String,
    /// Custom tera template for newly created notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_template: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root_folder: "Teamcenter BOMs".to_string(),
            note_template: None,
        }
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub url: Option<String>,
    pub port: Option<String>,
    pub app_name: Option<String>,
    pub awc_url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Config {
    /// Default config file location (`<config dir>/tcbom/config.yaml`)
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "tcbom").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used when present and built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> TcResult<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(TcError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Self::load_file(path)
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn load_file(path: &Path) -> TcResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_yml::from_str(&content).map_err(|e| {
            TcError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Write configuration to a file, creating parent directories
    pub fn save(&self, path: &Path) -> TcResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_yml::to_string(self)
            .map_err(|e| TcError::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(path, yaml)?;
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.url {
            self.server.url = url;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(app) = overrides.app_name {
            self.server.app_name = app;
        }
        if let Some(awc) = overrides.awc_url {
            self.server.awc_url = awc;
        }
        if let Some(user) = overrides.user {
            self.credentials.user = user;
        }
        if let Some(password) = overrides.password {
            self.credentials.password = password;
        }
    }

    /// YAML rendering with the password masked
    pub fn to_redacted_yaml(&self) -> TcResult<String> {
        let mut shown = self.clone();
        if !shown.credentials.password.is_empty() {
            shown.credentials.password = "********".to_string();
        }
        serde_yml::to_string(&shown)
            .map_err(|e| TcError::Config(format!("failed to serialize config: {}", e)))
    }
}
