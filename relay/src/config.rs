use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use url::Url;

pub const DEFAULT_NOTION_BASE_URL: &str = "https://api.notion.com/v1";
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variables read by [`Config::apply_env`].
pub const ENV_NOTION_TOKEN: &str = "NOTION_TOKEN";
pub const ENV_NOTION_DATABASE_ID: &str = "NOTION_DATABASE_ID";
pub const ENV_NOTION_VERSION: &str = "NOTION_VERSION";
pub const ENV_PORT: &str = "PORT";
pub const ENV_PUBLIC_HOST: &str = "HEROKU_APP_DEFAULT_DOMAIN_NAME";

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Listener and admin listener both bind {0}")]
    ListenerConflict(String),

    #[error("Notion token is not set (use NOTION_TOKEN)")]
    MissingToken,

    #[error("Notion database id is not set (use NOTION_DATABASE_ID)")]
    MissingDatabaseId,

    #[error("Notion base url must be http or https, got: {0}")]
    UnsupportedScheme(String),

    #[error("Upstream timeout cannot be 0")]
    ZeroTimeout,
}

#[derive(Error, Debug, PartialEq)]
#[error("invalid value for {name}: {value:?}")]
pub struct EnvError {
    pub name: &'static str,
    pub value: String,
}

/// Relay configuration.
///
/// Every section has a default so an empty YAML document is a valid starting
/// point; credentials usually arrive through [`Config::apply_env`].
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for the task endpoints
    #[serde(default = "Listener::default_relay")]
    pub listener: Listener,
    /// Listener for `/health` and `/ready`
    #[serde(default = "Listener::default_admin")]
    pub admin_listener: Listener,
    #[serde(default)]
    pub notion: NotionConfig,
    /// Public hostname of the deployment. Informational only.
    #[serde(default)]
    pub public_host: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: Listener::default_relay(),
            admin_listener: Listener::default_admin(),
            notion: NotionConfig::default(),
            public_host: None,
        }
    }
}

impl Config {
    /// Overlays values from the process environment.
    ///
    /// `lookup` returns the value of a variable; empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), EnvError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(token) = get(ENV_NOTION_TOKEN) {
            self.notion.token = token;
        }
        if let Some(database_id) = get(ENV_NOTION_DATABASE_ID) {
            self.notion.database_id = database_id;
        }
        if let Some(version) = get(ENV_NOTION_VERSION) {
            self.notion.version = version;
        }
        if let Some(port) = get(ENV_PORT) {
            self.listener.port = port.trim().parse().map_err(|_| EnvError {
                name: ENV_PORT,
                value: port,
            })?;
        }
        if let Some(host) = get(ENV_PUBLIC_HOST) {
            self.public_host = Some(host);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.listener == self.admin_listener {
            return Err(ValidationError::ListenerConflict(self.listener.to_string()));
        }

        self.notion.validate()
    }

    /// URL clients reach the relay at, if a public host is configured.
    pub fn public_url(&self) -> Option<String> {
        self.public_host.as_ref().map(|host| format!("http://{host}"))
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    fn default_relay() -> Self {
        Listener {
            host: "0.0.0.0".into(),
            port: 8000,
        }
    }

    fn default_admin() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 8001,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

impl fmt::Display for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Upstream Notion API settings and credentials
#[derive(Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotionConfig {
    /// Root of the versioned API, e.g. `https://api.notion.com/v1`
    pub base_url: Url,
    /// Sent as the `Notion-Version` header
    pub version: String,
    /// Bound on a single upstream call, including reading the body
    pub timeout_secs: u64,
    pub token: String,
    pub database_id: String,
}

impl Default for NotionConfig {
    fn default() -> Self {
        NotionConfig {
            base_url: Url::parse(DEFAULT_NOTION_BASE_URL).expect("default base url is valid"),
            version: DEFAULT_NOTION_VERSION.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            token: String::new(),
            database_id: String::new(),
        }
    }
}

impl NotionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.token.is_empty() {
            return Err(ValidationError::MissingToken);
        }
        if self.database_id.is_empty() {
            return Err(ValidationError::MissingDatabaseId);
        }
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(ValidationError::UnsupportedScheme(
                self.base_url.scheme().to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout);
        }
        Ok(())
    }
}

// The token never ends up in logs.
impl fmt::Debug for NotionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionConfig")
            .field("base_url", &self.base_url.as_str())
            .field("version", &self.version)
            .field("timeout_secs", &self.timeout_secs)
            .field("token", &"<redacted>")
            .field("database_id", &self.database_id)
            .finish()
    }
}
