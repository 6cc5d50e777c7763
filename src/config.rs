//! Connection configuration and on-disk locations

use crate::error::{GistupError, Result};
use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use typed_builder::TypedBuilder;

/// API base used when none is configured
pub const DEFAULT_API_URL: &str = "https://api.github.com/";

/// Directory under the config dir holding gistup's files
pub const APP_DIR: &str = "gistup";

/// Token file name inside [`APP_DIR`]
pub const TOKEN_FILE: &str = "token";

/// Optional settings file name inside [`APP_DIR`]
pub const SETTINGS_FILE: &str = "config.json";

/// `User-Agent` sent with every request
pub const USER_AGENT: &str = concat!("gistup/", env!("CARGO_PKG_VERSION"));

/// Logged each time an HTTP client is built without certificate checks
pub(crate) const INSECURE_WARNING: &str = "TLS certificate verification is disabled (--insecure)";

/// Resolved connection parameters
///
/// Built once at startup and passed by reference to every component.
#[derive(Debug, Clone, Default, TypedBuilder)]
#[builder(
    builder_method(doc = "Create a new builder for ClientConfig"),
    builder_type(doc = "Builder for ClientConfig", vis = "pub"),
    build_method(doc = "Build the ClientConfig")
)]
pub struct ClientConfig {
    /// Alternate API base (GitHub Enterprise); `None` means [`DEFAULT_API_URL`]
    #[builder(default, setter(strip_option))]
    pub api_url: Option<Url>,

    /// Skip TLS certificate verification for every request
    #[builder(default)]
    pub insecure: bool,

    /// Upload without credentials
    #[builder(default)]
    pub anonymous: bool,
}

impl ClientConfig {
    /// Resolve configuration from command-line values and the settings file
    ///
    /// Command-line values (which already include environment fallbacks) win
    /// over the settings file.
    ///
    /// # Errors
    ///
    /// Returns `GistupError::Config` if the API URL is invalid.
    pub fn resolve(
        api_url: Option<&str>,
        insecure: bool,
        anonymous: bool,
        settings: &Settings,
    ) -> Result<Self> {
        let api_url = api_url
            .filter(|s| !s.is_empty())
            .or(settings.api_url.as_deref())
            .map(parse_api_url)
            .transpose()?;

        Ok(Self {
            api_url,
            insecure: insecure || settings.insecure.unwrap_or(false),
            anonymous,
        })
    }

    /// Resolve an API path beneath the configured base
    ///
    /// # Errors
    ///
    /// Returns `GistupError::Config` if the URL cannot be built.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let base = match &self.api_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_API_URL)
                .map_err(|e| GistupError::config(format!("default API URL: {e}")))?,
        };
        base.join(path)
            .map_err(|e| GistupError::config(format!("cannot join {path} to {base}: {e}")))
    }

    /// Build an HTTP client honoring the insecure-transport override
    ///
    /// # Errors
    ///
    /// Returns `GistupError::Config` if the TLS backend cannot be initialized.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if self.insecure {
            tracing::warn!("{INSECURE_WARNING}");
            builder = builder.danger_accept_invalid_certs(true);
        }
        builder
            .build()
            .map_err(|e| GistupError::config(format!("cannot build HTTP client: {e}")))
    }
}

/// Parse an API base URL, normalizing it to end with `/`
///
/// # Errors
///
/// Returns `GistupError::Config` for unparsable URLs or non-HTTP schemes.
pub fn parse_api_url(raw: &str) -> Result<Url> {
    let mut url =
        Url::parse(raw).map_err(|e| GistupError::config(format!("invalid API URL {raw:?}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(GistupError::config(format!(
            "invalid API URL {raw:?}: scheme must be http or https"
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Platform config directory: `%APPDATA%` on Windows, `~/.config` elsewhere
///
/// # Errors
///
/// Returns `GistupError::Config` if the directory cannot be determined.
pub fn config_dir() -> Result<PathBuf> {
    let dir = if cfg!(windows) {
        dirs::config_dir()
    } else {
        dirs::home_dir().map(|home| home.join(".config"))
    };
    dir.ok_or_else(|| GistupError::config("cannot determine the config directory"))
}

/// Default token file path: `<config-dir>/gistup/token`
///
/// # Errors
///
/// Returns `GistupError::Config` if the config directory cannot be determined.
pub fn token_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(APP_DIR).join(TOKEN_FILE))
}

/// Default settings file path: `<config-dir>/gistup/config.json`
///
/// # Errors
///
/// Returns `GistupError::Config` if the config directory cannot be determined.
pub fn settings_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(APP_DIR).join(SETTINGS_FILE))
}

/// Persisted defaults, lowest precedence
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Alternate API base
    #[serde(default)]
    pub api_url: Option<String>,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: Option<bool>,
}

impl Settings {
    /// Load settings, treating a missing file as empty
    ///
    /// # Errors
    ///
    /// Returns `GistupError::Config` if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(GistupError::config(format!("{}: {e}", path.display())));
            }
        };

        serde_json::from_str(&content)
            .map_err(|e| GistupError::config(format!("{}: {e}", path.display())))
    }
}
