//! Exchanges a username and password for a gist-scoped access token

use super::prompt::Credentials;
use super::token::{SecretStore, Token};
use crate::client::{describe_failure, execute};
use crate::config::ClientConfig;
use crate::error::{GistupError, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Path of the authorization endpoint, relative to the API base
pub const AUTHORIZATIONS_PATH: &str = "authorizations";

/// The only scope ever requested
pub const GIST_SCOPE: &str = "gist";

/// Note attached to every authorization grant
pub const AUTHORIZATION_NOTE: &str = "gistup";

/// Body of an authorization request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationRequest {
    /// Requested scopes
    pub scopes: Vec<String>,
    /// Human-readable note shown in the account's token list
    pub note: String,
    /// Random per-request identifier; not secret
    pub fingerprint: String,
}

impl AuthorizationRequest {
    /// Create a request with a fresh random fingerprint
    #[must_use]
    pub fn new() -> Self {
        Self {
            scopes: vec![GIST_SCOPE.to_string()],
            note: AUTHORIZATION_NOTE.to_string(),
            fingerprint: Uuid::new_v4().to_string(),
        }
    }
}

impl Default for AuthorizationRequest {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct AuthorizationResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Acquires tokens from the authorization endpoint
///
/// Holds its own HTTP client so Basic credentials are never attached to
/// anything but the authorization request. Failures are returned as-is;
/// retrying is the caller's decision.
#[derive(Debug, Clone)]
pub struct TokenAcquirer {
    http_client: reqwest::Client,
    endpoint: Url,
}

impl TokenAcquirer {
    /// Create an acquirer for the configured API base
    ///
    /// # Errors
    ///
    /// Returns `GistupError::Config` if the endpoint or HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            http_client: config.http_client()?,
            endpoint: config.endpoint(AUTHORIZATIONS_PATH)?,
        })
    }

    /// Get the authorization endpoint
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Request a token and persist it before returning
    ///
    /// # Errors
    ///
    /// Returns `GistupError::Auth` on a non-2xx or tokenless response,
    /// `GistupError::Network` on transport failure, `GistupError::Interrupted`
    /// if cancelled, and `GistupError::Persistence` if the token cannot be saved.
    pub async fn acquire(
        &self,
        credentials: &Credentials,
        store: &dyn SecretStore,
        cancel: &CancellationToken,
    ) -> Result<Token> {
        let body = AuthorizationRequest::new();
        tracing::debug!(
            endpoint = %self.endpoint,
            fingerprint = %body.fingerprint,
            "Requesting authorization"
        );

        let request = self
            .http_client
            .post(self.endpoint.clone())
            .basic_auth(&credentials.username, Some(&credentials.password))
            .json(&body);
        let response = execute(request, cancel, |e| GistupError::network(e.to_string())).await?;

        let status = response.status;
        if !status.is_success() {
            return Err(GistupError::auth(
                status.as_u16(),
                describe_failure(status, &response.body),
            ));
        }

        let parsed: AuthorizationResponse = serde_json::from_str(&response.body).map_err(|e| {
            GistupError::auth(status.as_u16(), format!("invalid authorization response: {e}"))
        })?;
        let token = parsed
            .token
            .filter(|t| !t.is_empty())
            .map(Token::new)
            .ok_or_else(|| {
                GistupError::auth(status.as_u16(), "authorization response carried no token")
            })?;

        store
            .save(&token)
            .map_err(|e| GistupError::persistence(store.location(), e.into_io()))?;
        tracing::info!(path = %store.location().display(), "Token saved");

        Ok(token)
    }
}
