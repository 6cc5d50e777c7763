//! Gist API client and the authenticated client builder
//!
//! [`ClientBuilder`] turns a [`ClientConfig`] into a [`GistClient`], either
//! anonymous or bound to a bearer token. A cached token is reused; otherwise
//! the user is prompted and a fresh token is acquired and persisted.

use crate::auth::{CredentialPrompt, SecretStore, Token, TokenAcquirer, TokenError};
use crate::config::ClientConfig;
use crate::error::{GistupError, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Path of the gist creation endpoint, relative to the API base
pub const GISTS_PATH: &str = "gists";

/// One file of a gist
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GistFile {
    /// File contents
    pub content: String,
}

/// Request body for creating a gist
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewGist {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the gist is public
    pub public: bool,
    /// Files keyed by name
    pub files: BTreeMap<String, GistFile>,
}

/// A created gist
#[derive(Debug, Clone, Deserialize)]
pub struct Gist {
    /// Gist identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Browser URL of the gist
    pub html_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Status and body of a completed HTTP exchange
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Send a request and read its body, aborting if `cancel` fires
pub(crate) async fn execute(
    request: reqwest::RequestBuilder,
    cancel: &CancellationToken,
    transport_error: impl FnOnce(reqwest::Error) -> GistupError,
) -> Result<RawResponse> {
    let exchange = async {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok::<_, reqwest::Error>(RawResponse { status, body })
    };

    tokio::select! {
        () = cancel.cancelled() => Err(GistupError::Interrupted),
        result = exchange => result.map_err(transport_error),
    }
}

/// Human-readable failure text: the API's `message` field, else the raw body
pub(crate) fn describe_failure(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string());
    if detail.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {detail}")
    }
}

/// Client for the gist creation endpoint
#[derive(Debug, Clone)]
pub struct GistClient {
    http_client: reqwest::Client,
    gists_url: Url,
    token: Option<Token>,
}

impl GistClient {
    /// Create a client; `token` of `None` means anonymous
    #[must_use]
    pub fn new(http_client: reqwest::Client, gists_url: Url, token: Option<Token>) -> Self {
        Self {
            http_client,
            gists_url,
            token,
        }
    }

    /// Whether requests carry a bearer token
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Create a gist
    ///
    /// # Errors
    ///
    /// Returns `GistupError::OperationUnauthorized` on 401, `GistupError::Interrupted`
    /// if cancelled, and `GistupError::Operation` for any other failure.
    pub async fn create_gist(&self, gist: &NewGist, cancel: &CancellationToken) -> Result<Gist> {
        let mut request = self.http_client.post(self.gists_url.clone()).json(gist);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, token.authorization_header());
        }

        tracing::debug!(
            url = %self.gists_url,
            files = gist.files.len(),
            authenticated = self.is_authenticated(),
            "Creating gist"
        );
        let response = execute(request, cancel, |e| {
            GistupError::operation(format!("POST {}: {e}", self.gists_url))
        })
        .await?;

        if response.status == StatusCode::UNAUTHORIZED {
            return Err(GistupError::OperationUnauthorized(describe_failure(
                response.status,
                &response.body,
            )));
        }
        if !response.status.is_success() {
            return Err(GistupError::operation(format!(
                "POST {}: {}",
                self.gists_url,
                describe_failure(response.status, &response.body)
            )));
        }

        serde_json::from_str(&response.body).map_err(|e| {
            GistupError::operation(format!("invalid gist response from {}: {e}", self.gists_url))
        })
    }
}

/// Produces [`GistClient`]s, acquiring a token when none is cached
#[derive(Clone)]
pub struct ClientBuilder {
    config: ClientConfig,
    store: Arc<dyn SecretStore>,
    prompt: CredentialPrompt,
}

impl ClientBuilder {
    /// Create a builder over the given configuration and collaborators
    pub fn new(config: ClientConfig, store: Arc<dyn SecretStore>, prompt: CredentialPrompt) -> Self {
        Self {
            config,
            store,
            prompt,
        }
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build a client, prompting and acquiring a token if none is cached
    ///
    /// # Errors
    ///
    /// Returns configuration, prompt, authorization or persistence errors. An
    /// unreadable token file is fatal rather than a reason to prompt.
    pub async fn build(&self, cancel: &CancellationToken) -> Result<GistClient> {
        let http_client = self.config.http_client()?;
        let gists_url = self.config.endpoint(GISTS_PATH)?;

        if self.config.anonymous {
            tracing::debug!("Anonymous mode, skipping authentication");
            return Ok(GistClient::new(http_client, gists_url, None));
        }

        let token = match self.store.load() {
            Ok(token) => {
                tracing::debug!("Using cached token");
                token
            }
            Err(TokenError::NotFound) => {
                tracing::debug!("No cached token found");
                self.acquire(cancel).await?
            }
            Err(e) => return Err(GistupError::persistence(self.store.location(), e.into_io())),
        };

        Ok(GistClient::new(http_client, gists_url, Some(token)))
    }

    async fn acquire(&self, cancel: &CancellationToken) -> Result<Token> {
        let credentials = self.prompt.prompt(cancel).await?;
        TokenAcquirer::new(&self.config)?
            .acquire(&credentials, self.store.as_ref(), cancel)
            .await
    }
}
