//! Upload orchestration with a single re-authentication cycle
//!
//! [`Uploader::upload`] builds a client, attempts to create the gist and, when
//! the server rejects the cached token with 401, removes the token and tries
//! once more with freshly acquired credentials:
//!
//! ```text
//! START -> AUTHENTICATED -> OPERATION_ATTEMPTED -> DONE
//!              ^                    |
//!              +------ REAUTH <-----+ (first 401 only)
//! ```
//!
//! Everything else, including a second 401, ends the run.

use crate::auth::{CredentialPrompt, SecretStore, Terminal, TerminalReader, TokenStorage};
use crate::browser::{BrowserOpener, SystemBrowser};
use crate::client::{ClientBuilder, Gist, NewGist};
use crate::config::{ClientConfig, token_path};
use crate::error::{GistupError, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Re-authentication cycles allowed per run
pub const MAX_REAUTHENTICATIONS: u32 = 1;

/// Builder for [`Uploader`]
#[derive(Default)]
pub struct UploaderBuilder {
    config: Option<ClientConfig>,
    storage: Option<Arc<dyn SecretStore>>,
    terminal: Option<Arc<dyn TerminalReader>>,
    browser: Option<Arc<dyn BrowserOpener>>,
    cancellation_token: Option<CancellationToken>,
}

impl UploaderBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection configuration
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set custom token storage (default: file at [`token_path`])
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn SecretStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set the terminal used for credential prompts (default: [`Terminal`])
    #[must_use]
    pub fn terminal(mut self, terminal: Arc<dyn TerminalReader>) -> Self {
        self.terminal = Some(terminal);
        self
    }

    /// Set the browser opener (default: [`SystemBrowser`])
    #[must_use]
    pub fn browser(mut self, browser: Arc<dyn BrowserOpener>) -> Self {
        self.browser = Some(browser);
        self
    }

    /// Set the cancellation token shared with the interrupt listener
    #[must_use]
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the uploader
    ///
    /// # Errors
    ///
    /// Returns `GistupError::Config` if no storage was given and the default
    /// token path cannot be determined.
    pub fn build(self) -> Result<Uploader> {
        let config = self.config.unwrap_or_default();
        let storage: Arc<dyn SecretStore> = match self.storage {
            Some(storage) => storage,
            None => Arc::new(TokenStorage::with_path(token_path()?)),
        };
        let terminal = self.terminal.unwrap_or_else(|| Arc::new(Terminal));
        let browser = self.browser.unwrap_or_else(|| Arc::new(SystemBrowser));

        Ok(Uploader {
            clients: ClientBuilder::new(config, Arc::clone(&storage), CredentialPrompt::new(terminal)),
            storage,
            browser,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}

/// Creates gists, re-authenticating once when the cached token is rejected
pub struct Uploader {
    clients: ClientBuilder,
    storage: Arc<dyn SecretStore>,
    browser: Arc<dyn BrowserOpener>,
    cancellation_token: CancellationToken,
}

impl Uploader {
    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder() -> UploaderBuilder {
        UploaderBuilder::new()
    }

    /// Get the cancellation token observed by every blocking step
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Create the gist
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: client construction failures, any
    /// non-401 operation failure, a 401 after the re-authentication cycle has
    /// been used, or failure to remove the rejected token.
    pub async fn upload(&self, gist: &NewGist) -> Result<Gist> {
        let cancel = &self.cancellation_token;
        let mut reauthentications = 0;

        loop {
            let client = self.clients.build(cancel).await?;

            match client.create_gist(gist, cancel).await {
                Ok(created) => return Ok(created),
                Err(err)
                    if err.is_unauthorized()
                        && client.is_authenticated()
                        && reauthentications < MAX_REAUTHENTICATIONS =>
                {
                    // A token file that cannot be removed would be reloaded on
                    // the next pass, so this is fatal.
                    self.storage.invalidate().map_err(|e| {
                        GistupError::persistence(self.storage.location(), e.into_io())
                    })?;
                    reauthentications += 1;

                    tracing::warn!(error = %err, "Cached token rejected, re-authenticating");
                    eprintln!("Bad token. Authentication again.");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Create the gist and open it in the browser
    ///
    /// Falls back to printing the URL on stdout if the browser cannot be opened.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Uploader::upload`].
    pub async fn publish(&self, gist: &NewGist) -> Result<Gist> {
        let created = self.upload(gist).await?;

        if let Err(e) = self.browser.open(&created.html_url) {
            tracing::debug!("Could not open browser: {e}");
            println!("{}", created.html_url);
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Token, TokenError};
    use crate::config::parse_api_url;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// In-memory store that can refuse removal
    struct MemoryStore {
        token: Mutex<Option<Token>>,
        fail_invalidate: bool,
        invalidations: AtomicU32,
        path: PathBuf,
    }

    impl MemoryStore {
        fn new(token: Option<&str>, fail_invalidate: bool) -> Self {
            Self {
                token: Mutex::new(token.map(Token::from)),
                fail_invalidate,
                invalidations: AtomicU32::new(0),
                path: PathBuf::from("/memory/gistup/token"),
            }
        }
    }

    impl SecretStore for MemoryStore {
        fn load(&self) -> std::result::Result<Token, TokenError> {
            self.token.lock().unwrap().clone().ok_or(TokenError::NotFound)
        }

        fn save(&self, token: &Token) -> std::result::Result<(), TokenError> {
            *self.token.lock().unwrap() = Some(token.clone());
            Ok(())
        }

        fn invalidate(&self) -> std::result::Result<(), TokenError> {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
            if self.fail_invalidate {
                return Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied).into());
            }
            *self.token.lock().unwrap() = None;
            Ok(())
        }

        fn location(&self) -> &Path {
            &self.path
        }
    }

    struct FixedTerminal;

    impl TerminalReader for FixedTerminal {
        fn read_line(&self, _hint: &str) -> std::io::Result<String> {
            Ok("alice".to_string())
        }

        fn read_password(&self, _hint: &str) -> std::io::Result<String> {
            Ok("secret".to_string())
        }
    }

    #[derive(Default)]
    struct RecordingBrowser {
        opened: Mutex<Vec<String>>,
        fail: bool,
    }

    impl BrowserOpener for RecordingBrowser {
        fn open(&self, url: &str) -> std::io::Result<()> {
            self.opened.lock().unwrap().push(url.to_string());
            if self.fail {
                Err(std::io::Error::other("no browser"))
            } else {
                Ok(())
            }
        }
    }

    fn uploader(server: &MockServer, store: Arc<MemoryStore>, browser: Arc<RecordingBrowser>) -> Uploader {
        Uploader::builder()
            .config(
                ClientConfig::builder()
                    .api_url(parse_api_url(&server.uri()).unwrap())
                    .build(),
            )
            .storage(store)
            .terminal(Arc::new(FixedTerminal))
            .browser(browser)
            .build()
            .unwrap()
    }

    async fn mount_gist_created(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/gists"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"html_url": "https://gist.example.com/1"})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_publish_opens_browser() {
        let server = MockServer::start().await;
        mount_gist_created(&server).await;

        let store = Arc::new(MemoryStore::new(Some("tok-cached"), false));
        let browser = Arc::new(RecordingBrowser::default());
        let created = uploader(&server, store, Arc::clone(&browser))
            .publish(&NewGist::default())
            .await
            .unwrap();

        assert_eq!(created.html_url, "https://gist.example.com/1");
        assert_eq!(
            *browser.opened.lock().unwrap(),
            vec!["https://gist.example.com/1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_publish_succeeds_when_browser_fails() {
        let server = MockServer::start().await;
        mount_gist_created(&server).await;

        let store = Arc::new(MemoryStore::new(Some("tok-cached"), false));
        let browser = Arc::new(RecordingBrowser {
            fail: true,
            ..Default::default()
        });
        let result = uploader(&server, store, browser)
            .publish(&NewGist::default())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_invalidation_failure_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gists"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/authorizations"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"token": "tok-new"})))
            .expect(0)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new(Some("tok-expired"), true));
        let err = uploader(&server, Arc::clone(&store), Arc::new(RecordingBrowser::default()))
            .upload(&NewGist::default())
            .await
            .unwrap_err();

        assert!(matches!(err, GistupError::Persistence { .. }));
        assert_eq!(store.invalidations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_anonymous_unauthorized_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gists"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new(None, false));
        let uploader = Uploader::builder()
            .config(
                ClientConfig::builder()
                    .api_url(parse_api_url(&server.uri()).unwrap())
                    .anonymous(true)
                    .build(),
            )
            .storage(Arc::clone(&store) as Arc<dyn SecretStore>)
            .terminal(Arc::new(FixedTerminal))
            .browser(Arc::new(RecordingBrowser::default()))
            .build()
            .unwrap();

        let err = uploader.upload(&NewGist::default()).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(store.invalidations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_prompt_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let uploader = Uploader::builder()
            .config(
                ClientConfig::builder()
                    .api_url(parse_api_url(&server.uri()).unwrap())
                    .build(),
            )
            .storage(Arc::new(MemoryStore::new(None, false)))
            .terminal(Arc::new(FixedTerminal))
            .browser(Arc::new(RecordingBrowser::default()))
            .cancellation_token(cancel)
            .build()
            .unwrap();

        let err = uploader.upload(&NewGist::default()).await.unwrap_err();
        assert!(matches!(err, GistupError::PromptCancelled));
    }
}
