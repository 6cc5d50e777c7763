//! Credential lifecycle for gistup
//!
//! Provides token persistence, interactive credential entry and token
//! acquisition from the authorization endpoint.
//!
//! # Overview
//!
//! 1. Load the cached token from [`TokenStorage`]
//! 2. If none is cached, read a username and password with [`CredentialPrompt`]
//! 3. Exchange them for a `gist`-scoped token with [`TokenAcquirer`]
//! 4. Persist the token before it is used
//!
//! # Example
//!
//! ```no_run
//! use gistup::auth::{CredentialPrompt, SecretStore, Terminal, TokenAcquirer, TokenStorage};
//! use gistup::config::{ClientConfig, token_path};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cancel = CancellationToken::new();
//!     let storage = TokenStorage::with_path(token_path()?);
//!
//!     let credentials = CredentialPrompt::new(Arc::new(Terminal)).prompt(&cancel).await?;
//!     let token = TokenAcquirer::new(&ClientConfig::default())?
//!         .acquire(&credentials, &storage, &cancel)
//!         .await?;
//!
//!     assert_eq!(storage.load()?, token);
//!     Ok(())
//! }
//! ```
//!
//! # Security
//!
//! - Tokens are stored with user-only permissions (600) in a 700 directory
//! - Passwords are read without echo and never persisted
//! - Basic credentials are only ever sent to the authorization endpoint

mod authorization;
mod prompt;
mod token;

pub use authorization::{
    AUTHORIZATION_NOTE, AUTHORIZATIONS_PATH, AuthorizationRequest, GIST_SCOPE, TokenAcquirer,
};
pub use prompt::{CredentialPrompt, Credentials, Terminal, TerminalReader};
pub use token::{SecretStore, Token, TokenError, TokenStorage};
