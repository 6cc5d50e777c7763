//! # gistup
//!
//! Upload files or standard input as a gist and open the result in a browser.
//!
//! The library holds every piece of the command-line tool so each can be
//! exercised in isolation:
//!
//! - [`auth`]: token persistence, credential prompt and token acquisition
//! - [`client`]: the gist API client and the authenticated client builder
//! - [`upload`]: the upload loop with a single re-authentication cycle
//! - [`config`]: connection configuration and on-disk locations
//! - [`input`]: turning paths or stdin into a gist request
//! - [`browser`]: opening the created gist
//!
//! ## Quick Start
//!
//! ```no_run
//! use gistup::{ClientConfig, Uploader, input};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let files = input::read_files(&[std::path::PathBuf::from("README.md")])?;
//!     let gist = input::new_gist(files, Some("Project readme".to_string()), false);
//!
//!     let uploader = Uploader::builder()
//!         .config(ClientConfig::default())
//!         .build()?;
//!     let created = uploader.publish(&gist).await?;
//!     println!("{}", created.html_url);
//!     Ok(())
//! }
//! ```
//!
//! ## Token lifecycle
//!
//! The first authenticated run prompts for a username and password on the
//! controlling terminal and exchanges them for a `gist`-scoped token, which is
//! saved to `~/.config/gistup/token` (`%APPDATA%\gistup\token` on Windows) with
//! owner-only permissions. Later runs reuse it. If the server answers 401 the
//! token is deleted and the user is prompted once more; a second rejection
//! ends the run.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod browser;
pub mod client;
pub mod config;
pub mod error;
pub mod input;
pub mod upload;

// Re-export commonly used types
pub use auth::{CredentialPrompt, Credentials, SecretStore, Token, TokenAcquirer, TokenStorage};
pub use browser::{BrowserOpener, SystemBrowser};
pub use client::{ClientBuilder, Gist, GistClient, GistFile, NewGist};
pub use config::{ClientConfig, Settings};
pub use error::{GistupError, Result};
pub use upload::{MAX_REAUTHENTICATIONS, Uploader, UploaderBuilder};

/// Version of gistup
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
