//! Interactive username/password prompt that honors cancellation

use crate::error::{GistupError, Result};
use std::io;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Username and password held for one acquisition attempt
#[derive(Clone)]
pub struct Credentials {
    /// Account name, echoed while typed
    pub username: String,
    /// Account password, never echoed
    pub password: String,
}

impl Credentials {
    /// Create a credential pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Blocking terminal input port
///
/// Implementations may block indefinitely; [`CredentialPrompt`] runs them on a
/// dedicated thread so a pending read never holds up shutdown.
pub trait TerminalReader: Send + Sync + 'static {
    /// Read a line with echo
    ///
    /// # Errors
    /// Returns error if the terminal cannot be read
    fn read_line(&self, hint: &str) -> io::Result<String>;

    /// Read a line without echo
    ///
    /// # Errors
    /// Returns error if the terminal cannot be read
    fn read_password(&self, hint: &str) -> io::Result<String>;
}

/// Controlling-terminal reader
///
/// The username is read from `/dev/tty` when available so prompting still works
/// while standard input carries the upload. Passwords go through `dialoguer`,
/// which disables echo on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct Terminal;

impl TerminalReader for Terminal {
    fn read_line(&self, hint: &str) -> io::Result<String> {
        #[cfg(unix)]
        if let Ok(tty) = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/tty")
        {
            use std::io::{BufRead, Write};

            let mut out = &tty;
            write!(out, "{hint}: ")?;
            out.flush()?;

            let mut line = String::new();
            if io::BufReader::new(&tty).read_line(&mut line)? == 0 {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
            }
            return Ok(line.trim_end_matches(['\r', '\n']).to_string());
        }

        dialoguer::Input::<String>::new()
            .with_prompt(hint)
            .allow_empty(true)
            .interact_text()
            .map_err(io::Error::other)
    }

    fn read_password(&self, hint: &str) -> io::Result<String> {
        dialoguer::Password::new()
            .with_prompt(hint)
            .allow_empty_password(true)
            .interact()
            .map_err(io::Error::other)
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Username,
    Password,
}

impl Field {
    fn hint(self) -> &'static str {
        match self {
            Field::Username => "Username",
            Field::Password => "Password",
        }
    }
}

/// Credential prompt over a [`TerminalReader`]
#[derive(Clone)]
pub struct CredentialPrompt {
    terminal: Arc<dyn TerminalReader>,
}

impl CredentialPrompt {
    /// Create a prompt reading from the given terminal
    pub fn new(terminal: Arc<dyn TerminalReader>) -> Self {
        Self { terminal }
    }

    /// Ask for a username and then a password
    ///
    /// # Errors
    ///
    /// Returns `GistupError::PromptCancelled` if `cancel` fires before both
    /// values are read, or `GistupError::PromptIo` if the terminal fails.
    pub async fn prompt(&self, cancel: &CancellationToken) -> Result<Credentials> {
        let username = self.read_field(Field::Username, cancel).await?;
        let password = self.read_field(Field::Password, cancel).await?;
        Ok(Credentials::new(username, password))
    }

    async fn read_field(&self, field: Field, cancel: &CancellationToken) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(GistupError::PromptCancelled);
        }

        let (value_tx, mut value_rx) = oneshot::channel::<String>();
        let (error_tx, mut error_rx) = oneshot::channel::<io::Error>();
        let terminal = Arc::clone(&self.terminal);

        // A plain thread rather than spawn_blocking: a read stuck on the
        // terminal must not keep the runtime alive at shutdown.
        std::thread::Builder::new()
            .name("gistup-prompt".to_string())
            .spawn(move || {
                let read = match field {
                    Field::Username => terminal.read_line(field.hint()),
                    Field::Password => terminal.read_password(field.hint()),
                };
                // Receivers are gone if the prompt was cancelled
                match read {
                    Ok(value) => {
                        let _ = value_tx.send(value);
                    }
                    Err(e) => {
                        let _ = error_tx.send(e);
                    }
                }
            })
            .map_err(GistupError::PromptIo)?;

        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                tracing::debug!(?field, "Prompt cancelled");
                Err(GistupError::PromptCancelled)
            }
            value = &mut value_rx => match value {
                Ok(value) => Ok(value),
                Err(_) => Err(Self::reader_error(error_rx.await)),
            },
            error = &mut error_rx => match error {
                Ok(e) => Err(GistupError::PromptIo(e)),
                Err(_) => value_rx.await.map_err(|_| Self::reader_error(Err(()))),
            },
        }
    }

    fn reader_error<E>(error: std::result::Result<io::Error, E>) -> GistupError {
        GistupError::PromptIo(
            error.unwrap_or_else(|_| io::Error::other("terminal reader exited without a result")),
        )
    }
}
