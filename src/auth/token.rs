//! Token storage for the persisted access token

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during token storage operations
#[derive(Debug, Error)]
pub enum TokenError {
    /// Token not found in storage
    #[error("Token not found")]
    NotFound,

    /// I/O error during storage operations
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TokenError {
    /// Convert into an I/O error for reporting
    #[must_use]
    pub fn into_io(self) -> std::io::Error {
        match self {
            Self::NotFound => std::io::Error::from(ErrorKind::NotFound),
            Self::Io(e) => e,
        }
    }
}

/// Opaque bearer token
///
/// The value never appears in `Debug` output so tokens cannot leak into logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wrap a raw token value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the raw token value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the `Authorization` header value for API calls
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("token {}", self.0)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Persistence port for the single cached token
///
/// [`TokenStorage`] is the file-backed implementation; tests substitute their own.
pub trait SecretStore: Send + Sync {
    /// Load the persisted token
    ///
    /// # Errors
    ///
    /// Returns `TokenError::NotFound` when nothing is stored, which callers treat
    /// as "must acquire" rather than as a failure.
    fn load(&self) -> Result<Token, TokenError>;

    /// Persist a token, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be written.
    fn save(&self, token: &Token) -> Result<(), TokenError>;

    /// Remove the persisted token
    ///
    /// # Errors
    ///
    /// Returns an error if a token exists but cannot be removed.
    fn invalidate(&self) -> Result<(), TokenError>;

    /// Where the token lives, for error reporting
    fn location(&self) -> &Path;
}

/// File-backed token storage with owner-only permissions
#[derive(Debug, Clone)]
pub struct TokenStorage {
    storage_path: PathBuf,
}

impl TokenStorage {
    /// Create token storage at the given path
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { storage_path: path }
    }

    /// Get the storage path
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.storage_path
    }

    fn create_parent(&self) -> std::io::Result<()> {
        let Some(parent) = self.storage_path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() {
            return Ok(());
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(parent)
    }
}

impl SecretStore for TokenStorage {
    fn load(&self) -> Result<Token, TokenError> {
        let content = match fs::read_to_string(&self.storage_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(TokenError::NotFound),
            Err(e) => return Err(e.into()),
        };

        if content.is_empty() {
            tracing::debug!(path = %self.storage_path.display(), "Token file is empty");
            return Err(TokenError::NotFound);
        }

        Ok(Token::new(content))
    }

    fn save(&self, token: &Token) -> Result<(), TokenError> {
        self.create_parent()?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.storage_path)?;
        file.write_all(token.as_str().as_bytes())?;
        file.sync_all()?;

        // mode() only applies on creation; tighten a pre-existing file too
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.storage_path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn invalidate(&self) -> Result<(), TokenError> {
        match fs::remove_file(&self.storage_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn location(&self) -> &Path {
        &self.storage_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::new("tok-123");
        assert_eq!(format!("{token:?}"), "Token(<redacted>)");
        assert_eq!(token.authorization_header(), "token tok-123");
    }

    #[test]
    fn test_token_storage_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let storage = TokenStorage::with_path(temp_dir.path().join("gistup").join("token"));

        storage.save(&Token::new("tok-123")).unwrap();
        assert_eq!(storage.load().unwrap().as_str(), "tok-123");

        // Raw bytes, no framing
        let raw = fs::read(storage.path()).unwrap();
        assert_eq!(raw, b"tok-123");
    }

    #[test]
    fn test_save_load_preserves_whitespace() {
        let temp_dir = TempDir::new().unwrap();
        let storage = TokenStorage::with_path(temp_dir.path().join("token"));

        for value in [" tok-lead", "tok-trail\n", "\ttok-both \r\n", "   "] {
            storage.save(&Token::new(value)).unwrap();
            assert_eq!(storage.load().unwrap().as_str(), value, "token {value:?}");
        }
    }

    #[test]
    fn test_load_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = TokenStorage::with_path(temp_dir.path().join("token"));
        storage.save(&Token::new("tok-abc")).unwrap();

        let first = storage.load().unwrap();
        let second = storage.load().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_save_overwrites_previous_token() {
        let temp_dir = TempDir::new().unwrap();
        let storage = TokenStorage::with_path(temp_dir.path().join("token"));

        storage.save(&Token::new("a-much-longer-first-token")).unwrap();
        storage.save(&Token::new("short")).unwrap();
        assert_eq!(storage.load().unwrap().as_str(), "short");
    }

    #[cfg(unix)]
    #[test]
    fn test_save_uses_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("gistup");
        let storage = TokenStorage::with_path(dir.join("token"));
        storage.save(&Token::new("tok-123")).unwrap();

        let file_mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
        let dir_mode = fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_tightens_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        TokenStorage::with_path(path.clone())
            .save(&Token::new("new"))
            .unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_save_fails_when_parent_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("gistup");
        fs::write(&blocker, "not a directory").unwrap();

        let storage = TokenStorage::with_path(blocker.join("token"));
        assert!(matches!(
            storage.save(&Token::new("tok")),
            Err(TokenError::Io(_))
        ));
    }

    #[test]
    fn test_token_storage_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let storage = TokenStorage::with_path(temp_dir.path().join("nonexistent"));
        assert!(matches!(storage.load(), Err(TokenError::NotFound)));
    }

    #[test]
    fn test_empty_file_counts_as_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token");
        fs::write(&path, "").unwrap();

        let storage = TokenStorage::with_path(path);
        assert!(matches!(storage.load(), Err(TokenError::NotFound)));
    }

    #[test]
    fn test_invalidate_removes_token() {
        let temp_dir = TempDir::new().unwrap();
        let storage = TokenStorage::with_path(temp_dir.path().join("token"));
        storage.save(&Token::new("tok-expired")).unwrap();

        storage.invalidate().unwrap();
        assert!(!storage.path().exists());
        assert!(matches!(storage.load(), Err(TokenError::NotFound)));

        // Already gone is fine
        storage.invalidate().unwrap();
    }

    #[test]
    fn test_invalidate_fails_on_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token");
        fs::create_dir(&path).unwrap();

        let storage = TokenStorage::with_path(path);
        assert!(matches!(storage.invalidate(), Err(TokenError::Io(_))));
    }
}
