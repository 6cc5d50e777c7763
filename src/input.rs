//! Collecting gist files from paths or standard input

use crate::client::{GistFile, NewGist};
use crate::error::{GistupError, Result};
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Read every path into a file map keyed by the path's final component
///
/// # Errors
///
/// Returns `GistupError::Input` if a file cannot be read, has no file name,
/// or shares its name with an earlier path.
pub fn read_files(paths: &[PathBuf]) -> Result<BTreeMap<String, GistFile>> {
    let mut files = BTreeMap::new();
    for path in paths {
        let name = file_name(path)?;
        let content =
            std::fs::read_to_string(path).map_err(|e| GistupError::input(path.as_path(), e))?;

        if files.insert(name.clone(), GistFile { content }).is_some() {
            return Err(GistupError::input(
                path.as_path(),
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("duplicate file name {name:?}"),
                ),
            ));
        }
    }
    Ok(files)
}

/// Read all of `reader` into a single file called `name`
///
/// # Errors
///
/// Returns `GistupError::Input` if reading fails.
pub fn read_stdin(mut reader: impl Read, name: &str) -> Result<BTreeMap<String, GistFile>> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|e| GistupError::input("<stdin>", e))?;

    Ok(BTreeMap::from([(name.to_string(), GistFile { content })]))
}

/// Assemble the request body
#[must_use]
pub fn new_gist(
    files: BTreeMap<String, GistFile>,
    description: Option<String>,
    public: bool,
) -> NewGist {
    NewGist {
        description: description.filter(|d| !d.is_empty()),
        public,
        files,
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            GistupError::input(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_files_uses_base_name() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("docs");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("notes.md"), "hello").unwrap();
        std::fs::write(temp_dir.path().join("main.rs"), "fn main() {}").unwrap();

        let files = read_files(&[nested.join("notes.md"), temp_dir.path().join("main.rs")]).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files["notes.md"].content, "hello");
        assert_eq!(files["main.rs"].content, "fn main() {}");
    }

    #[test]
    fn test_read_files_missing() {
        let temp_dir = TempDir::new().unwrap();
        let err = read_files(&[temp_dir.path().join("absent.txt")]).unwrap_err();
        assert!(matches!(err, GistupError::Input { .. }));
    }

    #[test]
    fn test_read_files_duplicate_names() {
        let temp_dir = TempDir::new().unwrap();
        for dir in ["a", "b"] {
            let dir = temp_dir.path().join(dir);
            std::fs::create_dir(&dir).unwrap();
            std::fs::write(dir.join("same.txt"), dir.display().to_string()).unwrap();
        }

        let err = read_files(&[
            temp_dir.path().join("a").join("same.txt"),
            temp_dir.path().join("b").join("same.txt"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate file name"));
    }

    #[test]
    fn test_read_stdin() {
        let files = read_stdin("piped text\n".as_bytes(), "paste.txt").unwrap();
        assert_eq!(files["paste.txt"].content, "piped text\n");
    }

    #[test]
    fn test_new_gist_drops_empty_description() {
        let gist = new_gist(BTreeMap::new(), Some(String::new()), true);
        assert!(gist.description.is_none());
        assert!(gist.public);
    }
}
