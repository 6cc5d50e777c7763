//! Opening the created gist in a browser

use std::io;
use std::process::Command;

/// Process-runner port for showing a URL to the user
pub trait BrowserOpener: Send + Sync {
    /// Open `url`
    ///
    /// # Errors
    /// Returns error if the opener cannot be started or exits unsuccessfully
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Opens URLs with the platform's default handler
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl SystemBrowser {
    fn command(url: &str) -> Command {
        let (program, args): (&str, &[&str]) = if cfg!(target_os = "macos") {
            ("open", &[])
        } else if cfg!(target_os = "windows") {
            ("rundll32.exe", &["url.dll,FileProtocolHandler"])
        } else {
            ("xdg-open", &[])
        };

        let mut cmd = Command::new(program);
        cmd.args(args).arg(url);
        cmd
    }
}

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        let mut cmd = Self::command(url);
        let status = cmd.status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "{} exited with {status}",
                cmd.get_program().to_string_lossy()
            )))
        }
    }
}
