//! gistup command-line entry point
//!
//! Run with:
//!   gistup -d "build log" build.log
//!   make 2>&1 | gistup -n make.log -p

use anyhow::Context;
use clap::Parser;
use gistup::config::{ClientConfig, Settings, settings_path};
use gistup::{Uploader, input};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Upload files or standard input as a gist
#[derive(Parser, Debug)]
#[command(name = "gistup", version)]
#[command(about = "Upload files or standard input as a gist and open it in the browser")]
#[command(after_help = "\
The token is saved in the following file and the user name and password \
entry is skipped from next time:
  ~/.config/gistup/token   (%APPDATA%\\gistup\\token on Windows)")]
struct Args {
    /// Create an anonymous gist
    #[arg(short = 'a', long)]
    anonymous: bool,

    /// Description of the gist
    #[arg(short = 'd', long)]
    description: Option<String>,

    /// Allow connections to TLS sites without valid certificates
    #[arg(long, env = "GISTUP_INSECURE", value_parser = clap::builder::FalseyValueParser::new())]
    insecure: bool,

    /// File name used when uploading standard input
    #[arg(short = 'n', long = "name", default_value = "")]
    stdin_name: String,

    /// Create a public gist
    #[arg(short = 'p', long)]
    public: bool,

    /// Base URL of the API, for GitHub Enterprise
    #[arg(long = "url", env = "GISTUP_API_URL")]
    api_url: Option<String>,

    /// Files to upload; standard input is read when none are given
    files: Vec<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_stdin(name: &str) -> anyhow::Result<gistup::client::NewGist> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprintln!("Reading from standard input; finish with Ctrl-D");
    }
    let files = input::read_stdin(stdin.lock(), name).context("reading standard input")?;
    Ok(input::new_gist(files, None, false))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut gist = if args.files.is_empty() {
        read_stdin(&args.stdin_name)?
    } else {
        input::new_gist(input::read_files(&args.files)?, None, false)
    };
    gist.description = args.description.filter(|d| !d.is_empty());
    gist.public = args.public;

    // Interrupts cancel whatever is pending: the prompt or a network call
    let cancel = CancellationToken::new();
    let listener = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupt received");
            listener.cancel();
        }
    });

    let settings = Settings::load(&settings_path()?)?;
    let config = ClientConfig::resolve(
        args.api_url.as_deref(),
        args.insecure,
        args.anonymous,
        &settings,
    )?;

    let uploader = Uploader::builder()
        .config(config)
        .cancellation_token(cancel)
        .build()?;
    uploader.publish(&gist).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let interrupted = err
                .downcast_ref::<gistup::GistupError>()
                .is_some_and(gistup::GistupError::is_interrupt);
            if interrupted {
                eprintln!();
            } else {
                eprintln!("gistup: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
