//! Command-line front end. Links come from arguments or from stdin lines of
//! `<scope> <message text>`; progress goes to stdout as JSON lines.
//!
//! Ctrl-C is a CLI-only shutdown: it closes the download gate, so requests still
//! waiting for a slot fail with `GateClosed` while running downloads finish. The
//! library itself never cancels a request beyond its timeouts.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use reelgrab_lib::core::events::JsonLinesEmitter;
use reelgrab_lib::core::paths;
use reelgrab_lib::core::pipeline::fetch_media;
use reelgrab_lib::core::url_parser::extract_link;
use reelgrab_lib::models::media::MediaRequest;
use reelgrab_lib::platforms::is_long_form_youtube;
use reelgrab_lib::storage::config;
use reelgrab_lib::AppState;

/// Resolve social media post links into local video files.
#[derive(Debug, Parser)]
#[command(name = "reelgrab", version)]
#[command(about = "Resolve Instagram, TikTok, X, Facebook and YouTube Shorts links into local video files", long_about = None)]
struct Cli {
    /// Post links. With none, lines of `<scope> <message text>` are read from stdin.
    urls: Vec<String>,

    /// Requester scope for links given as arguments.
    #[arg(long, default_value = "cli")]
    scope: String,

    /// Settings file (JSON). Defaults to the per-user data directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum simultaneous downloads.
    #[arg(long)]
    concurrent: Option<u32>,

    /// Root directory for downloaded files.
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Verbose logging.
    #[arg(long)]
    debug: bool,

    /// Print the effective settings as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Write the effective settings to the settings file and exit.
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    reelgrab_lib::init_logging(cli.debug);

    let config_path = cli.config.clone().unwrap_or_else(paths::default_settings_path);
    let mut settings = config::load_settings(&config_path);
    if let Some(n) = cli.concurrent {
        settings.advanced.max_concurrent_downloads = n;
    }
    if let Some(dir) = cli.workspace.clone() {
        settings.download.workspace_dir = dir;
    }

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }
    if cli.init_config {
        config::save_settings(&config_path, &settings)?;
        tracing::info!("settings written to {}", config_path.display());
        return Ok(());
    }

    let requests = if cli.urls.is_empty() {
        read_stdin_requests().await?
    } else {
        cli.urls
            .iter()
            .filter_map(|text| request_from_text(&cli.scope, text))
            .collect()
    };

    if requests.is_empty() {
        tracing::warn!("no supported links given");
        std::process::exit(2);
    }

    let state = Arc::new(AppState::from_settings(settings).await?);
    let emitter = JsonLinesEmitter::stdout();

    let gate = state.gate.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, no new downloads will start");
            gate.close();
        }
    });

    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let state = state.clone();
            let emitter = emitter.clone();
            tokio::spawn(async move { fetch_media(&state, &request, &emitter).await.is_ok() })
        })
        .collect();

    let mut failed = 0usize;
    for handle in handles {
        match handle.await {
            Ok(true) => {}
            Ok(false) => failed += 1,
            Err(e) => {
                tracing::error!("request task panicked: {}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        tracing::warn!("{} request(s) failed", failed);
        std::process::exit(1);
    }
    Ok(())
}

fn request_from_text(scope: &str, text: &str) -> Option<MediaRequest> {
    if is_long_form_youtube(text.trim()) {
        tracing::warn!("only YouTube Shorts are supported: {}", text.trim());
        return None;
    }
    match extract_link(text).and_then(|link| MediaRequest::new(link, scope)) {
        Some(request) => Some(request),
        None => {
            tracing::warn!("no supported link in: {}", text.trim());
            None
        }
    }
}

async fn read_stdin_requests() -> Result<Vec<MediaRequest>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut requests = Vec::new();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((scope, text)) = line.split_once(char::is_whitespace) else {
            tracing::warn!("expected `<scope> <text>`, got: {}", line);
            continue;
        };
        if let Some(request) = request_from_text(scope, text) {
            requests.push(request);
        }
    }
    Ok(requests)
}
