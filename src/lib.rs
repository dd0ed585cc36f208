use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

pub mod core;
pub mod models;
pub mod platforms;
pub mod storage;

use crate::core::direct_downloader::DirectRetriever;
use crate::core::error::FetchError;
use crate::core::gate::ConcurrencyGate;
use crate::core::orchestrator::FallbackOrchestrator;
use crate::core::workspace::WorkspaceAllocator;
use crate::core::ytdlp::{self, YtdlpRetriever};
use crate::models::settings::AppSettings;

/// Everything a request needs, built once at startup and shared by every task.
pub struct AppState {
    pub settings: AppSettings,
    pub orchestrator: FallbackOrchestrator,
    pub gate: ConcurrencyGate,
    pub workspace: WorkspaceAllocator,
    pub direct: Arc<DirectRetriever>,
    pub ytdlp: Option<Arc<YtdlpRetriever>>,
}

impl AppState {
    pub fn new(settings: AppSettings, ytdlp_binary: Option<PathBuf>) -> Result<Self, FetchError> {
        let ytdlp = ytdlp_binary.map(|bin| Arc::new(YtdlpRetriever::new(bin, &settings)));
        Ok(Self {
            orchestrator: FallbackOrchestrator::from_settings(&settings)?,
            gate: ConcurrencyGate::new(settings.advanced.max_concurrent_downloads as usize),
            workspace: WorkspaceAllocator::new(settings.download.workspace_dir.clone()),
            direct: Arc::new(DirectRetriever::new(&settings)?),
            ytdlp,
            settings,
        })
    }

    /// Like [`AppState::new`], but looks for yt-dlp first. Without it, YouTube
    /// links fail with `ToolUnavailable` and every other platform still works.
    pub async fn from_settings(settings: AppSettings) -> Result<Self, FetchError> {
        let binary = ytdlp::find_ytdlp(settings.ytdlp.binary.as_deref()).await;
        match &binary {
            Some(path) => tracing::info!("yt-dlp found at {}", path.display()),
            None => tracing::warn!("yt-dlp not found, YouTube Shorts are disabled"),
        }
        Self::new(settings, binary)
    }
}

pub fn init_logging(debug: bool) {
    let default = if debug {
        "debug,reelgrab=debug"
    } else {
        "info,reelgrab=info"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
