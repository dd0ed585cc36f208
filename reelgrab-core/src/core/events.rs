use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum FetchStatus {
    Resolving,
    Resolved { strategy: String, media_url: String },
    Waiting,
    Retrieving,
    Complete { path: String, bytes: u64 },
    Error { kind: String, message: String },
}

impl FetchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchStatus::Complete { .. } | FetchStatus::Error { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchProgress {
    pub scope: String,
    pub source_url: String,
    pub platform: String,
    pub status: FetchStatus,
}

/// Receives lifecycle updates for a request. The messaging layer implements
/// this to pick up finished files.
pub trait EventEmitter: Send + Sync + Clone + 'static {
    fn emit_progress(&self, progress: &FetchProgress);
}
