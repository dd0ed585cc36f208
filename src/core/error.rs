use std::path::PathBuf;

use reelgrab_core::platforms::Platform;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("link is not from a supported platform: {0}")]
    Unrecognized(String),

    #[error("{provider}: session token not found on entry page")]
    TokenNotFound { provider: String },

    #[error("{provider}: obfuscated payload could not be decoded")]
    DecodeFailure { provider: String },

    #[error("{provider}: no media link found in response")]
    NoMediaUrlFound { provider: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("response does not look like media (content-type {content_type:?}, {bytes:?} bytes)")]
    ContentImplausible {
        content_type: Option<String>,
        bytes: Option<u64>,
    },

    #[error("file is {bytes} bytes, limit is {limit}")]
    SizeExceeded { bytes: u64, limit: u64 },

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("external downloader unavailable: {0}")]
    ToolUnavailable(String),

    #[error("invalid media link: {0}")]
    InvalidUrl(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("http client setup failed: {0}")]
    ClientSetup(String),

    #[error("download slots are closed")]
    GateClosed,

    #[error("every strategy for {platform} failed ({attempted} tried), last: {last}")]
    Exhausted {
        platform: Platform,
        attempted: usize,
        last: Box<FetchError>,
    },

    #[error("download failed after {attempts} attempts: {last}")]
    RetrievalFailed { attempts: u32, last: Box<FetchError> },
}

impl FetchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }

    /// Failures that another attempt against the same link cannot fix.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FetchError::SizeExceeded { .. }
                | FetchError::InvalidUrl(_)
                | FetchError::Io { .. }
                | FetchError::GateClosed
                | FetchError::ToolUnavailable(_)
                | FetchError::ClientSetup(_)
        )
    }

    /// Short machine-friendly tag, used in log lines and emitted events.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Unrecognized(_) => "unrecognized",
            FetchError::TokenNotFound { .. } => "token_not_found",
            FetchError::DecodeFailure { .. } => "decode_failure",
            FetchError::NoMediaUrlFound { .. } => "no_media_url",
            FetchError::Network(_) => "network",
            FetchError::Status { .. } => "status",
            FetchError::ContentImplausible { .. } => "content_implausible",
            FetchError::SizeExceeded { .. } => "size_exceeded",
            FetchError::Timeout(_) => "timeout",
            FetchError::ToolUnavailable(_) => "tool_unavailable",
            FetchError::InvalidUrl(_) => "invalid_url",
            FetchError::Io { .. } => "io",
            FetchError::ClientSetup(_) => "client_setup",
            FetchError::GateClosed => "gate_closed",
            FetchError::Exhausted { .. } => "exhausted",
            FetchError::RetrievalFailed { .. } => "retrieval_failed",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}
