use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::platforms::Platform;

/// One incoming link, tagged with its platform and the scope that asked for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRequest {
    source_url: String,
    platform: Platform,
    scope: String,
}

impl MediaRequest {
    /// Builds a request for a link. Returns `None` for links no platform claims.
    pub fn new(source_url: impl Into<String>, scope: impl Into<String>) -> Option<Self> {
        let source_url = source_url.into();
        let platform = Platform::from_url(&source_url)?;
        Some(Self {
            source_url,
            platform,
            scope: scope.into(),
        })
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub media_url: String,
    pub strategy: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    pub local_path: PathBuf,
    pub byte_size: u64,
    pub content_type: Option<String>,
}
