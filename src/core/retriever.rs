use std::path::Path;

use async_trait::async_trait;

use reelgrab_core::models::media::RetrievalOutcome;

use crate::core::error::FetchError;

/// Fetches a resolved media link into `output`. On failure nothing is left at
/// `output` or next to it.
#[async_trait]
pub trait Retriever: Send + Sync {
    fn name(&self) -> &str;
    async fn retrieve(&self, media_url: &str, output: &Path) -> Result<RetrievalOutcome, FetchError>;
}
