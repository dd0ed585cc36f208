use async_trait::async_trait;

use crate::core::error::FetchError;

/// One way of turning a post link into a direct media link.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &str;
    async fn resolve(&self, source_url: &str) -> Result<String, FetchError>;
}
