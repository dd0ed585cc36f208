use async_trait::async_trait;

use crate::core::error::FetchError;
use crate::platforms::traits::ExtractionStrategy;

/// Shorts need no resolver site: the external downloader takes the post link
/// as is. The link is only reduced to its canonical form.
#[derive(Debug, Default)]
pub struct ShortsPassthrough;

impl ShortsPassthrough {
    fn extract_video_id(url: &str) -> Option<String> {
        let parsed = url::Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_lowercase();
        if !host.ends_with("youtube.com") {
            return None;
        }

        let segments: Vec<&str> = parsed.path().split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            ["shorts", id, ..] if id.len() == 11 => Some(id.to_string()),
            _ => None,
        }
    }
}

#[async_trait]
impl ExtractionStrategy for ShortsPassthrough {
    fn name(&self) -> &str {
        "youtube_shorts"
    }

    async fn resolve(&self, source_url: &str) -> Result<String, FetchError> {
        let id = Self::extract_video_id(source_url)
            .ok_or_else(|| FetchError::Unrecognized(source_url.to_string()))?;
        Ok(format!("https://www.youtube.com/shorts/{}", id))
    }
}
