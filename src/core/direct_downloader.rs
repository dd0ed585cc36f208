use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER};
use tokio::io::AsyncWriteExt;

use reelgrab_core::models::media::RetrievalOutcome;
use reelgrab_core::models::settings::AppSettings;

use crate::core::error::FetchError;
use crate::core::http_client;
use crate::core::retriever::Retriever;

const WRITE_BUFFER: usize = 256 * 1024;
const VIDEO_LIKE_TYPES: [&str; 3] = ["video/", "application/octet-stream", "binary/"];

#[derive(Debug, Clone)]
pub struct RetrievalLimits {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub min_bytes: u64,
    pub max_bytes: u64,
    pub implausible_below: u64,
    pub stall_timeout: Duration,
}

impl RetrievalLimits {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            max_attempts: settings.advanced.max_retries.max(1),
            backoff: Duration::from_millis(settings.advanced.retry_backoff_ms),
            min_bytes: settings.download.min_file_bytes,
            max_bytes: settings.download.max_file_bytes,
            implausible_below: settings.download.implausible_below_bytes,
            stall_timeout: Duration::from_secs(settings.advanced.stall_timeout_secs),
        }
    }
}

/// Plain HTTP retrieval of a resolved media link.
pub struct DirectRetriever {
    client: reqwest::Client,
    headers: HeaderMap,
    fallback_base: String,
    limits: RetrievalLimits,
}

impl DirectRetriever {
    pub fn new(settings: &AppSettings) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in [
            (ACCEPT, &settings.download.accept),
            (REFERER, &settings.download.referer),
        ] {
            if let Ok(v) = HeaderValue::from_str(value) {
                headers.insert(name, v);
            }
        }
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        Ok(Self {
            client: http_client::media_client(settings)?,
            headers,
            fallback_base: settings.download.fallback_base_url.clone(),
            limits: RetrievalLimits::from_settings(settings),
        })
    }

    async fn attempt(&self, url: &str, output: &Path) -> Result<RetrievalOutcome, FetchError> {
        let part_path = part_path_for(output);
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::io(parent, e))?;
        }

        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let declared = response.content_length();

        if !content_type.as_deref().is_some_and(is_video_like)
            && declared.is_some_and(|n| n > 0 && n < self.limits.implausible_below)
        {
            return Err(FetchError::ContentImplausible {
                content_type,
                bytes: declared,
            });
        }
        if let Some(n) = declared.filter(|n| *n > self.limits.max_bytes) {
            return Err(FetchError::SizeExceeded {
                bytes: n,
                limit: self.limits.max_bytes,
            });
        }

        let written = self.stream_to_file(response, &part_path).await?;
        if written < self.limits.min_bytes {
            return Err(FetchError::ContentImplausible {
                content_type,
                bytes: Some(written),
            });
        }

        tokio::fs::rename(&part_path, output)
            .await
            .map_err(|e| FetchError::io(output, e))?;

        Ok(RetrievalOutcome {
            local_path: output.to_path_buf(),
            byte_size: written,
            content_type,
        })
    }

    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        part_path: &Path,
    ) -> Result<u64, FetchError> {
        let file = tokio::fs::File::create(part_path)
            .await
            .map_err(|e| FetchError::io(part_path, e))?;
        let mut file = tokio::io::BufWriter::with_capacity(WRITE_BUFFER, file);
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        loop {
            match tokio::time::timeout(self.limits.stall_timeout, stream.next()).await {
                Ok(Some(Ok(chunk))) => {
                    written += chunk.len() as u64;
                    if written > self.limits.max_bytes {
                        return Err(FetchError::SizeExceeded {
                            bytes: written,
                            limit: self.limits.max_bytes,
                        });
                    }
                    file.write_all(&chunk)
                        .await
                        .map_err(|e| FetchError::io(part_path, e))?;
                }
                Ok(Some(Err(e))) => return Err(FetchError::Network(e.to_string())),
                Ok(None) => break,
                Err(_) => {
                    return Err(FetchError::Timeout(format!(
                        "no data received for {} seconds",
                        self.limits.stall_timeout.as_secs()
                    )))
                }
            }
        }

        file.flush()
            .await
            .map_err(|e| FetchError::io(part_path, e))?;
        Ok(written)
    }
}

#[async_trait]
impl Retriever for DirectRetriever {
    fn name(&self) -> &str {
        "direct"
    }

    async fn retrieve(&self, media_url: &str, output: &Path) -> Result<RetrievalOutcome, FetchError> {
        let url = prepare_media_url(media_url, &self.fallback_base)?;
        let max = self.limits.max_attempts;
        let mut last_err = None;

        for attempt in 0..max {
            if attempt > 0 {
                tokio::time::sleep(self.limits.backoff * attempt).await;
            }

            match self.attempt(&url, output).await {
                Ok(outcome) => {
                    tracing::debug!(
                        "[direct] {} bytes saved to {}",
                        outcome.byte_size,
                        outcome.local_path.display()
                    );
                    return Ok(outcome);
                }
                Err(e) => {
                    let _ = tokio::fs::remove_file(&part_path_for(output)).await;
                    if e.is_fatal() {
                        return Err(e);
                    }
                    tracing::warn!("[direct] attempt {}/{} failed: {}", attempt + 1, max, e);
                    last_err = Some(e);
                }
            }
        }

        Err(FetchError::RetrievalFailed {
            attempts: max,
            last: Box::new(
                last_err.unwrap_or_else(|| FetchError::Network("no attempt was made".into())),
            ),
        })
    }
}

/// Cleans up a scraped media link: strips quoting and escape backslashes, and
/// resolves bare paths against `fallback_base`.
pub fn prepare_media_url(raw: &str, fallback_base: &str) -> Result<String, FetchError> {
    let mut url = raw.trim_matches(['"', '\'']).replace('\\', "");
    if url.starts_with('/') {
        url = format!("{}{}", fallback_base.trim_end_matches('/'), url);
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(FetchError::InvalidUrl(url));
    }
    Ok(url)
}

pub fn is_video_like(content_type: &str) -> bool {
    VIDEO_LIKE_TYPES.iter().any(|t| content_type.contains(t))
}

fn part_path_for(output: &Path) -> PathBuf {
    let mut part = output.as_os_str().to_owned();
    part.push(".part");
    PathBuf::from(part)
}
