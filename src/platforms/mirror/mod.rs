use async_trait::async_trait;
use regex::Regex;

use reelgrab_core::models::settings::{AppSettings, MirrorProfile};

use crate::core::error::FetchError;
use crate::core::http_client;
use crate::platforms::traits::ExtractionStrategy;

/// Embed-friendly mirror host. The post page is fetched from the mirror, which
/// serves the video link in its meta tags.
pub struct MirrorStrategy {
    profile: MirrorProfile,
    client: reqwest::Client,
    patterns: Vec<Regex>,
}

impl MirrorStrategy {
    pub fn new(profile: MirrorProfile, settings: &AppSettings) -> Result<Self, FetchError> {
        let client = http_client::extraction_client(settings, &profile.user_agent)?;
        let patterns = profile
            .patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!("[{}] ignoring invalid pattern {:?}: {}", profile.name, p, e);
                    None
                }
            })
            .collect();
        Ok(Self {
            profile,
            client,
            patterns,
        })
    }

    fn mirror_url(&self, source_url: &str) -> String {
        rewrite_host(source_url, &self.profile)
    }
}

fn rewrite_host(source_url: &str, profile: &MirrorProfile) -> String {
    profile
        .rewrites
        .iter()
        .fold(source_url.to_string(), |url, rw| url.replacen(&rw.from, &rw.to, 1))
}

fn unescape_link(raw: &str) -> String {
    raw.replace("\\u0026", "&").replace("\\/", "/").replace("&amp;", "&")
}

#[async_trait]
impl ExtractionStrategy for MirrorStrategy {
    fn name(&self) -> &str {
        &self.profile.name
    }

    async fn resolve(&self, source_url: &str) -> Result<String, FetchError> {
        let target = self.mirror_url(source_url);
        tracing::debug!("[{}] fetching {}", self.profile.name, target);

        let response = self
            .client
            .get(&target)
            .header("Accept", &self.profile.accept)
            .header("Accept-Language", &self.profile.accept_language)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: target,
            });
        }
        let body = response.text().await?;

        self.patterns
            .iter()
            .find_map(|re| {
                let found = re.captures(&body)?.get(1)?.as_str();
                (!found.is_empty()).then(|| unescape_link(found))
            })
            .ok_or_else(|| FetchError::NoMediaUrlFound {
                provider: self.profile.name.clone(),
            })
    }
}
