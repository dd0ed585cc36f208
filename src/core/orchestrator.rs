use std::collections::HashMap;
use std::sync::Arc;

use reelgrab_core::models::media::{ExtractionResult, MediaRequest};
use reelgrab_core::models::settings::AppSettings;

use crate::core::error::FetchError;
use crate::platforms::mirror::MirrorStrategy;
use crate::platforms::provider::ProviderStrategy;
use crate::platforms::traits::ExtractionStrategy;
use crate::platforms::youtube::ShortsPassthrough;
use crate::platforms::Platform;

type Chain = Vec<Arc<dyn ExtractionStrategy>>;

/// Per-platform ordered strategy lists. The first strategy that produces a
/// non-empty link wins; later ones are never contacted.
pub struct FallbackOrchestrator {
    chains: HashMap<Platform, Chain>,
}

impl FallbackOrchestrator {
    pub fn from_settings(settings: &AppSettings) -> Result<Self, FetchError> {
        let snapsave: Arc<dyn ExtractionStrategy> = Arc::new(ProviderStrategy::new(
            settings.providers.snapsave.clone(),
            settings,
        )?);

        let mut chains = HashMap::new();
        for platform in Platform::ALL {
            let chain: Chain = match platform {
                Platform::Instagram => vec![
                    snapsave.clone(),
                    Arc::new(MirrorStrategy::new(settings.mirrors.instagram.clone(), settings)?),
                ],
                Platform::Twitter => vec![
                    Arc::new(ProviderStrategy::new(settings.providers.twitter.clone(), settings)?),
                    Arc::new(MirrorStrategy::new(settings.mirrors.twitter.clone(), settings)?),
                ],
                Platform::TikTok => vec![Arc::new(ProviderStrategy::new(
                    settings.providers.snaptik.clone(),
                    settings,
                )?)],
                Platform::Facebook => vec![snapsave.clone()],
                Platform::YouTube => vec![Arc::new(ShortsPassthrough)],
            };
            chains.insert(platform, chain);
        }

        Ok(Self { chains })
    }

    /// Replaces one platform's chain.
    pub fn with_chain(mut self, platform: Platform, chain: Chain) -> Self {
        self.chains.insert(platform, chain);
        self
    }

    #[cfg(test)]
    pub(crate) fn chain_names(&self, platform: Platform) -> Vec<&str> {
        self.chains
            .get(&platform)
            .map(|c| c.iter().map(|s| s.name()).collect())
            .unwrap_or_default()
    }

    pub async fn resolve(&self, request: &MediaRequest) -> Result<ExtractionResult, FetchError> {
        let platform = request.platform();
        let chain = self.chains.get(&platform).map(Vec::as_slice).unwrap_or_default();

        let mut last = None;
        for (i, strategy) in chain.iter().enumerate() {
            tracing::debug!(
                "[orchestrator] {} via {} ({}/{})",
                platform,
                strategy.name(),
                i + 1,
                chain.len()
            );
            match strategy.resolve(request.source_url()).await {
                Ok(url) if !url.trim().is_empty() => {
                    tracing::info!("[orchestrator] {} resolved by {}", platform, strategy.name());
                    return Ok(ExtractionResult {
                        media_url: url,
                        strategy: strategy.name().to_string(),
                    });
                }
                Ok(_) => {
                    tracing::warn!("[orchestrator] {} returned an empty link", strategy.name());
                    last = Some(FetchError::NoMediaUrlFound {
                        provider: strategy.name().to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!("[orchestrator] {} failed: {}", strategy.name(), e);
                    last = Some(e);
                }
            }
        }

        Err(FetchError::Exhausted {
            platform,
            attempted: chain.len(),
            last: Box::new(last.unwrap_or_else(|| FetchError::Unrecognized(request.source_url().to_string()))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use reelgrab_core::models::settings::ProviderProfile;

    use crate::core::test_server::{MockServer, Route};
    use crate::platforms::provider::tests::{obfuscated_document, snapsave_on};

    struct Fixed {
        name: &'static str,
        result: Result<&'static str, ()>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn ok(name: &'static str, url: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                result: Ok(url),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                result: Err(()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ExtractionStrategy for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn resolve(&self, _source_url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.result {
                Ok(url) => Ok(url.to_string()),
                Err(()) => Err(FetchError::Network("connection reset".into())),
            }
        }
    }

    fn request() -> MediaRequest {
        MediaRequest::new("https://www.instagram.com/reel/Cabc123/", "7").unwrap()
    }

    #[test]
    fn default_chains_follow_platform_order() {
        let orch = FallbackOrchestrator::from_settings(&AppSettings::default()).unwrap();
        assert_eq!(orch.chain_names(Platform::Instagram), vec!["snapsave", "ddinstagram"]);
        assert_eq!(orch.chain_names(Platform::Twitter), vec!["twitterdownloader", "vxtwitter"]);
        assert_eq!(orch.chain_names(Platform::TikTok), vec!["snaptik"]);
        assert_eq!(orch.chain_names(Platform::Facebook), vec!["snapsave"]);
        assert_eq!(orch.chain_names(Platform::YouTube), vec!["youtube_shorts"]);
    }

    #[tokio::test]
    async fn first_success_stops_the_chain() {
        let first = Fixed::ok("first", "https://cdn/1.mp4");
        let second = Fixed::ok("second", "https://cdn/2.mp4");
        let orch = FallbackOrchestrator::from_settings(&AppSettings::default()).unwrap()
            .with_chain(Platform::Instagram, vec![first.clone(), second.clone()]);

        let result = orch.resolve(&request()).await.unwrap();
        assert_eq!(result.media_url, "https://cdn/1.mp4");
        assert_eq!(result.strategy, "first");
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failure_advances_and_empty_counts_as_failure() {
        let broken = Fixed::failing("broken");
        let empty = Fixed::ok("empty", "  ");
        let good = Fixed::ok("good", "https://cdn/g.mp4");
        let orch = FallbackOrchestrator::from_settings(&AppSettings::default()).unwrap().with_chain(
            Platform::Instagram,
            vec![broken.clone(), empty.clone(), good.clone()],
        );

        let result = orch.resolve(&request()).await.unwrap();
        assert_eq!(result.strategy, "good");
        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
        assert_eq!(empty.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_wraps_last_error() {
        let orch = FallbackOrchestrator::from_settings(&AppSettings::default()).unwrap().with_chain(
            Platform::Instagram,
            vec![Fixed::failing("a"), Fixed::failing("b")],
        );

        match orch.resolve(&request()).await.unwrap_err() {
            FetchError::Exhausted {
                platform,
                attempted,
                last,
            } => {
                assert_eq!(platform, Platform::Instagram);
                assert_eq!(attempted, 2);
                assert!(matches!(*last, FetchError::Network(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn primary_server_error_falls_back_to_obfuscated_secondary() {
        let server = MockServer::start().await;
        server.route("/primary/action.php", Route::new(500, "text/plain", "oops"));
        server.route(
            "/action.php",
            Route::html(&obfuscated_document(
                "getElementById(\"download-section\").innerHTML = \"",
                r#"<table class="table"><tbody><tr><td>HD</td><td>-</td><td><a href="https://cdn.example.com/final.mp4">Download</a></td></tr></tbody></table>"#,
            )),
        );

        let settings = AppSettings::default();
        let primary = ProviderProfile {
            name: "primary".into(),
            action_url: server.url("/primary/action.php"),
            ..ProviderProfile::snapsave()
        };
        let orch = FallbackOrchestrator::from_settings(&settings).unwrap().with_chain(
            Platform::Instagram,
            vec![
                Arc::new(ProviderStrategy::new(primary, &settings).unwrap()),
                Arc::new(ProviderStrategy::new(snapsave_on(&server), &settings).unwrap()),
            ],
        );

        let result = orch.resolve(&request()).await.unwrap();
        assert_eq!(result.media_url, "https://cdn.example.com/final.mp4");
        assert_eq!(result.strategy, "snapsave");
        assert_eq!(server.hits("/primary/action.php"), 1);
        assert_eq!(server.hits("/action.php"), 1);
    }
}
