use async_trait::async_trait;
use scraper::{Html, Selector};

use reelgrab_core::models::settings::{AppSettings, ProviderProfile};

use crate::core::error::FetchError;
use crate::core::http_client;
use crate::core::markers::{extract_fragment, extract_payload_tokens};
use crate::core::matchers::{build_matchers, run_matchers, Matcher, RegexRescue};
use crate::core::payload_decoder;
use crate::core::url_parser::normalize_www;
use crate::platforms::traits::ExtractionStrategy;

/// A third-party resolver site: optional token handshake, a form post, then
/// result-page scraping.
pub struct ProviderStrategy {
    profile: ProviderProfile,
    client: reqwest::Client,
    matchers: Vec<Box<dyn Matcher>>,
    rescue: RegexRescue,
}

/// What the action endpoint answered with, after unwrapping.
enum ResultPage {
    Html(String),
    /// The payload was there but did not decode into the expected fragment.
    Undecodable,
}

impl ProviderStrategy {
    pub fn new(profile: ProviderProfile, settings: &AppSettings) -> Result<Self, FetchError> {
        let client = http_client::extraction_client(settings, &profile.user_agent)?;
        let matchers = build_matchers(&profile.matchers);
        let rescue = RegexRescue::new(&profile.rescue);
        Ok(Self {
            profile,
            client,
            matchers,
            rescue,
        })
    }

    async fn fetch_token(&self, page: &str) -> Result<String, FetchError> {
        let response = self.client.get(page).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: page.to_string(),
            });
        }
        let html = response.text().await?;
        parse_token(&html, &self.profile.token_field).ok_or_else(|| FetchError::TokenNotFound {
            provider: self.profile.name.clone(),
        })
    }

    async fn submit(&self, source_url: &str, token: Option<&str>) -> Result<String, FetchError> {
        let mut form: Vec<(&str, &str)> = vec![("url", source_url)];
        if let Some(token) = token {
            form.push((self.profile.token_field.as_str(), token));
        }

        let mut request = self
            .client
            .post(&self.profile.action_url)
            .header("Origin", &self.profile.origin)
            .header("Referer", &self.profile.referer)
            .form(&form);
        if let Some(accept) = &self.profile.accept {
            request = request.header("Accept", accept);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: self.profile.action_url.clone(),
            });
        }
        let raw = response.bytes().await?;
        Ok(payload_decoder::repair_utf8(&raw))
    }

    /// A JSON object reply carries the page in `json_field`. Anything else is
    /// the page itself.
    fn unwrap_json(&self, body: &str) -> Result<String, FetchError> {
        let Ok(serde_json::Value::Object(object)) = serde_json::from_str(body) else {
            return Ok(body.to_string());
        };
        match object.get(&self.profile.json_field).and_then(|v| v.as_str()) {
            Some(html) if !html.trim().is_empty() => Ok(html.to_string()),
            _ => Err(FetchError::NoMediaUrlFound {
                provider: self.profile.name.clone(),
            }),
        }
    }

    fn unwrap_payload(&self, document: &str) -> ResultPage {
        let Some(payload) = &self.profile.payload else {
            return ResultPage::Html(document.to_string());
        };
        let Some(tokens) = extract_payload_tokens(document, payload) else {
            tracing::debug!("[{}] no obfuscated payload, reading body as html", self.profile.name);
            return ResultPage::Html(document.to_string());
        };

        let script = payload_decoder::decode(&tokens);
        if script.is_empty() {
            return ResultPage::Undecodable;
        }
        match &self.profile.fragment {
            Some(sentinels) => extract_fragment(&script, sentinels)
                .map(ResultPage::Html)
                .unwrap_or(ResultPage::Undecodable),
            None => ResultPage::Html(script),
        }
    }
}

fn parse_token(html: &str, field: &str) -> Option<String> {
    let selector = Selector::parse(&format!("input[name=\"{}\"]", field)).ok()?;
    let doc = Html::parse_document(html);
    let value = doc.select(&selector).next()?.value().attr("value")?;
    (!value.is_empty()).then(|| value.to_string())
}

#[async_trait]
impl ExtractionStrategy for ProviderStrategy {
    fn name(&self) -> &str {
        &self.profile.name
    }

    async fn resolve(&self, source_url: &str) -> Result<String, FetchError> {
        let provider = self.profile.name.as_str();

        let token = match &self.profile.token_page {
            Some(page) => Some(self.fetch_token(page).await?),
            None => None,
        };

        let target = if self.profile.normalize_www {
            normalize_www(source_url)
        } else {
            source_url.to_string()
        };
        tracing::debug!("[{}] submitting {}", provider, target);

        let body = self.submit(&target, token.as_deref()).await?;
        let document = self.unwrap_json(&body)?;

        let html = match self.unwrap_payload(&document) {
            ResultPage::Html(html) => html,
            ResultPage::Undecodable => {
                if let Some(found) = self.rescue.find(&document) {
                    tracing::debug!("[{}] payload undecodable, rescued link from raw body", provider);
                    return Ok(found);
                }
                return Err(FetchError::DecodeFailure {
                    provider: provider.to_string(),
                });
            }
        };

        if let Some((matcher, found)) = run_matchers(&self.matchers, &html) {
            tracing::debug!("[{}] link found by {}", provider, matcher);
            return Ok(found);
        }

        if let Some(found) = self.rescue.find(&html).or_else(|| self.rescue.find(&document)) {
            tracing::debug!("[{}] link found by regex rescue", provider);
            return Ok(found);
        }

        Err(FetchError::NoMediaUrlFound {
            provider: provider.to_string(),
        })
    }
}
