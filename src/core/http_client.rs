use std::time::Duration;

use reelgrab_core::models::settings::{AppSettings, ProxySettings};

use crate::core::error::FetchError;

pub fn proxy_url(proxy: &ProxySettings) -> Option<String> {
    if !proxy.enabled || proxy.host.is_empty() {
        return None;
    }
    let scheme = match proxy.proxy_type.as_str() {
        "socks5" => "socks5",
        "https" => "https",
        _ => "http",
    };
    if !proxy.username.is_empty() {
        Some(format!(
            "{}://{}:{}@{}:{}",
            scheme, proxy.username, proxy.password, proxy.host, proxy.port
        ))
    } else {
        Some(format!("{}://{}:{}", scheme, proxy.host, proxy.port))
    }
}

pub fn apply_proxy(
    builder: reqwest::ClientBuilder,
    proxy: &ProxySettings,
) -> Result<reqwest::ClientBuilder, FetchError> {
    let Some(proxy_url) = proxy_url(proxy) else {
        return Ok(builder);
    };
    let proxy = reqwest::Proxy::all(&proxy_url)
        .map_err(|e| FetchError::ClientSetup(format!("invalid proxy {}: {}", proxy.host, e)))?;
    Ok(builder.proxy(proxy))
}

fn base_builder(
    settings: &AppSettings,
    user_agent: &str,
    timeout: Duration,
) -> Result<reqwest::ClientBuilder, FetchError> {
    let builder = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(
            settings.advanced.max_redirects,
        ));
    apply_proxy(builder, &settings.proxy)
}

fn build(builder: reqwest::ClientBuilder) -> Result<reqwest::Client, FetchError> {
    builder
        .build()
        .map_err(|e| FetchError::ClientSetup(e.to_string()))
}

/// Client for resolver services and mirrors. Keeps cookies so a token fetched
/// from an entry page stays valid for the follow-up post.
pub fn extraction_client(settings: &AppSettings, user_agent: &str) -> Result<reqwest::Client, FetchError> {
    let timeout = Duration::from_secs(settings.advanced.extraction_timeout_secs);
    build(base_builder(settings, user_agent, timeout)?.cookie_store(true))
}

/// Client for pulling the final media file.
pub fn media_client(settings: &AppSettings) -> Result<reqwest::Client, FetchError> {
    let timeout = Duration::from_secs(settings.advanced.retrieval_timeout_secs);
    build(base_builder(settings, &settings.download.user_agent, timeout)?)
}
