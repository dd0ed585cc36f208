use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36";

const RETRIEVAL_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const PAYLOAD_START: &str = "decodeURIComponent(escape(r))}(";
const PAYLOAD_END: &str = "))";
const FRAGMENT_END: &str = "\"; document.getElementById(\"inputData\").remove(); ";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub download: DownloadSettings,
    #[serde(default)]
    pub advanced: AdvancedSettings,
    #[serde(default)]
    pub ytdlp: YtdlpSettings,
    #[serde(default)]
    pub providers: ProviderSettings,
    #[serde(default)]
    pub mirrors: MirrorSettings,
    #[serde(default)]
    pub proxy: ProxySettings,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSettings {
    /// Root under which every scope gets its own directory.
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,
    /// Files larger than this are rejected (the delivery limit of the chat layer).
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    /// Anything smaller than this after a complete write is treated as junk.
    #[serde(default = "default_min_file_bytes")]
    pub min_file_bytes: u64,
    /// A non-video response whose declared length is below this is implausible.
    #[serde(default = "default_implausible_below_bytes")]
    pub implausible_below_bytes: u64,
    #[serde(default = "default_referer")]
    pub referer: String,
    /// Prefixed onto media links that come back as bare paths.
    #[serde(default = "default_fallback_base_url")]
    pub fallback_base_url: String,
    #[serde(default = "default_retrieval_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_media_accept")]
    pub accept: String,
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from("temp_videos")
}

fn default_max_file_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_min_file_bytes() -> u64 {
    1024
}

fn default_implausible_below_bytes() -> u64 {
    10_000
}

fn default_referer() -> String {
    "https://www.instagram.com/".into()
}

fn default_fallback_base_url() -> String {
    "https://ddinstagram.com".into()
}

fn default_retrieval_user_agent() -> String {
    RETRIEVAL_USER_AGENT.into()
}

fn default_media_accept() -> String {
    "video/mp4,video/webm,video/*;q=0.9,*/*;q=0.8".into()
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            workspace_dir: default_workspace_dir(),
            max_file_bytes: default_max_file_bytes(),
            min_file_bytes: default_min_file_bytes(),
            implausible_below_bytes: default_implausible_below_bytes(),
            referer: default_referer(),
            fallback_base_url: default_fallback_base_url(),
            user_agent: default_retrieval_user_agent(),
            accept: default_media_accept(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedSettings {
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before attempt `n + 1` is `n * retry_backoff_ms`.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    #[serde(default = "default_extraction_timeout_secs")]
    pub extraction_timeout_secs: u64,
    #[serde(default = "default_retrieval_timeout_secs")]
    pub retrieval_timeout_secs: u64,
    /// Abort a body stream that delivers nothing for this long.
    #[serde(default = "default_stall_timeout_secs")]
    pub stall_timeout_secs: u64,
}

fn default_max_concurrent_downloads() -> u32 {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_max_redirects() -> usize {
    10
}

fn default_extraction_timeout_secs() -> u64 {
    30
}

fn default_retrieval_timeout_secs() -> u64 {
    60
}

fn default_stall_timeout_secs() -> u64 {
    45
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: default_max_concurrent_downloads(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_redirects: default_max_redirects(),
            extraction_timeout_secs: default_extraction_timeout_secs(),
            retrieval_timeout_secs: default_retrieval_timeout_secs(),
            stall_timeout_secs: default_stall_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YtdlpSettings {
    /// Explicit binary. When unset the tool is looked up on PATH, then in the app bin dir.
    #[serde(default)]
    pub binary: Option<PathBuf>,
    #[serde(default = "default_ytdlp_format")]
    pub format: String,
    #[serde(default = "default_ytdlp_max_filesize")]
    pub max_filesize: String,
    #[serde(default = "default_ytdlp_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub extra_flags: Vec<String>,
}

fn default_ytdlp_format() -> String {
    "best[ext=mp4][filesize<50M]/best[filesize<50M]/best".into()
}

fn default_ytdlp_max_filesize() -> String {
    "50M".into()
}

fn default_ytdlp_timeout_secs() -> u64 {
    300
}

impl Default for YtdlpSettings {
    fn default() -> Self {
        Self {
            binary: None,
            format: default_ytdlp_format(),
            max_filesize: default_ytdlp_max_filesize(),
            timeout_secs: default_ytdlp_timeout_secs(),
            extra_flags: Vec::new(),
        }
    }
}

/// A DOM pattern that may hold the media link, tried in list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatcherSpec {
    /// Rows of `table.table` with at least three cells; the link sits in the third
    /// cell, either as an anchor or inside a button's `get_progressApi('...')` call.
    TableRow { api_base: String },
    /// First anchor under `inner` inside any `container`.
    Nested { container: String, inner: String },
    /// `href` of the first element matching `css`.
    Selector { css: String },
    /// `href` of the first anchor in the document.
    FirstAnchor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescuePattern {
    /// Regex with one capture group holding the link.
    pub pattern: String,
    /// Prepended to the capture, for patterns that yield a bare path.
    #[serde(default)]
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentinels {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub name: String,
    #[serde(default = "default_provider_user_agent")]
    pub user_agent: String,
    /// Page carrying the hidden session token. `None` means the provider needs no token.
    #[serde(default)]
    pub token_page: Option<String>,
    #[serde(default = "default_token_field")]
    pub token_field: String,
    pub action_url: String,
    pub origin: String,
    pub referer: String,
    #[serde(default)]
    pub accept: Option<String>,
    /// Force a `www.` host before posting.
    #[serde(default)]
    pub normalize_www: bool,
    /// Field holding the result HTML when the action endpoint answers with a JSON object.
    #[serde(default = "default_json_field")]
    pub json_field: String,
    #[serde(default)]
    pub payload: Option<Sentinels>,
    #[serde(default)]
    pub fragment: Option<Sentinels>,
    #[serde(default)]
    pub matchers: Vec<MatcherSpec>,
    #[serde(default)]
    pub rescue: Vec<RescuePattern>,
}

fn default_provider_user_agent() -> String {
    DESKTOP_USER_AGENT.into()
}

fn default_token_field() -> String {
    "token".into()
}

fn default_json_field() -> String {
    "data".into()
}

fn obfuscated_payload() -> Option<Sentinels> {
    Some(Sentinels {
        start: PAYLOAD_START.into(),
        end: PAYLOAD_END.into(),
    })
}

fn generic_matchers(api_base: &str) -> Vec<MatcherSpec> {
    vec![
        MatcherSpec::TableRow {
            api_base: api_base.into(),
        },
        MatcherSpec::Nested {
            container: "div.card".into(),
            inner: "div.card-body".into(),
        },
        MatcherSpec::Nested {
            container: "div.download-items".into(),
            inner: "div.download-items__btn".into(),
        },
        MatcherSpec::FirstAnchor,
    ]
}

impl ProviderProfile {
    pub fn snapsave() -> Self {
        let api_base = "https://snapsave.app";
        Self {
            name: "snapsave".into(),
            user_agent: default_provider_user_agent(),
            token_page: None,
            token_field: default_token_field(),
            action_url: "https://snapsave.app/action.php?lang=en".into(),
            origin: api_base.into(),
            referer: "https://snapsave.app/".into(),
            accept: None,
            normalize_www: true,
            json_field: default_json_field(),
            payload: obfuscated_payload(),
            fragment: Some(Sentinels {
                start: "getElementById(\"download-section\").innerHTML = \"".into(),
                end: FRAGMENT_END.into(),
            }),
            matchers: generic_matchers(api_base),
            rescue: vec![
                RescuePattern {
                    pattern: r#"href="([^"]*\.mp4[^"]*)""#.into(),
                    prefix: String::new(),
                },
                RescuePattern {
                    pattern: r#"data-href="([^"]*\.mp4[^"]*)""#.into(),
                    prefix: String::new(),
                },
                RescuePattern {
                    pattern: r#"onclick="[^"]*get_progressApi\('([^']+)'\)""#.into(),
                    prefix: api_base.into(),
                },
            ],
        }
    }

    pub fn snaptik() -> Self {
        let mut matchers = vec![MatcherSpec::Selector {
            css: ".download-box > .video-links > a".into(),
        }];
        matchers.extend(generic_matchers("https://snaptik.app"));
        Self {
            name: "snaptik".into(),
            user_agent: default_provider_user_agent(),
            token_page: Some("https://snaptik.app/".into()),
            token_field: default_token_field(),
            action_url: "https://snaptik.app/abc2.php".into(),
            origin: "https://snaptik.app".into(),
            referer: "https://snaptik.app/".into(),
            accept: Some("*/*".into()),
            normalize_www: false,
            json_field: default_json_field(),
            payload: obfuscated_payload(),
            fragment: Some(Sentinels {
                start: "$(\"#download\").innerHTML = \"".into(),
                end: FRAGMENT_END.into(),
            }),
            matchers,
            rescue: Vec::new(),
        }
    }

    pub fn twitterdownloader() -> Self {
        let base = "https://twitterdownloader.snapsave.app";
        let mut matchers = vec![MatcherSpec::Selector {
            css: "#download-block > .abuttons > a".into(),
        }];
        matchers.extend(generic_matchers(base));
        Self {
            name: "twitterdownloader".into(),
            user_agent: default_provider_user_agent(),
            token_page: Some(format!("{}/", base)),
            token_field: default_token_field(),
            action_url: format!("{}/action.php", base),
            origin: base.into(),
            referer: format!("{}/", base),
            accept: Some("*/*".into()),
            normalize_www: false,
            json_field: default_json_field(),
            payload: None,
            fragment: None,
            matchers,
            rescue: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "ProviderProfile::snapsave")]
    pub snapsave: ProviderProfile,
    #[serde(default = "ProviderProfile::snaptik")]
    pub snaptik: ProviderProfile,
    #[serde(default = "ProviderProfile::twitterdownloader")]
    pub twitter: ProviderProfile,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            snapsave: ProviderProfile::snapsave(),
            snaptik: ProviderProfile::snaptik(),
            twitter: ProviderProfile::twitterdownloader(),
        }
    }
}

/// A literal host rewrite applied to the first occurrence of `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRewrite {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorProfile {
    pub name: String,
    pub rewrites: Vec<HostRewrite>,
    pub user_agent: String,
    #[serde(default = "default_mirror_accept")]
    pub accept: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
    pub patterns: Vec<String>,
}

fn default_mirror_accept() -> String {
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".into()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".into()
}

impl MirrorProfile {
    pub fn ddinstagram() -> Self {
        Self {
            name: "ddinstagram".into(),
            rewrites: vec![HostRewrite {
                from: "instagram.com".into(),
                to: "ddinstagram.com".into(),
            }],
            user_agent: "TelegramBot (like InstagramBot)".into(),
            accept: default_mirror_accept(),
            accept_language: default_accept_language(),
            patterns: vec![
                r#""video_url":"([^"]+)""#.into(),
                r#"og:video" content="([^"]+)""#.into(),
                r#"twitter:player:stream" content="([^"]+)""#.into(),
                r#"href="([^"]*\.mp4[^"]*)""#.into(),
            ],
        }
    }

    pub fn vxtwitter() -> Self {
        Self {
            name: "vxtwitter".into(),
            rewrites: vec![
                HostRewrite {
                    from: "x.com".into(),
                    to: "twitter.com".into(),
                },
                HostRewrite {
                    from: "twitter.com".into(),
                    to: "vxtwitter.com".into(),
                },
            ],
            user_agent: "TelegramBot (like TwitterBot)".into(),
            accept: default_mirror_accept(),
            accept_language: default_accept_language(),
            patterns: vec![
                r#"twitter:player:stream" content="([^"]+)""#.into(),
                r#"og:video" content="([^"]+)""#.into(),
                r#"twitter:video" content="([^"]+)""#.into(),
                r#""video_url":"([^"]+)""#.into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorSettings {
    #[serde(default = "MirrorProfile::ddinstagram")]
    pub instagram: MirrorProfile,
    #[serde(default = "MirrorProfile::vxtwitter")]
    pub twitter: MirrorProfile,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            instagram: MirrorProfile::ddinstagram(),
            twitter: MirrorProfile::vxtwitter(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProxySettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_proxy_type")]
    pub proxy_type: String,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_proxy_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn default_proxy_type() -> String {
    "http".into()
}

fn default_proxy_port() -> u16 {
    8080
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            download: DownloadSettings::default(),
            advanced: AdvancedSettings::default(),
            ytdlp: YtdlpSettings::default(),
            providers: ProviderSettings::default(),
            mirrors: MirrorSettings::default(),
            proxy: ProxySettings::default(),
        }
    }
}
