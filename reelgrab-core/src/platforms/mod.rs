use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static INSTAGRAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?instagram\.com/(?:p|reel|reels|tv|stories|share)/([^/?#&]+).*")
        .unwrap()
});

static TWITTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://(?:x|twitter)\.com(?:/(?:i/web|[^/]+)/status/(\d+)(?:.*)?)?$").unwrap()
});

static TIKTOK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(?:www\.|m\.|vm\.|vt\.)?tiktok\.com/(?:@[^/]+/(?:video|photo)/\d+|v/\d+|t/[\w]+|[\w]+)/?",
    )
    .unwrap()
});

static FACEBOOK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(?:www\.|web\.|m\.)?facebook\.com/(?:watch\?v=[0-9]+|watch/\?v=[0-9]+|reel/[0-9]+|[a-zA-Z0-9.\-_]+/(?:videos|posts)/[0-9]+|[0-9]+/(?:videos|posts)/[0-9]+|share/(?:v|r)/[a-zA-Z0-9]+)(?:[^/?#&]+.*)?$|^https://fb\.watch/[a-zA-Z0-9]+$",
    )
    .unwrap()
});

static YOUTUBE_SHORTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?youtube\.com/shorts/([a-zA-Z0-9_-]{11})(?:\S+)?$").unwrap()
});

static YOUTUBE_LONG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?(?:youtube\.com/watch\?v=|youtu\.be/)([a-zA-Z0-9_-]{11})")
        .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Instagram,
    Twitter,
    TikTok,
    Facebook,
    YouTube,
}

/// How the final media file is fetched once a link has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalKind {
    Direct,
    ExternalTool,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Instagram,
        Platform::Twitter,
        Platform::TikTok,
        Platform::Facebook,
        Platform::YouTube,
    ];

    fn pattern(&self) -> &'static Regex {
        match self {
            Platform::Instagram => &INSTAGRAM_RE,
            Platform::Twitter => &TWITTER_RE,
            Platform::TikTok => &TIKTOK_RE,
            Platform::Facebook => &FACEBOOK_RE,
            Platform::YouTube => &YOUTUBE_SHORTS_RE,
        }
    }

    /// Classifies a link. `None` means the link belongs to no supported platform.
    pub fn from_url(url: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.matches(url))
    }

    pub fn matches(&self, url: &str) -> bool {
        self.pattern().is_match(url)
    }

    /// Returns the leading portion of `text` recognized as a link for this platform.
    pub fn find_in<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.pattern().find(text).map(|m| m.as_str())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Twitter => "twitter",
            Platform::TikTok => "tiktok",
            Platform::Facebook => "facebook",
            Platform::YouTube => "youtube",
        }
    }

    pub fn retrieval_kind(&self) -> RetrievalKind {
        match self {
            Platform::YouTube => RetrievalKind::ExternalTool,
            Platform::Instagram | Platform::Twitter | Platform::TikTok | Platform::Facebook => {
                RetrievalKind::Direct
            }
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True for regular YouTube video links, which are deliberately not handled.
pub fn is_long_form_youtube(url: &str) -> bool {
    YOUTUBE_LONG_RE.is_match(url)
}
