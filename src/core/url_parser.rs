use crate::platforms::Platform;

/// Finds the first supported link at the start of a message, checking platforms in
/// their fixed priority order. The link ends at the first whitespace.
pub fn extract_link(text: &str) -> Option<&str> {
    let text = text.trim_start();
    let found = Platform::ALL.iter().find_map(|p| p.find_in(text))?;
    found.split_whitespace().next()
}

/// True when the whole message, ignoring surrounding whitespace, is one supported link.
pub fn is_just_link(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && extract_link(trimmed) == Some(trimmed)
}

/// Adds `www.` to a bare two-label host. Twitter links are left alone.
pub fn normalize_www(url: &str) -> String {
    if Platform::Twitter.matches(url) {
        return url.to_string();
    }

    let Some((scheme, rest)) = url
        .strip_prefix("https://")
        .map(|r| ("https://", r))
        .or_else(|| url.strip_prefix("http://").map(|r| ("http://", r)))
    else {
        return url.to_string();
    };

    if rest.starts_with("www.") {
        return url.to_string();
    }

    let (host, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() != 2 || labels.iter().any(|l| l.is_empty()) {
        return url.to_string();
    }

    format!("{}www.{}{}", scheme, host, path)
}
