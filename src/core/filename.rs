use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const FALLBACK_COMPONENT: &str = "default";
const MAX_COMPONENT_CHARS: usize = 64;

/// Turns a free-form scope identifier into a single safe path component.
/// The result never contains separators, is never `.`/`..`, and is never empty.
pub fn sanitize_path_component(name: &str) -> String {
    let name: String = name.nfc().collect();
    let name = name.replace(['\t', '\n', '\r', '\0'], " ");
    let name = WS_RE.replace_all(name.trim(), "_");

    let mut result: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_COMPONENT_CHARS)
        .collect();

    result = result.trim_end_matches([' ', '.']).to_string();
    result = result.trim_start_matches('.').to_string();

    if result.is_empty() {
        return FALLBACK_COMPONENT.to_string();
    }
    result
}

/// `{platform}_{scope}_{unique}_{nanos}.{ext}`
pub fn media_file_name(platform: &str, scope: &str, unique: &str, nanos: i64, ext: &str) -> String {
    format!(
        "{}_{}_{}_{}.{}",
        platform,
        sanitize_path_component(scope),
        unique,
        nanos,
        ext.trim_start_matches('.')
    )
}
