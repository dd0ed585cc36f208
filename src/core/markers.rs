use reelgrab_core::models::settings::Sentinels;

/// Returns the text between the first `start` and the next `end` after it.
pub fn extract_between<'a>(source: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = source.find(start)? + start.len();
    let len = source[from..].find(end)?;
    Some(&source[from..from + len])
}

/// Splits the argument list of an obfuscated call into its tokens.
pub fn extract_payload_tokens(source: &str, sentinels: &Sentinels) -> Option<Vec<String>> {
    let region = extract_between(source, &sentinels.start, &sentinels.end)?;
    Some(
        region
            .split(',')
            .map(|part| part.trim().trim_matches(['"', '\'']).to_string())
            .collect(),
    )
}

/// Pulls the HTML fragment a decoded script injects into the page.
pub fn extract_fragment(script: &str, sentinels: &Sentinels) -> Option<String> {
    let raw = extract_between(script, &sentinels.start, &sentinels.end)?;
    Some(unescape_fragment(raw))
}

fn unescape_fragment(raw: &str) -> String {
    raw.replace("\\\\", "\\").replace('\\', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentinels(start: &str, end: &str) -> Sentinels {
        Sentinels {
            start: start.into(),
            end: end.into(),
        }
    }

    #[test]
    fn between_takes_first_pair() {
        assert_eq!(extract_between("x[a]y[b]", "[", "]"), Some("a"));
    }

    #[test]
    fn between_missing_end() {
        assert_eq!(extract_between("x[a", "[", "]"), None);
        assert_eq!(extract_between("xa]", "[", "]"), None);
    }

    #[test]
    fn payload_tokens_are_trimmed() {
        let page = r#"<script>eval(function(h,u,n,t,e,r){return decodeURIComponent(escape(r))}( "abc",12, "qwerty" ,'7',"2",33))</script>"#;
        let tokens = extract_payload_tokens(
            page,
            &sentinels("decodeURIComponent(escape(r))}(", "))"),
        )
        .unwrap();
        assert_eq!(tokens, vec!["abc", "12", "qwerty", "7", "2", "33"]);
    }

    #[test]
    fn no_payload_marker() {
        assert!(extract_payload_tokens("<html></html>", &sentinels("(", "))")).is_none());
    }

    #[test]
    fn fragment_is_unescaped() {
        let script = r#"document.getElementById("download-section").innerHTML = "<a href=\"https://x/v.mp4\">go<\/a>"; document.getElementById("inputData").remove(); "#;
        let fragment = extract_fragment(
            script,
            &sentinels(
                "getElementById(\"download-section\").innerHTML = \"",
                "\"; document.getElementById(\"inputData\").remove(); ",
            ),
        )
        .unwrap();
        assert_eq!(fragment, r#"<a href="https://x/v.mp4">go</a>"#);
    }

    #[test]
    fn doubled_backslashes_collapse_then_vanish() {
        assert_eq!(unescape_fragment(r"a\\b\c"), "abc");
    }
}
