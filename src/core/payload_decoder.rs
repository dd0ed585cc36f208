//! Reverses the string cipher some resolver services wrap their result page in.
//!
//! The page embeds a call with six arguments `(h, u, n, t, e, r)`. `h` is a list of
//! numbers written in base `e` with the digit glyphs taken from `n`, separated by
//! `n[e]`. Each number minus the offset `t` is one code point of the hidden script.
//! `u` and `r` are unused.

const ALPHABET: &[u8; 64] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ+/";

pub const TOKEN_COUNT: usize = 6;

/// Decodes an obfuscated payload. Any structural problem yields an empty string.
pub fn decode<S: AsRef<str>>(tokens: &[S]) -> String {
    if tokens.len() < TOKEN_COUNT {
        return String::new();
    }

    let h = tokens[0].as_ref();
    let n = tokens[2].as_ref();

    let Ok(offset) = tokens[3].as_ref().parse::<i64>() else {
        return String::new();
    };
    let Ok(base) = tokens[4].as_ref().parse::<i64>() else {
        return String::new();
    };

    let glyphs: Vec<char> = n.chars().collect();
    let Some(delimiter) = usize::try_from(base).ok().and_then(|i| glyphs.get(i).copied()) else {
        return String::new();
    };
    // `base` indexed into `n`, so it is non-negative from here on.
    let base = base as u64;

    // A trailing delimiter closes the last number; it does not open an empty one.
    let mut chunks: Vec<&str> = h.split(delimiter).collect();
    if chunks.last().is_some_and(|c| c.is_empty()) {
        chunks.pop();
    }

    let mut out = String::new();
    for chunk in chunks {
        let mut digits = chunk.to_string();
        for (idx, glyph) in glyphs.iter().enumerate() {
            digits = digits.replace(*glyph, &idx.to_string());
        }

        let Some(decimal) = decode_numeral(&digits, base, 10) else {
            continue;
        };
        let Ok(value) = decimal.parse::<i64>() else {
            continue;
        };
        let Some(code_point) = value.checked_sub(offset) else {
            continue;
        };
        if (0..=0x10FFFF).contains(&code_point) {
            out.push(char::from_u32(code_point as u32).unwrap_or(char::REPLACEMENT_CHARACTER));
        }
    }

    // Built from scalar values, so already valid text. It is returned as is.
    out
}

/// Re-bases `digits` from `base_from` to `base_to`, both drawn from the shared
/// 64-glyph alphabet. Glyphs outside the source alphabet contribute nothing.
/// Returns `None` when the value does not fit in 64 bits.
pub fn decode_numeral(digits: &str, base_from: u64, base_to: u64) -> Option<String> {
    let from = (base_from as usize).min(ALPHABET.len());
    let to = (base_to as usize).min(ALPHABET.len());
    let hi = &ALPHABET[..from];
    let lo = &ALPHABET[..to];

    let mut value: u64 = 0;
    for (position, ch) in digits.chars().rev().enumerate() {
        let Some(idx) = hi.iter().position(|&g| g as char == ch) else {
            continue;
        };
        if idx == 0 {
            continue;
        }
        let weight = base_from.checked_pow(u32::try_from(position).ok()?)?;
        value = value.checked_add((idx as u64).checked_mul(weight)?)?;
    }

    if value == 0 || to == 0 {
        return Some("0".to_string());
    }

    let radix = to as u64;
    let mut rendered = Vec::new();
    while value > 0 {
        rendered.push(lo[(value % radix) as usize]);
        value /= radix;
    }
    rendered.reverse();
    Some(rendered.into_iter().map(char::from).collect())
}

/// Turns a raw response body into text. Valid UTF-8 is returned unchanged.
/// Otherwise the readable characters up to U+00FF are taken as bytes and
/// re-read as UTF-8. If that fails too, the lossy reading is returned.
pub fn repair_utf8(raw: &[u8]) -> String {
    let lossy = match std::str::from_utf8(raw) {
        Ok(text) => return text.to_string(),
        Err(_) => String::from_utf8_lossy(raw),
    };
    let bytes: Vec<u8> = lossy
        .chars()
        .filter(|&c| (c as u32) <= 0xFF)
        .map(|c| c as u32 as u8)
        .collect();
    match String::from_utf8(bytes) {
        Ok(repaired) => repaired,
        Err(_) => lossy.into_owned(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Forward cipher for bases up to 10, the inverse of `decode`.
    pub(crate) fn encode(plain: &str, glyphs: &str, offset: i64, base: u32) -> Vec<String> {
        let glyphs: Vec<char> = glyphs.chars().collect();
        assert!(base <= 10 && (base as usize) < glyphs.len());
        let delimiter = glyphs[base as usize];

        let mut h = String::new();
        for ch in plain.chars() {
            let mut value = (ch as i64 + offset) as u64;
            let mut digits = Vec::new();
            loop {
                digits.push(glyphs[(value % base as u64) as usize]);
                value /= base as u64;
                if value == 0 {
                    break;
                }
            }
            digits.reverse();
            h.extend(digits);
            h.push(delimiter);
        }

        vec![
            h,
            "unused".to_string(),
            glyphs.iter().collect(),
            offset.to_string(),
            base.to_string(),
            "unused".to_string(),
        ]
    }

    #[test]
    fn round_trips_forward_encoding() {
        let plain = r#"<a href="https://cdn.example.com/v.mp4?x=1&y=2">Download</a>"#;
        let tokens = encode(plain, "qwertyuio", 43, 5);
        assert_eq!(decode(&tokens), plain);
    }

    #[test]
    fn round_trips_non_ascii() {
        let plain = "vídeo ✓ 動画";
        let tokens = encode(plain, "abcdefghijk", 7, 9);
        assert_eq!(decode(&tokens), plain);
    }

    #[test]
    fn decode_is_deterministic() {
        let tokens = encode("hello", "qwertyuio", 3, 4);
        assert_eq!(decode(&tokens), decode(&tokens));
    }

    #[test]
    fn too_few_tokens_is_empty() {
        let tokens = ["a", "b", "c", "1", "2"];
        assert_eq!(decode(&tokens), "");
        assert_eq!(decode::<&str>(&[]), "");
    }

    #[test]
    fn bad_integers_are_empty() {
        assert_eq!(decode(&["qw", "", "qwertyuio", "x", "5", ""]), "");
        assert_eq!(decode(&["qw", "", "qwertyuio", "3", "five", ""]), "");
    }

    #[test]
    fn base_outside_glyphs_is_empty() {
        assert_eq!(decode(&["qw", "", "qwe", "3", "3", ""]), "");
        assert_eq!(decode(&["qw", "", "qwe", "3", "-1", ""]), "");
    }

    #[test]
    fn out_of_range_code_points_are_dropped() {
        // "r" is digit 3 in base 5: 3 - 10 is negative and disappears.
        let mut tokens = encode("A", "qwertyuio", 10, 5);
        tokens[0] = format!("ry{}", tokens[0]);
        assert_eq!(decode(&tokens), "A");
    }

    #[test]
    fn numeral_rebasing() {
        assert_eq!(decode_numeral("ff", 16, 10).as_deref(), Some("255"));
        assert_eq!(decode_numeral("101", 2, 10).as_deref(), Some("5"));
        assert_eq!(decode_numeral("", 5, 10).as_deref(), Some("0"));
        assert_eq!(decode_numeral("255", 10, 16).as_deref(), Some("ff"));
    }

    #[test]
    fn numeral_skips_unknown_glyphs() {
        assert_eq!(decode_numeral("1z1", 2, 10).as_deref(), Some("5"));
    }

    #[test]
    fn numeral_overflow_is_none() {
        let huge = "9".repeat(40);
        assert_eq!(decode_numeral(&huge, 10, 10), None);
    }

    #[test]
    fn decoded_latin1_pairs_stay_as_written() {
        let plain = "cafÃ©";
        let tokens = encode(plain, "abcdefghij", 11, 7);
        assert_eq!(decode(&tokens), plain);
    }

    #[test]
    fn repair_keeps_valid_text() {
        assert_eq!(repair_utf8("cafÃ©".as_bytes()), "cafÃ©");
        assert_eq!(repair_utf8("動画".as_bytes()), "動画");
    }

    #[test]
    fn repair_drops_stray_bytes() {
        assert_eq!(repair_utf8(b"<a href=\"x.mp4\">\xff</a>"), "<a href=\"x.mp4\"></a>");
    }

    #[test]
    fn repair_falls_back_to_lossy_text() {
        assert_eq!(repair_utf8(b"caf\xc3\xa9 \xff"), "café \u{FFFD}");
    }
}
