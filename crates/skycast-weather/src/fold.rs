//! Accent- and case-insensitive text keys.
//!
//! `fold_key("  São   Paulo ")` == `fold_key("sao paulo")` == `"sao paulo"`.
//! Non-ASCII letters are transliterated to ASCII with `deunicode`, so
//! `"Đà Nẵng"` and `"Da Nang"` share a key.

use deunicode::deunicode_char;

/// Transliterate to ASCII, lowercase, trim and collapse inner whitespace.
pub fn fold_key(raw: &str) -> String {
    let mut ascii = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii() {
            ascii.push(ch);
        } else if is_combining_mark(ch) {
            // Decomposed input ("e" + U+0301) already carries its base letter.
            continue;
        } else {
            match deunicode_char(ch) {
                Some(replacement) => ascii.push_str(replacement),
                None => ascii.push(ch),
            }
        }
    }

    ascii
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Compare two strings by their folded form.
pub fn equals_folded(a: &str, b: &str) -> bool {
    fold_key(a) == fold_key(b)
}

fn is_combining_mark(ch: char) -> bool {
    matches!(
        ch,
        '\u{0300}'..='\u{036f}'
            | '\u{1ab0}'..='\u{1aff}'
            | '\u{1dc0}'..='\u{1dff}'
            | '\u{20d0}'..='\u{20ff}'
    )
}
