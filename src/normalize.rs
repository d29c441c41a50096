//! # Title Normalizer
//!
//! Converts a raw scraped (or catalog) title into the canonical comparable
//! form used by the matcher. Pure and deterministic; normalizing its own
//! output is a no-op, which the reconciliation pipeline relies on when it
//! compares catalog titles against scraped ones.
//!
//! Rule order matters: parenthetical ratings and language tags must go
//! before the punctuation strip removes the parentheses they key on.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize a raw title for matching.
///
/// Steps, in order:
/// 1. decode HTML entities and drop stray markup
/// 2. lowercase
/// 3. strip parenthetical age/content ratings: `(pg-13)`, `(15+)`, `(u/a)`, `(u)`
/// 4. strip language tags, parenthetical codes or bare words
/// 5. strip format/booking noise: `book now`, `2d`, `3d`, `imax`, `4dx`, ...
/// 6. remove everything outside `[a-z0-9 ]`, then collapse whitespace
pub fn normalize(raw: &str) -> String {
    let mut out = html_escape::decode_html_entities(raw).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out.to_lowercase();

    static RE_RATING: OnceCell<Regex> = OnceCell::new();
    let re_rating = RE_RATING.get_or_init(|| {
        Regex::new(r"\(\s*(?:pg|nc|tv|tbc)?\s*-?\s*\d{1,2}\s*\+?\s*\)|\(\s*u\s*/?\s*a?\s*\)|\(\s*(?:pg|r|g)\s*\)")
            .unwrap()
    });
    out = re_rating.replace_all(&out, " ").to_string();

    out = strip_language_words(&out);
    out = strip_noise_words(&out);

    static RE_STRIP: OnceCell<Regex> = OnceCell::new();
    let re_strip = RE_STRIP.get_or_init(|| Regex::new(r"[^a-z0-9\s]+").unwrap());
    out = re_strip.replace_all(&out, "").to_string();

    // Second word passes: the punctuation strip can fuse tokens into noise
    // or language words ("3-d" -> "3d", "ara-bic" -> "arabic"), and
    // idempotence requires those to go too. Ratings are safe, their
    // parentheses are gone by now.
    out = strip_language_words(&out);
    out = strip_noise_words(&out);

    collapse_whitespace(&out)
}

fn strip_language_words(s: &str) -> String {
    static RE_LANG: OnceCell<Regex> = OnceCell::new();
    let re_lang = RE_LANG.get_or_init(|| {
        Regex::new(
            r"\(\s*(?:arabic|english|hindi|tamil|malayalam|telugu|ar|en|hi|ta|ml|te)\s*\)|\b(?:arabic|english|hindi|tamil|malayalam|telugu)\b",
        )
        .unwrap()
    });
    re_lang.replace_all(s, " ").to_string()
}

fn strip_noise_words(s: &str) -> String {
    static RE_NOISE: OnceCell<Regex> = OnceCell::new();
    let re_noise = RE_NOISE.get_or_init(|| {
        Regex::new(r"\bbook\s+now\b|\b(?:2d|3d|imax|4dx|dolby|atmos|screenx)\b").unwrap()
    });
    re_noise.replace_all(s, " ").to_string()
}

fn collapse_whitespace(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(s, " ").trim().to_string()
}

/// True when the normalized form contains only ASCII digits (page counters
/// and showtime fragments, never titles).
pub fn is_all_digits(normalized: &str) -> bool {
    !normalized.is_empty() && normalized.chars().all(|c| c.is_ascii_digit())
}
