//! Text normalization shared by the import parser and the matcher.
//!
//! Everything the matcher compares goes through [`normalize_for_match`], so
//! a query and a search candidate always see the same transformation.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Collapse runs of whitespace into a single space.
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Featured-artist tokens removed when simplifying an artist name.
/// Matches the token itself, not what follows it.
static FEATURING_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"feat\.|featuring|ft\.").unwrap());

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to lowercase ASCII: NFKD, drop combining marks,
/// then transliterate whatever is left.
/// e.g., "Beyoncé" → "beyonce", "Motörhead" → "motorhead"
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

/// Map typographic punctuation to its ASCII equivalent.
/// Curly quotes become straight quotes, dash variants become `-`,
/// and the ellipsis glyph becomes `...`.
pub fn normalize_punctuation(s: &str) -> String {
    s.replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(
            ['\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2015}'],
            "-",
        )
        .replace('\u{2026}', "...")
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Normalize a title or artist for comparison.
///
/// Punctuation is mapped to ASCII and the result lowercased. With `fold`
/// set, accented and non-Latin letters are folded to ASCII as well, so
/// "Beyoncé" and "Beyonce" compare equal.
pub fn normalize_for_match(s: &str, fold: bool) -> String {
    let punct = normalize_punctuation(s);
    if fold {
        fold_to_ascii(&punct)
    } else {
        punct.to_lowercase()
    }
}

/// Reduce an artist name to its significant words.
///
/// Drops possessives, `&`/`and` joiners and featuring tokens, then
/// collapses whitespace: "Florence and the Machine" → "florence the machine".
pub fn simplify_artist(name: &str) -> String {
    let lowered = normalize_punctuation(name).to_lowercase();
    let simplified = lowered
        .replace("'s ", " ")
        .replace("' ", " ")
        .replace(" & ", " ")
        .replace(" and ", " ");
    let simplified = FEATURING_TOKEN.replace_all(&simplified, "");
    MULTI_SPACE.replace_all(simplified.trim(), " ").to_string()
}

/// Strip a leading UTF-8 byte order mark.
pub fn strip_bom(s: &str) -> &str {
    s.strip_prefix('\u{FEFF}').unwrap_or(s)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_punctuation() {
        assert_eq!(normalize_punctuation("Don\u{2019}t Stop"), "Don't Stop");
        assert_eq!(normalize_punctuation("\u{201C}Heroes\u{201D}"), "\"Heroes\"");
        assert_eq!(normalize_punctuation("Jay\u{2013}Z"), "Jay-Z");
        assert_eq!(normalize_punctuation("a\u{2014}b\u{2012}c\u{2010}d"), "a-b-c-d");
        assert_eq!(normalize_punctuation("Wait\u{2026}"), "Wait...");
    }

    #[test]
    fn test_normalize_for_match() {
        assert_eq!(normalize_for_match("Don\u{2019}t Stop Me Now", false), "don't stop me now");
        assert_eq!(normalize_for_match("Beyoncé", false), "beyoncé");
        assert_eq!(normalize_for_match("Beyoncé", true), "beyonce");
        assert_eq!(normalize_for_match("Sigur Rós", true), "sigur ros");
    }

    #[test]
    fn test_fold_to_ascii() {
        assert_eq!(fold_to_ascii("Björk"), "bjork");
        assert_eq!(fold_to_ascii("Motörhead"), "motorhead");
        assert_eq!(fold_to_ascii("кино"), "kino");
    }

    #[test]
    fn test_simplify_artist() {
        assert_eq!(simplify_artist("Florence and the Machine"), "florence the machine");
        assert_eq!(simplify_artist("Simon & Garfunkel"), "simon garfunkel");
        assert_eq!(simplify_artist("Guns N' Roses"), "guns n roses");
        assert_eq!(simplify_artist("Mumford & Sons"), "mumford sons");
        assert_eq!(simplify_artist("Calvin Harris feat. Rihanna"), "calvin harris rihanna");
        assert_eq!(simplify_artist("Drake ft. Future"), "drake future");
        assert_eq!(simplify_artist("Santana featuring  Rob Thomas"), "santana rob thomas");
    }

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom("\u{FEFF}Artist,Title"), "Artist,Title");
        assert_eq!(strip_bom("Artist,Title"), "Artist,Title");
    }
}
