//! Version label parsing and comparison.
//!
//! Labels on tool pages look like `"Winaero Tweaker 1.30.1 Build 4"`. The
//! trailing number groups become the version token (`"1.30.1.4"`) and the
//! rest becomes the display name.

use regex::Regex;
use std::sync::LazyLock;

/// Token assumed for entries that have never been downloaded.
pub const ZERO_VERSION: &str = "0";

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r" R?(\d+\s*\.?(?i:build)?\s*)+").expect("version pattern is valid")
});

static BUILD_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)build").expect("build pattern is valid"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Display name and version token extracted from a raw page label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLabel {
    pub name: String,
    pub version: Option<String>,
}

/// Split `raw_label` into a canonical name and a version token.
///
/// When the label carries no recognizable version, `fallback_name` is used
/// as the name and no token is returned.
pub fn parse(raw_label: &str, fallback_name: &str) -> ParsedLabel {
    let Some(found) = VERSION_PATTERN.find(raw_label) else {
        return ParsedLabel {
            name: fallback_name.to_string(),
            version: None,
        };
    };

    let matched = found.as_str();
    let folded = BUILD_WORD.replace_all(matched, ".");
    let version = WHITESPACE.replace_all(&folded, "").into_owned();

    let remainder = raw_label.replace(matched, "");
    let name = WHITESPACE.replace_all(remainder.trim(), " ").into_owned();

    ParsedLabel {
        name,
        version: Some(version),
    }
}

/// Whether `candidate` should replace `stored`.
///
/// Tokens are ordered as plain strings, so `"10"` sorts before `"9"`. Every
/// update decision goes through here.
pub fn is_newer(candidate: &str, stored: &str) -> bool {
    candidate > stored
}
