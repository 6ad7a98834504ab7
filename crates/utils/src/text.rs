use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::unwrap_used)]
static REPEATED_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s\s+").unwrap());

/// Trim both ends and replace every run of two or more whitespace characters with one space.
///
/// Single whitespace characters inside the text are kept as they are.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
	REPEATED_WS.replace_all(text.trim(), " ").into_owned()
}
