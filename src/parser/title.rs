//! Title normalization used as the identity key when matching events.

use super::duration::{parse_group, BRACKET_RE};
use regex::Captures;

/// Strip every duration annotation from a title.
///
/// Brackets that do not follow the annotation grammar (`[time]`, `[]`) are
/// part of the title and stay. Whitespace runs collapse to one space.
pub fn normalize_title(title: &str) -> String {
    let stripped = BRACKET_RE.replace_all(title, |caps: &Captures| {
        if parse_group(&caps[1]).is_some() {
            " ".to_string()
        } else {
            caps[0].to_string()
        }
    });
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Two titles name the same logical event when they only differ by their
/// annotated duration. Comparison is exact and case-sensitive.
pub fn titles_equivalent(a: &str, b: &str) -> bool {
    normalize_title(a) == normalize_title(b)
}
