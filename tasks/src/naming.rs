//! Identifier case conversion.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

#[allow(clippy::expect_used)]
static INNER_ACRONYM: Lazy<Regex> =
    Lazy::new(|| Regex::new("[A-Z][A-Z0-9]+[a-z0-9]").expect("valid regex"));

#[allow(clippy::expect_used)]
static TRAILING_ACRONYM: Lazy<Regex> =
    Lazy::new(|| Regex::new("[A-Z][A-Z]+$").expect("valid regex"));

/// Convert a camelCase identifier to kebab-case.
///
/// Acronyms are kept as one word as long as two of them do not follow each
/// other.
///
/// ```
/// use boilerplate_tasks::camel_to_kebab;
///
/// assert_eq!(camel_to_kebab("listenPort"), "listen-port");
/// assert_eq!(camel_to_kebab("serverURLPath"), "server-url-path");
/// assert_eq!(camel_to_kebab("useHTML"), "use-html");
/// ```
#[must_use]
pub fn camel_to_kebab(camel: &str) -> String {
    let mut chars = camel.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let capitalized: String = first.to_uppercase().chain(chars).collect();

    // "URLPa" becomes "UrlPa": the last capital starts the next word
    let folded = INNER_ACRONYM.replace_all(&capitalized, |caps: &Captures<'_>| {
        let word = &caps[0];
        let (head, tail) = word.split_at(word.len() - 2);
        format!("{}{}{}", &head[..1], head[1..].to_lowercase(), tail)
    });
    let folded = TRAILING_ACRONYM.replace(&folded, |caps: &Captures<'_>| {
        let word = &caps[0];
        format!("{}{}", &word[..1], word[1..].to_lowercase())
    });

    let mut words: Vec<String> = Vec::new();
    for c in folded.chars() {
        match words.last_mut() {
            Some(word) if !c.is_ascii_uppercase() => word.push(c),
            _ => words.push(c.to_string()),
        }
    }
    words
        .iter()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}
