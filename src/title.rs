use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

/// Bytes left as-is in a canonical title. `:` stays readable so namespace
/// prefixes can be matched, `%` stays so a canonical title is its own canonical form.
const TITLE_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b':')
    .remove(b'%');

/// Lowercases, swaps spaces for underscores and percent-encodes a page title.
pub fn canonicalize(title: &str) -> String {
    let lowered = title.to_lowercase().replace(' ', "_");
    utf8_percent_encode(&lowered, TITLE_ESCAPE)
        .to_string()
        .to_ascii_lowercase()
}

/// Excludes non-content namespaces by canonical title prefix.
#[derive(Debug, Clone)]
pub struct NamespaceFilter {
    pattern: Regex,
}

impl NamespaceFilter {
    pub fn new(namespaces: &[&str]) -> Result<Self, regex::Error> {
        let alternatives = namespaces
            .iter()
            .map(|ns| regex::escape(ns))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!("(?i)^(?:{}):", alternatives))?;
        Ok(Self { pattern })
    }

    pub fn is_excluded(&self, canonical_title: &str) -> bool {
        self.pattern.is_match(canonical_title)
    }

    /// A page is eligible when it is not a redirect and lives outside the excluded namespaces.
    pub fn is_eligible(&self, canonical_title: &str, redirect_title: &str) -> bool {
        redirect_title.is_empty() && !self.is_excluded(canonical_title)
    }
}
