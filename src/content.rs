use regex::{Regex, RegexBuilder};

/// Matches `[[<marker>:<value>]]` and captures the value, sort key included.
pub fn category_pattern(marker: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"\[\[{}:([^\[]+)\]\]", regex::escape(marker)))
}

/// Matches the first `{{<marker> ...}}` template, case-insensitive and across lines.
pub fn authority_pattern(marker: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&format!(r"\{{\{{{}.*?\}}\}}", regex::escape(marker)))
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
}

/// Every category referenced in `text`, with sort keys after `|` dropped.
pub fn extract_categories<'t>(pattern: &Regex, text: &'t str) -> Vec<&'t str> {
    pattern
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| {
            let category = m.as_str().trim();
            match category.find('|') {
                Some(pipe) => &category[..pipe],
                None => category,
            }
        })
        .collect()
}

/// The first matching template with tabs removed, so it fits in a TSV field.
pub fn extract_authority_control(pattern: &Regex, text: &str) -> Option<String> {
    pattern.find(text).map(|m| m.as_str().replace('\t', ""))
}
