use crate::config::EXCLUDED_NAMESPACES;
use crate::content::{
    authority_pattern, category_pattern, extract_authority_control, extract_categories,
};
use crate::error::{ConfigError, RecordError};
use crate::models::{Page, WikidataPage};
use crate::title::{canonicalize, NamespaceFilter};
use regex::Regex;
use serde_json::Value;

/// Strategy flags as they come from the command line.
///
/// Empty markers count as unset.
#[derive(Debug, Clone, Default)]
pub struct StrategyOptions {
    pub category_marker: Option<String>,
    pub authority_marker: Option<String>,
    pub decode_wikidata: bool,
}

/// How each eligible page is turned into output lines. Chosen once per run.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// The page itself as JSON.
    Vanilla,
    /// The page as JSON with its text decoded into structured content.
    Wikidata,
    /// `title<TAB>category`, one line per category reference.
    Categories { pattern: Regex },
    /// `title<TAB>template`, for the first authority template only.
    Authority { pattern: Regex },
}

impl Strategy {
    pub fn select(options: &StrategyOptions) -> Result<Self, ConfigError> {
        let category = options.category_marker.as_deref().filter(|m| !m.is_empty());
        let authority = options.authority_marker.as_deref().filter(|m| !m.is_empty());

        match (category, authority, options.decode_wikidata) {
            (Some(_), Some(_), _) => Err(ConfigError::ConflictingMarkers),
            (Some(_), None, true) => Err(ConfigError::DecodeWithMarker("category")),
            (None, Some(_), true) => Err(ConfigError::DecodeWithMarker("authority")),
            (Some(marker), None, false) => {
                let pattern =
                    category_pattern(marker).map_err(|source| ConfigError::InvalidMarker {
                        kind: "category",
                        marker: marker.to_string(),
                        source,
                    })?;
                Ok(Self::Categories { pattern })
            }
            (None, Some(marker), false) => {
                let pattern =
                    authority_pattern(marker).map_err(|source| ConfigError::InvalidMarker {
                        kind: "authority",
                        marker: marker.to_string(),
                        source,
                    })?;
                Ok(Self::Authority { pattern })
            }
            (None, None, true) => Ok(Self::Wikidata),
            (None, None, false) => Ok(Self::Vanilla),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Vanilla => "vanilla-json",
            Self::Wikidata => "wikidata-json",
            Self::Categories { .. } => "category-tsv",
            Self::Authority { .. } => "authority-tsv",
        }
    }

    fn apply(&self, page: &Page) -> Result<Vec<String>, RecordError> {
        match self {
            Self::Vanilla => {
                let line = serde_json::to_string(page).map_err(|source| RecordError::Serialize {
                    title: page.title.clone(),
                    source,
                })?;
                Ok(vec![line])
            }
            Self::Wikidata => {
                let content: Value =
                    serde_json::from_str(&page.text).map_err(|source| RecordError::Parse {
                        title: page.title.clone(),
                        source,
                    })?;
                let envelope = WikidataPage {
                    title: &page.title,
                    canonical_title: &page.canonical_title,
                    redirect: &page.redirect,
                    content,
                };
                let line =
                    serde_json::to_string(&envelope).map_err(|source| RecordError::Serialize {
                        title: page.title.clone(),
                        source,
                    })?;
                Ok(vec![line])
            }
            Self::Categories { pattern } => Ok(extract_categories(pattern, &page.text)
                .into_iter()
                .map(|category| format!("{}\t{}", page.title, category))
                .collect()),
            Self::Authority { pattern } => Ok(extract_authority_control(pattern, &page.text)
                .map(|template| format!("{}\t{}", page.title, template))
                .into_iter()
                .collect()),
        }
    }
}

/// The per-record capability every worker runs: canonicalize, filter, apply the strategy.
///
/// Immutable after construction and shared by reference across workers.
#[derive(Debug, Clone)]
pub struct Extractor {
    strategy: Strategy,
    filter: NamespaceFilter,
    title_filter: Option<String>,
}

impl Extractor {
    pub fn new(strategy: Strategy) -> Result<Self, regex::Error> {
        Ok(Self {
            strategy,
            filter: NamespaceFilter::new(EXCLUDED_NAMESPACES)?,
            title_filter: None,
        })
    }

    /// Only pages whose title contains `needle` produce output.
    pub fn with_title_filter(mut self, needle: Option<String>) -> Self {
        self.title_filter = needle.filter(|n| !n.is_empty());
        self
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Output lines for one page; ineligible pages yield none.
    pub fn process(&self, mut page: Page) -> Result<Vec<String>, RecordError> {
        page.canonical_title = canonicalize(&page.title);

        if !self
            .filter
            .is_eligible(&page.canonical_title, &page.redirect.title)
        {
            return Ok(Vec::new());
        }
        if let Some(needle) = &self.title_filter {
            if !page.title.contains(needle.as_str()) {
                return Ok(Vec::new());
            }
        }

        self.strategy.apply(&page)
    }
}
