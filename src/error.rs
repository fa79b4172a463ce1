use thiserror::Error;

/// Invalid strategy selection, reported before any I/O happens.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("category and authority extraction are mutually exclusive")]
    ConflictingMarkers,

    #[error("wikidata decoding cannot be combined with {0} extraction")]
    DecodeWithMarker(&'static str),

    #[error("invalid {kind} marker {marker:?}")]
    InvalidMarker {
        kind: &'static str,
        marker: String,
        #[source]
        source: regex::Error,
    },
}

/// A single page could not be turned into output. The pipeline skips it and moves on.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to decode structured content of {title:?}")]
    Parse {
        title: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize {title:?}")]
    Serialize {
        title: String,
        #[source]
        source: serde_json::Error,
    },
}
