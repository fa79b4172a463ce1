//! Wikistream: streaming extraction from Wikipedia and Wikidata XML dumps
//!
//! A dump is read once, page by page, and each page is turned into output lines
//! by one of four strategies chosen at startup:
//!
//! - **Vanilla JSON** -- the page as a JSON document (title, canonical title, redirect, text)
//! - **Wikidata JSON** -- the page text decoded as JSON and embedded as structured content
//! - **Category TSV** -- `title<TAB>category` for every category link
//! - **Authority TSV** -- `title<TAB>template` for the first authority control template
//!
//! Redirects and pages in non-content namespaces (files, talk pages, user pages, ...)
//! never produce output.
//!
//! # Architecture
//!
//! - **Streaming XML parsing** -- Never loads the full dump into memory; bz2 dumps are
//!   decompressed on the fly
//! - **Worker pool** -- N threads share one immutable [`strategy::Extractor`] and pull
//!   pages from a bounded intake channel
//! - **Single collector** -- one thread owns the output and writes lines as they arrive
//! - **Explicit shutdown** -- one stop signal per worker, one acknowledgment back per
//!   worker, and only then is the output closed
//!
//! # Key Modules
//!
//! - [`parser`] -- Streaming `<page>` reader
//! - [`title`] -- Title canonicalization and namespace filtering
//! - [`content`] -- Category and authority-control scanning
//! - [`strategy`] -- Strategy selection and per-page processing
//! - [`extract`] -- Worker pool and shutdown coordination
//! - [`sink`] -- Output collector
//! - [`models`] -- Core data types (Page, Redirect, WikidataPage)
//! - [`stats`] -- Per-run counters
//! - [`error`] -- Configuration and per-record errors
//! - [`config`] -- Constants
//!
//! # Example Usage
//!
//! ```bash
//! # Pages as JSON lines
//! wikistream enwiki-latest-pages-articles.xml.bz2 > pages.jsonl
//!
//! # Category TSV from a German dump, 8 workers
//! wikistream -c Kategorie -w 8 -o categories.tsv dewiki-latest-pages-articles.xml.bz2
//!
//! # Decode Wikidata entity JSON
//! wikistream -d wikidatawiki-latest-pages-articles.xml.bz2
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod extract;
pub mod models;
pub mod parser;
pub mod sink;
pub mod stats;
pub mod strategy;
pub mod title;
