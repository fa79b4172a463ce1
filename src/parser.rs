use crate::config::INPUT_BUFFER_SIZE;
use crate::models::Page;
use anyhow::{Context, Result};
use bzip2::read::MultiBzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Title,
    Text,
}

/// Streams `<page>` elements out of a MediaWiki XML export, one at a time.
///
/// Only the page currently being decoded is held in memory. Malformed markup
/// ends the stream; whatever was yielded before stays valid.
pub struct PageReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    page: Option<Page>,
    // element depth relative to <page>, which is depth 1
    depth: usize,
    in_revision: bool,
    field: Field,
    done: bool,
}

impl PageReader<Box<dyn BufRead>> {
    /// Opens a dump on disk, decompressing it on the fly when the path ends in `.bz2`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open wiki dump at: {}", path.display()))?;

        let compressed = path.extension().is_some_and(|ext| ext == "bz2");
        let inner: Box<dyn BufRead> = if compressed {
            debug!(path = %path.display(), "Reading bz2-compressed dump");
            Box::new(BufReader::with_capacity(
                INPUT_BUFFER_SIZE,
                MultiBzDecoder::new(file),
            ))
        } else {
            Box::new(BufReader::with_capacity(INPUT_BUFFER_SIZE, file))
        };

        Ok(Self::new(inner))
    }
}

impl<R: BufRead> PageReader<R> {
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.trim_text(false);
        Self {
            reader,
            buf: Vec::with_capacity(64 * 1024),
            page: None,
            depth: 0,
            in_revision: false,
            field: Field::None,
            done: false,
        }
    }

    fn stop(&mut self, reason: &str) {
        if let Some(page) = self.page.take() {
            warn!(title = %page.title, "Discarding truncated page");
        }
        debug!(
            position = self.reader.buffer_position(),
            reason,
            "Page stream finished"
        );
        self.done = true;
    }
}

impl<R: BufRead> Iterator for PageReader<R> {
    type Item = Page;

    fn next(&mut self) -> Option<Page> {
        if self.done {
            return None;
        }

        loop {
            self.buf.clear();
            let mut finished = None;

            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => match self.page.as_mut() {
                    None => {
                        if e.local_name().as_ref() == b"page" {
                            self.page = Some(Page::default());
                            self.depth = 1;
                            self.in_revision = false;
                            self.field = Field::None;
                        }
                    }
                    Some(page) => {
                        self.depth += 1;
                        match (self.depth, e.local_name().as_ref()) {
                            (2, b"title") => {
                                page.title.clear();
                                self.field = Field::Title;
                            }
                            (2, b"revision") => self.in_revision = true,
                            (3, b"text") if self.in_revision => {
                                page.text.clear();
                                self.field = Field::Text;
                            }
                            (2, b"redirect") => match redirect_target(&e) {
                                Ok(Some(target)) => page.redirect.title = target,
                                Ok(None) => {}
                                Err(err) => {
                                    warn!(error = %err, "Bad redirect attribute");
                                    finished = Some("malformed");
                                }
                            },
                            _ => {}
                        }
                    }
                },
                Ok(Event::Empty(e)) => {
                    if let Some(page) = self.page.as_mut() {
                        if self.depth == 1 && e.local_name().as_ref() == b"redirect" {
                            match redirect_target(&e) {
                                Ok(Some(target)) => page.redirect.title = target,
                                Ok(None) => {}
                                Err(err) => {
                                    warn!(error = %err, "Bad redirect attribute");
                                    finished = Some("malformed");
                                }
                            }
                        }
                    }
                }
                Ok(Event::Text(e)) => {
                    let target = match (self.page.as_mut(), self.field) {
                        (Some(page), Field::Title) => Some(&mut page.title),
                        (Some(page), Field::Text) => Some(&mut page.text),
                        _ => None,
                    };
                    if let Some(target) = target {
                        match e.unescape() {
                            Ok(text) => target.push_str(&text),
                            Err(err) => {
                                warn!(error = %err, "Bad character data");
                                finished = Some("malformed");
                            }
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    let target = match (self.page.as_mut(), self.field) {
                        (Some(page), Field::Title) => Some(&mut page.title),
                        (Some(page), Field::Text) => Some(&mut page.text),
                        _ => None,
                    };
                    if let Some(target) = target {
                        target.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Ok(Event::End(e)) => {
                    if self.page.is_some() {
                        if self.depth == 1 {
                            self.depth = 0;
                            self.field = Field::None;
                            return self.page.take();
                        }
                        if self.depth == 2 && e.local_name().as_ref() == b"revision" {
                            self.in_revision = false;
                        }
                        self.field = Field::None;
                        self.depth -= 1;
                    }
                }
                Ok(Event::Eof) => finished = Some("eof"),
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "Malformed XML");
                    finished = Some("malformed");
                }
            }

            if let Some(reason) = finished {
                self.stop(reason);
                return None;
            }
        }
    }
}

fn redirect_target(element: &BytesStart<'_>) -> Result<Option<String>> {
    match element.try_get_attribute("title")? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(xml: &str) -> Vec<Page> {
        PageReader::new(xml.as_bytes()).collect()
    }

    #[test]
    fn reads_title_redirect_and_text() {
        let xml = r#"<mediawiki>
            <page>
                <title>Apollo 11</title>
                <ns>0</ns>
                <redirect title="Apollo &amp; friends" />
                <revision>
                    <id>1</id>
                    <text xml:space="preserve">{{Infobox
|mission_name=&lt;!--See above--&gt;
}}</text>
                </revision>
            </page>
        </mediawiki>"#;

        let pages = pages(xml);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "Apollo 11");
        assert_eq!(pages[0].redirect.title, "Apollo & friends");
        assert_eq!(pages[0].text, "{{Infobox\n|mission_name=<!--See above-->\n}}");
        assert!(pages[0].canonical_title.is_empty());
    }

    #[test]
    fn yields_pages_in_document_order() {
        let xml = "<mediawiki>\
            <page><title>A</title><revision><text>a</text></revision></page>\
            <page><title>B</title><revision><text>b</text></revision></page>\
            <page><title>C</title><revision><text>c</text></revision></page>\
            </mediawiki>";
        let titles: Vec<_> = pages(xml).into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn missing_redirect_and_text_are_empty() {
        let xml = "<mediawiki><page><title>Lonely</title></page></mediawiki>";
        let pages = pages(xml);
        assert_eq!(pages.len(), 1);
        assert!(!pages[0].is_redirect());
        assert!(pages[0].text.is_empty());
    }

    #[test]
    fn ignores_nested_title_elements() {
        let xml = "<mediawiki><page><title>Outer</title>\
            <revision><contributor><title>Inner</title></contributor><text>body</text></revision>\
            </page></mediawiki>";
        let pages = pages(xml);
        assert_eq!(pages[0].title, "Outer");
        assert_eq!(pages[0].text, "body");
    }

    #[test]
    fn reads_cdata_text() {
        let xml = "<mediawiki><page><title>T</title><revision>\
            <text><![CDATA[<b>raw</b>]]></text></revision></page></mediawiki>";
        assert_eq!(pages(xml)[0].text, "<b>raw</b>");
    }

    #[test]
    fn malformed_markup_ends_stream_after_complete_pages() {
        let xml = "<mediawiki>\
            <page><title>Good</title><revision><text>ok</text></revision></page>\
            <page><title>Bad</title><revision><text>oops</title></revision></page>\
            <page><title>Never</title></page>\
            </mediawiki>";
        let titles: Vec<_> = pages(xml).into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["Good"]);
    }

    #[test]
    fn truncated_input_drops_partial_page() {
        let xml = "<mediawiki>\
            <page><title>Whole</title><revision><text>ok</text></revision></page>\
            <page><title>Half</title><revision><text>cut";
        let titles: Vec<_> = pages(xml).into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["Whole"]);
    }

    #[test]
    fn stream_is_not_restartable() {
        let xml = "<mediawiki><page><title>Once</title></page></mediawiki>";
        let mut reader = PageReader::new(xml.as_bytes());
        assert!(reader.next().is_some());
        assert!(reader.next().is_none());
        assert!(reader.next().is_none());
    }

    #[test]
    fn open_missing_file_fails() {
        let err = PageReader::open("/definitely/not/here.xml")
            .err()
            .expect("opening a missing dump should fail");
        assert!(err.to_string().contains("Failed to open wiki dump"));
    }
}
