//! Streaming Atom decoding
//!
//! [`FeedReader`] pulls XML events from an async byte source and yields one
//! [`FilingCandidate`] per `<entry>` without building a document tree. Only
//! three things are read from each entry: `title`, `summary`, and the href of
//! the last `link` whose `rel` is absent or `alternate`.
//!
//! [`parse_feed`] drains a reader into a `Vec` and is all-or-nothing: a
//! malformed document yields an error, never a partial list.

use crate::error::ParseError;
use crate::types::FilingCandidate;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tokio::io::AsyncBufRead;
use url::Url;


/// Text element currently collecting character data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TextTarget {
    Title,
    Summary,
}

impl TextTarget {
    fn tag(self) -> &'static [u8] {
        match self {
            TextTarget::Title => b"title",
            TextTarget::Summary => b"summary",
        }
    }
}

/// Per-entry accumulators
#[derive(Debug, Default)]
struct EntryState {
    in_entry: bool,
    target: Option<TextTarget>,
    title: String,
    summary: String,
    link: Option<String>,
}

impl EntryState {
    fn open(&mut self, element: &BytesStart<'_>) -> Result<(), ParseError> {
        let name = element.local_name();
        let name = name.as_ref();

        if name == b"entry" {
            *self = EntryState {
                in_entry: true,
                ..Default::default()
            };
            return Ok(());
        }
        if !self.in_entry {
            return Ok(());
        }

        // Any other element inside an entry stops text collection until it closes
        self.target = match name {
            b"title" => Some(TextTarget::Title),
            b"summary" => Some(TextTarget::Summary),
            _ => None,
        };

        if name == b"link"
            && let Some(href) = alternate_href(element)?
        {
            self.link = Some(href);
        }
        Ok(())
    }

    fn text(&mut self, content: &str) {
        if !self.in_entry || content.trim().is_empty() {
            return;
        }
        match self.target {
            Some(TextTarget::Title) => self.title.push_str(content),
            Some(TextTarget::Summary) => self.summary.push_str(content),
            None => {}
        }
    }

    fn close(&mut self, name: &[u8], origin: &Url) -> Option<FilingCandidate> {
        if name == b"entry" && self.in_entry {
            let state = std::mem::take(self);
            return Some(state.into_candidate(origin));
        }
        if self.target.is_some_and(|target| target.tag() == name) {
            self.target = None;
        }
        None
    }

    fn into_candidate(self, origin: &Url) -> FilingCandidate {
        let title = decode_entities(self.title.trim());
        let summary = decode_entities(self.summary.trim());

        let href = self.link.unwrap_or_default();
        if href.trim().is_empty() {
            tracing::warn!(
                title = %title,
                origin = %origin,
                "Feed entry has no alternate link; its identity falls back to the feed origin"
            );
        }

        FilingCandidate {
            title,
            link: resolve_link(origin, &href),
            summary,
        }
    }
}

/// Return the href of a `link` element whose `rel` is missing or `alternate`
fn alternate_href(element: &BytesStart<'_>) -> Result<Option<String>, ParseError> {
    let mut rel = None;
    let mut href = None;

    for attr in element.attributes() {
        let attr = attr?;
        match attr.key.local_name().as_ref() {
            b"rel" => rel = Some(attr.unescape_value()?.into_owned()),
            b"href" => href = Some(attr.unescape_value()?.into_owned()),
            _ => {}
        }
    }

    let accepted = rel.as_deref().is_none_or(|rel| rel == "alternate");
    Ok(href.filter(|_| accepted))
}

/// Decode the five predefined XML entities in a single pass
///
/// Feed summaries often carry HTML that was escaped twice; the XML reader
/// undoes the first layer and this undoes the second. Unknown references are
/// left as written.
pub fn decode_entities(text: &str) -> String {
    const ENTITIES: [(&str, char); 5] = [
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&amp;", '&'),
        ("&quot;", '"'),
        ("&apos;", '\''),
    ];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        match ENTITIES
            .iter()
            .find(|(entity, _)| rest.starts_with(entity))
        {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Make an entry link absolute against the feed origin
///
/// Absolute URLs are kept verbatim; origin-relative and path-relative hrefs are
/// joined onto `origin`. An empty href resolves to the bare origin with no
/// trailing slash, e.g. `https://www.sec.gov`.
pub fn resolve_link(origin: &Url, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return origin.as_str().trim_end_matches('/').to_string();
    }
    if Url::parse(href).is_ok() {
        return href.to_string();
    }
    match origin.join(href) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}{}", origin.as_str().trim_end_matches('/'), href),
    }
}

/// Lazy, single-pass reader of filing candidates from an Atom byte stream
///
/// Candidates come out in document order. After the end of the document or
/// the first error the reader is exhausted and keeps returning `Ok(None)`.
pub struct FeedReader<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    origin: Url,
    state: EntryState,
    depth: usize,
    saw_root: bool,
    done: bool,
}

impl<R: AsyncBufRead + Unpin> FeedReader<R> {
    /// Wrap a byte source; relative links resolve against `origin`
    pub fn new(source: R, origin: Url) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.check_end_names(true);

        Self {
            reader,
            buf: Vec::with_capacity(4096),
            origin,
            state: EntryState::default(),
            depth: 0,
            saw_root: false,
            done: false,
        }
    }

    /// Decode up to the next complete entry
    ///
    /// Returns `Ok(None)` once the document has ended cleanly.
    pub async fn next_candidate(&mut self) -> Result<Option<FilingCandidate>, ParseError> {
        if self.done {
            return Ok(None);
        }

        let result = self.advance().await;
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }
        result
    }

    async fn advance(&mut self) -> Result<Option<FilingCandidate>, ParseError> {
        loop {
            self.buf.clear();
            let event = self.reader.read_event_into_async(&mut self.buf).await?;

            match event {
                Event::Start(element) => {
                    if self.depth == 0 {
                        check_root(&element)?;
                        self.saw_root = true;
                    }
                    self.depth += 1;
                    self.state.open(&element)?;
                }
                Event::Empty(element) => {
                    if self.depth == 0 {
                        check_root(&element)?;
                        self.saw_root = true;
                    }
                    self.state.open(&element)?;
                    let name = element.local_name();
                    if let Some(candidate) = self.state.close(name.as_ref(), &self.origin) {
                        return Ok(Some(candidate));
                    }
                }
                Event::End(element) => {
                    self.depth = self.depth.saturating_sub(1);
                    let name = element.local_name();
                    if let Some(candidate) = self.state.close(name.as_ref(), &self.origin) {
                        return Ok(Some(candidate));
                    }
                }
                Event::Text(text) => {
                    let content = text.unescape()?;
                    self.state.text(&content);
                }
                Event::CData(data) => {
                    let raw = data.into_inner();
                    let content = std::str::from_utf8(&raw)?;
                    self.state.text(content);
                }
                Event::Eof => {
                    if !self.saw_root {
                        return Err(ParseError::MissingRoot);
                    }
                    if self.depth > 0 {
                        return Err(ParseError::UnexpectedEof { open: self.depth });
                    }
                    return Ok(None);
                }
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
            }
        }
    }
}

fn check_root(element: &BytesStart<'_>) -> Result<(), ParseError> {
    let name = element.local_name();
    if name.as_ref() == b"feed" {
        Ok(())
    } else {
        Err(ParseError::UnexpectedRoot(
            String::from_utf8_lossy(name.as_ref()).into_owned(),
        ))
    }
}

/// Decode a whole Atom document into candidates, in document order
///
/// Fails without returning any candidates if the document is malformed.
pub async fn parse_feed<R>(source: R, origin: &Url) -> Result<Vec<FilingCandidate>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut reader = FeedReader::new(source, origin.clone());
    let mut candidates = Vec::new();
    while let Some(candidate) = reader.next_candidate().await? {
        candidates.push(candidate);
    }
    Ok(candidates)
}
