//! Splitting a main document part into body-level content blocks.
//!
//! The main document part of a Word package looks like
//!
//! ```text
//! <w:document xmlns:w="..." ...>
//!   <w:background .../>            (preamble, optional)
//!   <w:body>
//!     <w:p>...</w:p>               (blocks)
//!     <w:tbl>...</w:tbl>
//!     <w:sectPr>...</w:sectPr>     (final section properties)
//!   </w:body>
//! </w:document>
//! ```
//!
//! [`DocumentBody::parse`] keeps every block as a verbatim XML fragment.
//! [`rewrite_fragment`] re-reads a fragment and lets an [`ElementRewriter`]
//! change or drop elements on the way through.

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;

use crate::error::{DocxCatError, Result};
use crate::package::xml::{self, W_NS};

/// Kind of a body-level block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    /// A paragraph (`w:p`), including any runs, images and links in it.
    Paragraph,
    /// A table (`w:tbl`).
    Table,
    /// A separator inserted between two source documents.
    PageBreak,
    /// Any other body-level element (content controls, bookmarks, ...).
    Other,
}

impl BlockKind {
    fn from_local_name(local: &[u8]) -> Self {
        match local {
            b"p" => Self::Paragraph,
            b"tbl" => Self::Table,
            _ => Self::Other,
        }
    }
}

/// The root element of a main document part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootElement {
    /// Qualified element name (`w:document`).
    pub name: String,
    /// Attributes in document order, values unescaped.
    pub attributes: Vec<(String, String)>,
}

impl RootElement {
    fn from_start(e: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            attributes.push((
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                attr.unescape_value()?.into_owned(),
            ));
        }
        Ok(Self { name, attributes })
    }

    /// Namespace declarations as `(prefix, uri)` pairs.
    pub fn namespaces(&self) -> Vec<(String, String)> {
        self.attributes
            .iter()
            .filter_map(|(key, value)| {
                if key == "xmlns" {
                    Some((String::new(), value.clone()))
                } else {
                    key.strip_prefix("xmlns:")
                        .map(|prefix| (prefix.to_string(), value.clone()))
                }
            })
            .collect()
    }

    /// Value of an attribute by qualified name.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    /// Render the start tag.
    pub fn start_tag(&self) -> String {
        let mut out = format!("<{}", self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&xml::escape(value));
            out.push('"');
        }
        out.push('>');
        out
    }
}

/// A parsed main document part.
#[derive(Debug, Clone)]
pub struct DocumentBody {
    /// Root element of the part.
    pub root: RootElement,
    /// Raw XML between the root start tag and the body.
    pub preamble: String,
    /// Qualified name of the body element (`w:body`).
    pub body_name: String,
    /// Body-level blocks in document order.
    pub blocks: Vec<(BlockKind, String)>,
    /// Final body-level section properties, if any.
    pub section: Option<String>,
    /// Names of all bookmarks started in the body.
    pub bookmark_names: Vec<String>,
    /// Highest numeric bookmark id in the body.
    pub max_bookmark_id: u64,
}

impl DocumentBody {
    /// Parse a main document part.
    ///
    /// # Errors
    ///
    /// Returns [`DocxCatError::MalformedPart`] if the XML is not well formed
    /// or has no body element.
    pub fn parse(part: &str, text: &str) -> Result<Self> {
        let malformed = |details: &dyn std::fmt::Display| DocxCatError::malformed_part(part, details);

        let mut reader = Reader::from_str(text);
        let mut root: Option<RootElement> = None;
        let mut preamble = Writer::new(Vec::new());
        let mut body_name: Option<String> = None;
        let mut in_body = false;
        let mut body_closed = false;
        let mut depth = 0usize;

        let mut blocks = Vec::new();
        let mut section = None;
        let mut bookmark_names = Vec::new();
        let mut max_bookmark_id = 0u64;

        let mut block: Option<(BlockKind, bool, Writer<Vec<u8>>)> = None;
        let mut block_depth = 0usize;

        loop {
            let event = reader.read_event().map_err(|err| malformed(&err))?;

            if let Event::Start(e) | Event::Empty(e) = &event
                && xml::local_name(e.name().as_ref()) == b"bookmarkStart"
            {
                if let Some(name) = xml::attr_local(e, b"name")? {
                    bookmark_names.push(name);
                }
                // Word keeps bookmark ids within 32 bits; larger values are ignored.
                if let Some(id) = xml::attr_local(e, b"id")?
                    .and_then(|v| v.parse::<u32>().ok())
                {
                    max_bookmark_id = max_bookmark_id.max(u64::from(id));
                }
            }

            if let Some((kind, is_section, writer)) = block.as_mut() {
                match &event {
                    Event::Start(_) => block_depth += 1,
                    Event::End(_) => block_depth -= 1,
                    Event::Eof => return Err(malformed(&"unexpected end of document")),
                    _ => {}
                }
                writer.write_event(event)?;
                if block_depth == 0 {
                    let kind = *kind;
                    let is_section = *is_section;
                    let (_, _, writer) = block.take().ok_or_else(|| malformed(&"lost block"))?;
                    let fragment = into_string(writer)?;
                    if is_section {
                        section = Some(fragment);
                    } else {
                        blocks.push((kind, fragment));
                    }
                }
                continue;
            }

            match event {
                Event::Start(e) => {
                    if depth == 0 {
                        root = Some(RootElement::from_start(&e)?);
                    } else if in_body && depth == 2 {
                        let qname = e.name();
                        let local = xml::local_name(qname.as_ref());
                        let is_section = local == b"sectPr";
                        let mut writer = Writer::new(Vec::new());
                        writer.write_event(Event::Start(e.borrow()))?;
                        block = Some((BlockKind::from_local_name(local), is_section, writer));
                        block_depth = 1;
                        continue;
                    } else if depth == 1 && xml::local_name(e.name().as_ref()) == b"body" {
                        if body_name.is_some() {
                            return Err(malformed(&"more than one body element"));
                        }
                        body_name = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                        in_body = true;
                    } else {
                        preamble.write_event(Event::Start(e))?;
                    }
                    depth += 1;
                }
                Event::Empty(e) => {
                    if depth == 0 {
                        return Err(malformed(&"document has no body"));
                    } else if in_body && depth == 2 {
                        let qname = e.name();
                        let local = xml::local_name(qname.as_ref());
                        let mut writer = Writer::new(Vec::new());
                        writer.write_event(Event::Empty(e.borrow()))?;
                        let fragment = into_string(writer)?;
                        if local == b"sectPr" {
                            section = Some(fragment);
                        } else {
                            blocks.push((BlockKind::from_local_name(local), fragment));
                        }
                    } else if depth == 1 && xml::local_name(e.name().as_ref()) == b"body" {
                        body_name = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                        body_closed = true;
                    } else {
                        preamble.write_event(Event::Empty(e))?;
                    }
                }
                Event::End(e) => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| malformed(&"unbalanced end tag"))?;
                    if in_body && depth == 1 {
                        in_body = false;
                        body_closed = true;
                    } else if depth >= 1 && !in_body {
                        preamble.write_event(Event::End(e))?;
                    }
                }
                Event::Text(t) if depth >= 1 && !in_body && !body_closed => {
                    preamble.write_event(Event::Text(t))?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let root = root.ok_or_else(|| malformed(&"document has no root element"))?;
        let body_name = body_name.ok_or_else(|| malformed(&"document has no body"))?;
        if in_body {
            return Err(malformed(&"body is not closed"));
        }

        Ok(Self {
            root,
            preamble: into_string(preamble)?.trim().to_string(),
            body_name,
            blocks,
            section,
            bookmark_names,
            max_bookmark_id,
        })
    }

    /// Prefix bound to the WordprocessingML namespace (usually `w`).
    pub fn word_prefix(&self) -> String {
        let namespaces = self.root.namespaces();
        xml::prefix_for(&namespaces, W_NS)
            .unwrap_or("w")
            .to_string()
    }
}

/// Decision taken by an [`ElementRewriter`] for one element.
pub enum Rewrite {
    /// Write the element unchanged.
    Keep,
    /// Write this element instead.
    Replace(BytesStart<'static>),
    /// Drop the element together with everything inside it.
    Drop,
}

/// Hook used by [`rewrite_fragment`] to edit start and empty elements.
pub trait ElementRewriter {
    /// Decide what to do with one element.
    fn rewrite(&mut self, element: &BytesStart<'_>) -> Result<Rewrite>;

    /// Replacement for the text directly inside the element named `parent`.
    fn rewrite_text(&mut self, _parent: &[u8], _text: &str) -> Option<String> {
        None
    }
}

/// Re-serialize an XML fragment, passing each element through `rewriter`.
///
/// Text, comments and end tags of kept elements are copied verbatim.
pub fn rewrite_fragment<R>(fragment: &str, rewriter: &mut R) -> Result<String>
where
    R: ElementRewriter + ?Sized,
{
    let mut reader = Reader::from_str(fragment);
    let mut writer = Writer::new(Vec::with_capacity(fragment.len()));
    let mut skip_depth = 0usize;
    let mut open: Vec<Vec<u8>> = Vec::new();

    loop {
        let event = reader.read_event()?;

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) => match rewriter.rewrite(&e)? {
                Rewrite::Keep => {
                    open.push(e.name().as_ref().to_vec());
                    writer.write_event(Event::Start(e))?
                }
                Rewrite::Replace(new) => {
                    open.push(new.name().as_ref().to_vec());
                    writer.write_event(Event::Start(new))?
                }
                Rewrite::Drop => skip_depth = 1,
            },
            Event::End(e) => {
                open.pop();
                writer.write_event(Event::End(e))?
            }
            Event::Text(t) => {
                let replacement = match (open.last(), t.unescape()) {
                    (Some(parent), Ok(text)) => rewriter.rewrite_text(parent, &text),
                    _ => None,
                };
                match replacement {
                    Some(text) => writer.write_event(Event::Text(BytesText::new(&text)))?,
                    None => writer.write_event(Event::Text(t))?,
                }
            }
            Event::Empty(e) => match rewriter.rewrite(&e)? {
                Rewrite::Keep => writer.write_event(Event::Empty(e))?,
                Rewrite::Replace(new) => writer.write_event(Event::Empty(new))?,
                Rewrite::Drop => {}
            },
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    into_string(writer)
}

/// Text content (`w:t`) of a fragment, concatenated.
pub fn fragment_text(fragment: &str) -> Result<String> {
    let mut reader = Reader::from_str(fragment);
    let mut text = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if xml::local_name(e.name().as_ref()) == b"t" => in_text = true,
            Event::End(e) if xml::local_name(e.name().as_ref()) == b"t" => in_text = false,
            Event::Text(t) if in_text => text.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

fn into_string(writer: Writer<Vec<u8>>) -> Result<String> {
    String::from_utf8(writer.into_inner())
        .map_err(|err| DocxCatError::other(format!("XML writer produced invalid UTF-8: {err}")))
}
