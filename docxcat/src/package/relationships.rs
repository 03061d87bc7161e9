//! Relationship parts (`*.rels`).

use quick_xml::Reader;
use quick_xml::events::Event;
use std::fmt::Write as _;

use crate::error::{DocxCatError, Result};
use crate::package::xml::{self, PACKAGE_REL_NS, XML_DECLARATION};

/// Relationship type of the main document part.
pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

/// Relationship type of the core properties part.
pub const REL_CORE_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";

/// Relationship type of the style definitions part.
pub const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

/// Relationship type of hyperlinks.
pub const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// Relationship type of images.
pub const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// A single relationship entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship id, unique within its part (`rId7`).
    pub id: String,
    /// Relationship type URI.
    pub rel_type: String,
    /// Target, relative to the source part unless external.
    pub target: String,
    /// Whether `TargetMode="External"`.
    pub external: bool,
}

/// The relationships of one source part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    items: Vec<Relationship>,
}

impl Relationships {
    /// Parse a `.rels` part.
    pub fn parse(part: &str, bytes: &[u8]) -> Result<Self> {
        let text =
            std::str::from_utf8(bytes).map_err(|err| DocxCatError::malformed_part(part, err))?;
        let mut reader = Reader::from_str(text);
        let mut items = Vec::new();

        loop {
            match reader
                .read_event()
                .map_err(|err| DocxCatError::malformed_part(part, err))?
            {
                Event::Start(e) | Event::Empty(e)
                    if xml::local_name(e.name().as_ref()) == b"Relationship" =>
                {
                    let id = xml::attr(&e, b"Id")?;
                    let rel_type = xml::attr(&e, b"Type")?;
                    let target = xml::attr(&e, b"Target")?;
                    let external = xml::attr(&e, b"TargetMode")?
                        .is_some_and(|mode| mode.eq_ignore_ascii_case("External"));
                    match (id, rel_type, target) {
                        (Some(id), Some(rel_type), Some(target)) => items.push(Relationship {
                            id,
                            rel_type,
                            target,
                            external,
                        }),
                        _ => {
                            return Err(DocxCatError::malformed_part(
                                part,
                                "relationship without Id, Type or Target",
                            ));
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self { items })
    }

    /// Serialize back to XML.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(128 + 160 * self.items.len());
        out.push_str(XML_DECLARATION);
        let _ = write!(out, r#"<Relationships xmlns="{PACKAGE_REL_NS}">"#);
        for rel in &self.items {
            let _ = write!(
                out,
                r#"<Relationship Id="{}" Type="{}" Target="{}""#,
                xml::escape(&rel.id),
                xml::escape(&rel.rel_type),
                xml::escape(&rel.target)
            );
            if rel.external {
                out.push_str(r#" TargetMode="External""#);
            }
            out.push_str("/>");
        }
        out.push_str("</Relationships>");
        out
    }

    /// Look up a relationship by id.
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|rel| rel.id == id)
    }

    /// First relationship of the given type.
    pub fn first_of_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.items.iter().find(|rel| rel.rel_type == rel_type)
    }

    /// Iterate over all relationships.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    /// Mutable iteration, used to rewrite targets of copied parts.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Relationship> {
        self.items.iter_mut()
    }

    /// Number of relationships.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no relationships.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Next free `rIdN` identifier.
    pub fn next_id(&self) -> String {
        let max = self
            .items
            .iter()
            .filter_map(|rel| rel.id.strip_prefix("rId"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        let mut n = max + 1;
        loop {
            let candidate = format!("rId{n}");
            if self.get(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Add a relationship with a fresh id and return that id.
    pub fn add(
        &mut self,
        rel_type: impl Into<String>,
        target: impl Into<String>,
        external: bool,
    ) -> String {
        let id = self.next_id();
        self.items.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.into(),
            target: target.into(),
            external,
        });
        id
    }
}
