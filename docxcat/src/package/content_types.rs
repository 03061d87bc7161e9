//! The `[Content_Types].xml` part.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::error::{DocxCatError, Result};
use crate::package::xml::{self, CONTENT_TYPES_NS, XML_DECLARATION};

/// Name of the content types part inside a package.
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Content type mapping of a package.
///
/// Override part names are stored without their leading slash so they can be
/// compared with zip entry names directly. Extensions are lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    defaults: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
}

impl ContentTypes {
    /// Parse a `[Content_Types].xml` document.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|err| DocxCatError::malformed_part(CONTENT_TYPES_PART, err))?;
        let mut reader = Reader::from_str(text);
        let mut types = Self::default();

        loop {
            match reader
                .read_event()
                .map_err(|err| DocxCatError::malformed_part(CONTENT_TYPES_PART, err))?
            {
                Event::Start(e) | Event::Empty(e) => match xml::local_name(e.name().as_ref()) {
                    b"Default" => {
                        let ext = xml::attr(&e, b"Extension")?;
                        let ct = xml::attr(&e, b"ContentType")?;
                        if let (Some(ext), Some(ct)) = (ext, ct) {
                            types.defaults.insert(ext.to_ascii_lowercase(), ct);
                        }
                    }
                    b"Override" => {
                        let part = xml::attr(&e, b"PartName")?;
                        let ct = xml::attr(&e, b"ContentType")?;
                        if let (Some(part), Some(ct)) = (part, ct) {
                            types
                                .overrides
                                .insert(part.trim_start_matches('/').to_string(), ct);
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(types)
    }

    /// Serialize back to XML.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(256 + 128 * self.overrides.len());
        out.push_str(XML_DECLARATION);
        let _ = write!(out, r#"<Types xmlns="{CONTENT_TYPES_NS}">"#);
        for (ext, ct) in &self.defaults {
            let _ = write!(
                out,
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                xml::escape(ext),
                xml::escape(ct)
            );
        }
        for (part, ct) in &self.overrides {
            let _ = write!(
                out,
                r#"<Override PartName="/{}" ContentType="{}"/>"#,
                xml::escape(part),
                xml::escape(ct)
            );
        }
        out.push_str("</Types>");
        out
    }

    /// Content type of a part: override first, then the extension default.
    pub fn content_type_of(&self, part: &str) -> Option<&str> {
        self.override_for(part)
            .or_else(|| extension(part).and_then(|ext| self.default_for(&ext)))
    }

    /// Explicit override for a part.
    pub fn override_for(&self, part: &str) -> Option<&str> {
        self.overrides
            .get(part.trim_start_matches('/'))
            .map(String::as_str)
    }

    /// Default content type registered for an extension.
    pub fn default_for(&self, ext: &str) -> Option<&str> {
        self.defaults
            .get(&ext.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Register an override for a part.
    pub fn set_override(&mut self, part: &str, content_type: impl Into<String>) {
        self.overrides.insert(
            part.trim_start_matches('/').to_string(),
            content_type.into(),
        );
    }

    /// Register a default for an extension unless one already exists.
    pub fn ensure_default(&mut self, ext: &str, content_type: impl Into<String>) {
        self.defaults
            .entry(ext.to_ascii_lowercase())
            .or_insert_with(|| content_type.into());
    }

    /// Number of override entries.
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }
}

/// Lowercase extension of a part name.
pub fn extension(part: &str) -> Option<String> {
    let file = part.rsplit('/').next().unwrap_or(part);
    file.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}
