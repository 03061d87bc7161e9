//! Document metadata management.
//!
//! Word keeps title, author, subject and keywords in the core properties
//! part (`docProps/core.xml`), a small Dublin Core document. This module
//! rewrites the requested fields and leaves every other property untouched.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::config::Metadata;
use crate::error::{DocxCatError, Result};
use crate::package::relationships::REL_CORE_PROPERTIES;
use crate::package::xml::{self, XML_DECLARATION};
use crate::package::{DocxPackage, resolve_target};

/// Conventional location of the core properties part.
pub const CORE_PROPERTIES_PART: &str = "docProps/core.xml";

/// Content type of the core properties part.
pub const CORE_PROPERTIES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-package.core-properties+xml";

const CP_NS: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";

/// Manager for document core properties.
pub struct MetadataManager;

impl MetadataManager {
    /// Create a new metadata manager.
    pub fn new() -> Self {
        Self
    }

    /// Set metadata on a package.
    ///
    /// Only non-empty fields are written. A package without a core
    /// properties part gets one.
    ///
    /// # Arguments
    ///
    /// * `package` - Package to update
    /// * `metadata` - Metadata to set
    ///
    /// # Errors
    ///
    /// Returns an error if the existing core properties part is malformed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use docxcat::merge::metadata::MetadataManager;
    /// # use docxcat::config::Metadata;
    /// # use docxcat::package::DocxPackage;
    /// # fn example(mut package: DocxPackage) -> Result<(), Box<dyn std::error::Error>> {
    /// let manager = MetadataManager::new();
    /// let metadata = Metadata::new(Some("Annual report".to_string()), None, None, None);
    /// manager.set_metadata(&mut package, &metadata)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn set_metadata(&self, package: &mut DocxPackage, metadata: &Metadata) -> Result<()> {
        if metadata.is_empty() {
            return Ok(());
        }

        let part = core_properties_part(package)?;
        let updated = if package.contains_part(&part) {
            rewrite_core_properties(&part, package.part_text(&part)?, metadata)?
        } else {
            let mut rels = package.relationships_for("")?;
            rels.add(REL_CORE_PROPERTIES, part.clone(), false);
            package.set_relationships("", &rels);
            package
                .content_types_mut()
                .set_override(&part, CORE_PROPERTIES_CONTENT_TYPE);
            new_core_properties(metadata)
        };

        package.set_part(part, updated.into_bytes());
        Ok(())
    }

    /// Read the title of a package, if it has one.
    pub fn title(&self, package: &DocxPackage) -> Result<Option<String>> {
        let part = core_properties_part(package)?;
        let Some(bytes) = package.part(&part) else {
            return Ok(None);
        };
        let text =
            std::str::from_utf8(bytes).map_err(|err| DocxCatError::malformed_part(&part, err))?;

        let mut reader = Reader::from_str(text);
        let mut in_title = false;
        let mut title = String::new();
        loop {
            match reader
                .read_event()
                .map_err(|err| DocxCatError::malformed_part(&part, err))?
            {
                Event::Start(e) if xml::local_name(e.name().as_ref()) == b"title" => in_title = true,
                Event::End(e) if xml::local_name(e.name().as_ref()) == b"title" => in_title = false,
                Event::Text(t) if in_title => title.push_str(&t.unescape()?),
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Some(title).filter(|t| !t.is_empty()))
    }
}

impl Default for MetadataManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Fields to write, as `(namespace, local name, value)`.
fn fields(metadata: &Metadata) -> Vec<(&'static str, &'static str, &str)> {
    [
        (DC_NS, "title", metadata.title.as_deref()),
        (DC_NS, "creator", metadata.author.as_deref()),
        (DC_NS, "subject", metadata.subject.as_deref()),
        (CP_NS, "keywords", metadata.keywords.as_deref()),
    ]
    .into_iter()
    .filter_map(|(ns, local, value)| value.map(|v| (ns, local, v)))
    .collect()
}

fn core_properties_part(package: &DocxPackage) -> Result<String> {
    let rels = package.relationships_for("")?;
    Ok(rels
        .first_of_type(REL_CORE_PROPERTIES)
        .map(|rel| resolve_target("", &rel.target))
        .unwrap_or_else(|| CORE_PROPERTIES_PART.to_string()))
}

fn new_core_properties(metadata: &Metadata) -> String {
    let mut out = String::from(XML_DECLARATION);
    out.push_str(&format!(
        r#"<cp:coreProperties xmlns:cp="{CP_NS}" xmlns:dc="{DC_NS}">"#
    ));
    for (ns, local, value) in fields(metadata) {
        let prefix = if ns == DC_NS { "dc" } else { "cp" };
        out.push_str(&format!(
            "<{prefix}:{local}>{}</{prefix}:{local}>",
            xml::escape(value)
        ));
    }
    out.push_str("</cp:coreProperties>");
    out
}

fn rewrite_core_properties(part: &str, text: &str, metadata: &Metadata) -> Result<String> {
    let mut pending = fields(metadata);
    let mut reader = Reader::from_str(text);
    let mut writer = Writer::new(Vec::with_capacity(text.len() + 256));
    let mut namespaces: Vec<(String, String)> = Vec::new();
    let mut depth = 0usize;
    let mut skip_depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| DocxCatError::malformed_part(part, err))?;

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(e) => {
                    skip_depth -= 1;
                    if skip_depth == 0 {
                        depth -= 1;
                        writer.write_event(Event::End(e))?;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) => {
                if depth == 0 {
                    namespaces = xml::namespace_declarations(&e)?;
                } else if depth == 1
                    && let Some(value) = take_field(&mut pending, &namespaces, &e)
                {
                    writer.write_event(Event::Start(e))?;
                    writer.write_event(Event::Text(BytesText::new(&value)))?;
                    skip_depth = 1;
                    depth += 1;
                    continue;
                }
                depth += 1;
                writer.write_event(Event::Start(e))?;
            }
            Event::Empty(e) => {
                if depth == 1
                    && let Some(value) = take_field(&mut pending, &namespaces, &e)
                {
                    let end = BytesEnd::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                    writer.write_event(Event::Start(e))?;
                    writer.write_event(Event::Text(BytesText::new(&value)))?;
                    writer.write_event(Event::End(end))?;
                } else {
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    for (ns, local, value) in pending.drain(..) {
                        write_field(&mut writer, &namespaces, ns, local, value)?;
                    }
                }
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|err| DocxCatError::malformed_part(part, err))
}

fn take_field(
    pending: &mut Vec<(&'static str, &'static str, &str)>,
    namespaces: &[(String, String)],
    e: &BytesStart<'_>,
) -> Option<String> {
    let name = e.name();
    let local = xml::local_name(name.as_ref());
    let prefix = xml::prefix(name.as_ref()).unwrap_or_default();
    let idx = pending.iter().position(|(ns, field, _)| {
        field.as_bytes() == local
            && xml::prefix_for(namespaces, ns).is_some_and(|p| p.as_bytes() == prefix)
    })?;
    Some(pending.remove(idx).2.to_string())
}

fn write_field(
    writer: &mut Writer<Vec<u8>>,
    namespaces: &[(String, String)],
    ns: &str,
    local: &str,
    value: &str,
) -> Result<()> {
    let (name, declare) = match xml::prefix_for(namespaces, ns) {
        Some("") => (local.to_string(), false),
        Some(prefix) => (format!("{prefix}:{local}"), false),
        None => {
            let prefix = if ns == DC_NS { "dc" } else { "cp" };
            (format!("{prefix}:{local}"), true)
        }
    };

    let mut start = BytesStart::new(name.clone());
    if declare {
        let prefix = name.split(':').next().unwrap_or_default();
        start.push_attribute((format!("xmlns:{prefix}").as_str(), ns));
    }
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
