//! Copying style definitions between style sheets.
//!
//! Paragraphs appended from another document keep their `w:pStyle`,
//! `w:rStyle` and `w:tblStyle` references. When the combined style sheet
//! lacks one of those styles, its definition (and the styles it is based on
//! or linked to) is copied from the source document's style sheet.

use std::collections::{HashMap, HashSet};

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

use crate::error::{DocxCatError, Result};
use crate::package::xml;

/// One `w:style` element of a style sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDefinition {
    /// Value of `w:styleId`.
    pub id: String,
    /// Style this one inherits from (`w:basedOn`).
    pub based_on: Option<String>,
    /// Paired character or paragraph style (`w:link`).
    pub link: Option<String>,
    /// Raw XML of the definition.
    pub xml: String,
}

/// Parse the style definitions of a styles part.
///
/// # Errors
///
/// Returns [`DocxCatError::MalformedPart`] if the part is not well formed.
pub fn parse_styles(part: &str, text: &str) -> Result<Vec<StyleDefinition>> {
    let mut reader = Reader::from_str(text);
    let mut styles = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<(StyleDefinition, Writer<Vec<u8>>, usize)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| DocxCatError::malformed_part(part, err))?;

        if let Some((def, writer, style_depth)) = current.as_mut() {
            if let Event::Start(e) | Event::Empty(e) = &event {
                match xml::local_name(e.name().as_ref()) {
                    b"basedOn" => def.based_on = xml::attr_local(e, b"val")?,
                    b"link" => def.link = xml::attr_local(e, b"val")?,
                    _ => {}
                }
            }
            match &event {
                Event::Start(_) => *style_depth += 1,
                Event::End(_) => *style_depth -= 1,
                Event::Eof => return Err(DocxCatError::malformed_part(part, "unclosed style")),
                _ => {}
            }
            writer.write_event(event)?;
            if *style_depth == 0
                && let Some((mut def, writer, _)) = current.take()
            {
                def.xml = String::from_utf8_lossy(&writer.into_inner()).into_owned();
                styles.push(def);
            }
            continue;
        }

        match event {
            Event::Start(e) => {
                if depth == 1 && xml::local_name(e.name().as_ref()) == b"style" {
                    let def = StyleDefinition {
                        id: xml::attr_local(&e, b"styleId")?.unwrap_or_default(),
                        based_on: None,
                        link: None,
                        xml: String::new(),
                    };
                    let mut writer = Writer::new(Vec::new());
                    writer.write_event(Event::Start(e))?;
                    current = Some((def, writer, 1));
                } else {
                    depth += 1;
                }
            }
            Event::Empty(e) if depth == 1 && xml::local_name(e.name().as_ref()) == b"style" => {
                let mut writer = Writer::new(Vec::new());
                let id = xml::attr_local(&e, b"styleId")?.unwrap_or_default();
                writer.write_event(Event::Empty(e))?;
                styles.push(StyleDefinition {
                    id,
                    based_on: None,
                    link: None,
                    xml: String::from_utf8_lossy(&writer.into_inner()).into_owned(),
                });
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(styles)
}

/// Add the definitions of `referenced` styles missing from `target`.
///
/// Returns the updated target text, or `None` when nothing was added, along
/// with the number of copied definitions.
///
/// # Errors
///
/// Returns an error if either style sheet is malformed.
pub fn merge_missing_styles(
    target_part: &str,
    target: &str,
    source_part: &str,
    source: &str,
    referenced: &HashSet<String>,
) -> Result<(Option<String>, usize)> {
    if referenced.is_empty() {
        return Ok((None, 0));
    }

    let existing: HashSet<String> = parse_styles(target_part, target)?
        .into_iter()
        .map(|def| def.id)
        .collect();
    let source_defs = parse_styles(source_part, source)?;
    let by_id: HashMap<&str, &StyleDefinition> =
        source_defs.iter().map(|def| (def.id.as_str(), def)).collect();

    let mut wanted: HashSet<&str> = HashSet::new();
    let mut pending: Vec<&str> = referenced.iter().map(String::as_str).collect();
    while let Some(id) = pending.pop() {
        if existing.contains(id) || !wanted.insert(id) {
            continue;
        }
        if let Some(def) = by_id.get(id) {
            pending.extend(def.based_on.as_deref());
            pending.extend(def.link.as_deref());
        }
    }

    let additions: Vec<&StyleDefinition> = source_defs
        .iter()
        .filter(|def| wanted.contains(def.id.as_str()))
        .collect();
    if additions.is_empty() {
        return Ok((None, 0));
    }

    let close = target
        .rfind("</")
        .ok_or_else(|| DocxCatError::malformed_part(target_part, "style sheet is not closed"))?;
    let mut merged = String::with_capacity(target.len() + additions.iter().map(|d| d.xml.len()).sum::<usize>());
    merged.push_str(&target[..close]);
    for def in &additions {
        log::debug!("copying style definition {}", def.id);
        merged.push_str(&def.xml);
    }
    merged.push_str(&target[close..]);

    Ok((Some(merged), additions.len()))
}
