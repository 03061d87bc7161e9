//! The combined document accumulator.
//!
//! [`CombinedDocument`] starts as a copy of the first readable input (the
//! base) and grows by one input at a time. Each append inserts a page-break
//! paragraph and then the input's body blocks, rewritten so that everything
//! they reference resolves inside the combined package.

use std::collections::{HashMap, HashSet};

use quick_xml::events::BytesStart;
use serde::Serialize;

use crate::error::{DocxCatError, Result};
use crate::merge::body::{
    BlockKind, DocumentBody, ElementRewriter, Rewrite, RootElement, fragment_text,
    rewrite_fragment,
};
use crate::merge::bookmarks::{BookmarkIdMap, BookmarkRegistry};
use crate::merge::relocate::PartRelocator;
use crate::merge::styles;
use crate::package::relationships::REL_STYLES;
use crate::package::xml::{self, MC_NS, R_NS, XML_DECLARATION};
use crate::package::{DocxPackage, Relationships, resolve_target};

/// Elements referring to parts that are never merged (notes and comments).
const DROPPED_REFERENCES: &[&[u8]] = &[
    b"footnoteReference",
    b"endnoteReference",
    b"commentReference",
    b"commentRangeStart",
    b"commentRangeEnd",
];

/// Elements whose `w:val` names a style.
const STYLE_REFERENCES: &[&[u8]] = &[b"pStyle", b"rStyle", b"tblStyle"];

/// One body-level block of the combined document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlock {
    kind: BlockKind,
    source: Option<usize>,
    xml: String,
}

impl ContentBlock {
    /// Kind of block.
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Ordinal of the input document the block came from.
    ///
    /// Separators inserted between documents have no source.
    pub fn source(&self) -> Option<usize> {
        self.source
    }

    /// Raw XML of the block.
    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Concatenated text runs of the block.
    pub fn text(&self) -> Result<String> {
        fragment_text(&self.xml)
    }
}

/// What one append carried over or left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendReport {
    /// Body blocks appended.
    pub blocks: usize,
    /// Parts copied into the combined package.
    pub parts_copied: usize,
    /// Bookmarks renamed to avoid collisions.
    pub bookmarks_renamed: usize,
    /// Note and comment references dropped.
    pub dropped_references: usize,
    /// Relationship references that could not be resolved.
    pub unresolved_references: usize,
    /// Style definitions copied into the combined style sheet.
    pub styles_added: usize,
}

/// In-memory accumulator for the merged document.
#[derive(Debug)]
pub struct CombinedDocument {
    package: DocxPackage,
    document_part: String,
    document_rels: Relationships,
    root: RootElement,
    body_name: String,
    word_prefix: String,
    preamble: String,
    blocks: Vec<ContentBlock>,
    section: Option<String>,
    bookmarks: BookmarkRegistry,
    sources: Vec<usize>,
}

impl CombinedDocument {
    /// Start a combined document from the base input.
    ///
    /// # Arguments
    ///
    /// * `package` - Package of the base document
    /// * `body` - Parsed main document part of the base
    /// * `source` - Ordinal of the base among the discovered inputs
    ///
    /// # Errors
    ///
    /// Returns an error if the base's relationships cannot be read.
    pub fn new(package: DocxPackage, body: DocumentBody, source: usize) -> Result<Self> {
        let document_part = package.main_document_part()?;
        let document_rels = package.relationships_for(&document_part)?;
        let word_prefix = body.word_prefix();

        let blocks = body
            .blocks
            .into_iter()
            .map(|(kind, xml)| ContentBlock {
                kind,
                source: Some(source),
                xml,
            })
            .collect();

        Ok(Self {
            package,
            document_part,
            document_rels,
            root: body.root,
            body_name: body.body_name,
            word_prefix,
            preamble: body.preamble,
            blocks,
            section: body.section,
            bookmarks: BookmarkRegistry::new(body.bookmark_names, body.max_bookmark_id),
            sources: vec![source],
        })
    }

    /// Append another input after a page break.
    ///
    /// Parts, relationships, namespaces and bookmark names are staged on
    /// copies and committed together with the blocks, so a failing append
    /// leaves the combined document exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`DocxCatError::MergeFailed`] if the input's content cannot
    /// be carried over.
    pub fn append(
        &mut self,
        package: &DocxPackage,
        body: &DocumentBody,
        source: usize,
    ) -> Result<AppendReport> {
        let source_part = package.main_document_part()?;
        let source_rels = package.relationships_for(&source_part)?;
        let source_namespaces = body.root.namespaces();

        let mut target = self.package.clone();
        let mut target_rels = self.document_rels.clone();
        let mut bookmarks = self.bookmarks.clone();
        let mut root = self.root.clone();

        merge_namespaces(&mut root, &body.root);

        let renames = bookmarks.register_document(&body.bookmark_names);
        let r_prefixes: Vec<String> = source_namespaces
            .iter()
            .filter(|(prefix, uri)| uri == R_NS && !prefix.is_empty())
            .map(|(prefix, _)| prefix.clone())
            .collect();

        let mut report = AppendReport {
            bookmarks_renamed: renames.len(),
            ..Default::default()
        };

        let relocator = PartRelocator::new(
            package,
            &source_part,
            &source_rels,
            &mut target,
            &self.document_part,
            &mut target_rels,
        );
        let mut rewriter = AppendRewriter {
            relocator,
            registry: &mut bookmarks,
            ids: BookmarkIdMap::default(),
            renames: &renames,
            word_prefix: body.word_prefix(),
            r_prefixes,
            dropped: 0,
            unresolved: 0,
            styles: HashSet::new(),
        };

        let mut staged = Vec::with_capacity(body.blocks.len());
        for (kind, fragment) in &body.blocks {
            let xml = rewrite_fragment(fragment, &mut rewriter).map_err(|err| {
                DocxCatError::merge_failed(format!("cannot append block of {source_part}: {err}"))
            })?;
            staged.push(ContentBlock {
                kind: *kind,
                source: Some(source),
                xml,
            });
        }

        report.blocks = staged.len();
        report.parts_copied = rewriter.relocator.parts_copied();
        report.dropped_references = rewriter.dropped;
        report.unresolved_references = rewriter.unresolved;
        let referenced_styles = std::mem::take(&mut rewriter.styles);
        drop(rewriter);

        report.styles_added = merge_styles(
            StyleTarget {
                package: &mut target,
                rels: &target_rels,
                part: &self.document_part,
            },
            package,
            &source_rels,
            &source_part,
            &referenced_styles,
        )?;

        self.package = target;
        self.document_rels = target_rels;
        self.bookmarks = bookmarks;
        self.root = root;
        self.blocks.push(ContentBlock {
            kind: BlockKind::PageBreak,
            source: None,
            xml: page_break(&self.word_prefix),
        });
        self.blocks.extend(staged);
        self.sources.push(source);

        Ok(report)
    }

    /// Blocks in document order.
    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    /// Number of page breaks inserted between inputs.
    pub fn page_breaks(&self) -> usize {
        self.blocks
            .iter()
            .filter(|block| block.kind == BlockKind::PageBreak)
            .count()
    }

    /// Ordinals of the inputs merged so far, in order.
    pub fn sources(&self) -> &[usize] {
        &self.sources
    }

    /// The combined package as it stands.
    pub fn package(&self) -> &DocxPackage {
        &self.package
    }

    /// Mutable access to the combined package (metadata, extra parts).
    pub fn package_mut(&mut self) -> &mut DocxPackage {
        &mut self.package
    }

    /// Serialize the main document part.
    pub fn to_document_xml(&self) -> String {
        let capacity = self.blocks.iter().map(|b| b.xml.len()).sum::<usize>() + 1024;
        let mut out = String::with_capacity(capacity);
        out.push_str(XML_DECLARATION);
        out.push_str(&self.root.start_tag());
        out.push_str(&self.preamble);
        out.push('<');
        out.push_str(&self.body_name);
        out.push('>');
        for block in &self.blocks {
            out.push_str(&block.xml);
        }
        if let Some(section) = &self.section {
            out.push_str(section);
        }
        out.push_str("</");
        out.push_str(&self.body_name);
        out.push_str("></");
        out.push_str(&self.root.name);
        out.push('>');
        out
    }

    /// Finalize into a package ready to be written.
    pub fn into_package(mut self) -> DocxPackage {
        let xml = self.to_document_xml();
        self.package.set_part(self.document_part.clone(), xml.into_bytes());
        self.package
            .set_relationships(&self.document_part, &self.document_rels);
        self.package
    }
}

/// Declare the source root's namespaces on `root` and merge `mc:Ignorable`.
fn merge_namespaces(root: &mut RootElement, source_root: &RootElement) {
    let mut known = root.namespaces();

    for (prefix, uri) in source_root.namespaces() {
        if prefix.is_empty() {
            continue;
        }
        let bound = known
            .iter()
            .find(|(p, _)| *p == prefix)
            .map(|(_, bound)| bound.clone());
        match bound {
            Some(bound) if bound == uri => {}
            Some(bound) => {
                log::warn!(
                    "namespace prefix {prefix} is bound to {bound}, not {uri}; keeping the base binding"
                );
            }
            None => {
                log::debug!("declaring namespace {prefix}={uri} on the combined document");
                root.set_attribute(&format!("xmlns:{prefix}"), uri.clone());
                known.push((prefix, uri));
            }
        }
    }

    let Some(source_mc) = xml::prefix_for(&source_root.namespaces(), MC_NS).map(str::to_string)
    else {
        return;
    };
    let Some(source_ignorable) = source_root.attribute(&format!("{source_mc}:Ignorable")) else {
        return;
    };
    let base_mc = xml::prefix_for(&known, MC_NS).unwrap_or(&source_mc).to_string();
    let key = format!("{base_mc}:Ignorable");

    let mut tokens: Vec<String> = root
        .attribute(&key)
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    for token in source_ignorable.split_whitespace() {
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    root.set_attribute(&key, tokens.join(" "));
}

/// Staged main document part whose style sheet receives missing styles.
struct StyleTarget<'a> {
    package: &'a mut DocxPackage,
    rels: &'a Relationships,
    part: &'a str,
}

fn merge_styles(
    target: StyleTarget<'_>,
    package: &DocxPackage,
    source_rels: &Relationships,
    source_part: &str,
    referenced: &HashSet<String>,
) -> Result<usize> {
    if referenced.is_empty() {
        return Ok(0);
    }
    let Some(target_rel) = target.rels.first_of_type(REL_STYLES) else {
        return Ok(0);
    };
    let Some(source_rel) = source_rels.first_of_type(REL_STYLES) else {
        return Ok(0);
    };

    let target_styles = resolve_target(target.part, &target_rel.target);
    let source_styles = resolve_target(source_part, &source_rel.target);
    if !target.package.contains_part(&target_styles) || !package.contains_part(&source_styles) {
        return Ok(0);
    }

    let (merged, added) = styles::merge_missing_styles(
        &target_styles,
        target.package.part_text(&target_styles)?,
        &source_styles,
        package.part_text(&source_styles)?,
        referenced,
    )?;
    if let Some(merged) = merged {
        target.package.set_part(target_styles, merged.into_bytes());
    }
    Ok(added)
}

/// The separator inserted between two inputs.
fn page_break(w: &str) -> String {
    format!(r#"<{w}:p><{w}:r><{w}:br {w}:type="page"/></{w}:r></{w}:p>"#)
}

/// Rewrites the elements of one appended document.
struct AppendRewriter<'a> {
    relocator: PartRelocator<'a>,
    registry: &'a mut BookmarkRegistry,
    ids: BookmarkIdMap,
    renames: &'a HashMap<String, String>,
    word_prefix: String,
    r_prefixes: Vec<String>,
    dropped: usize,
    unresolved: usize,
    styles: HashSet<String>,
}

impl ElementRewriter for AppendRewriter<'_> {
    fn rewrite(&mut self, element: &BytesStart<'_>) -> Result<Rewrite> {
        let name = element.name();
        let is_word = xml::prefix(name.as_ref()) == Some(self.word_prefix.as_bytes());
        let local: &[u8] = if is_word {
            xml::local_name(name.as_ref())
        } else {
            b""
        };

        if is_word && DROPPED_REFERENCES.contains(&local) {
            self.dropped += 1;
            return Ok(Rewrite::Drop);
        }
        if is_word
            && STYLE_REFERENCES.contains(&local)
            && let Some(style) = xml::attr_local(element, b"val")?
        {
            self.styles.insert(style);
        }

        let mut changed = false;
        let mut attributes: Vec<(String, String)> = Vec::new();

        for attr in element.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            let attr_prefix = key.split_once(':').map(|(p, _)| p);
            let attr_local = key.rsplit(':').next().unwrap_or(&key);

            if attr_prefix.is_some_and(|p| self.r_prefixes.iter().any(|r| r == p)) {
                changed = true;
                match self.relocator.map_id(&value)? {
                    Some(new_id) => attributes.push((key, new_id)),
                    None => self.unresolved += 1,
                }
                continue;
            }

            let replacement = match (local, attr_local) {
                (b"bookmarkStart", "id") => Some(self.ids.start(self.registry, &value).to_string()),
                (b"bookmarkEnd", "id") => Some(self.ids.end(self.registry, &value).to_string()),
                (b"bookmarkStart", "name") | (b"hyperlink", "anchor") => {
                    self.renames.get(&value).cloned()
                }
                (b"fldSimple", "instr") => {
                    let instr = rename_field_targets(&value, self.renames);
                    (instr != value).then_some(instr)
                }
                _ => None,
            };

            match replacement {
                Some(new_value) => {
                    changed = true;
                    attributes.push((key, new_value));
                }
                None => attributes.push((key, value)),
            }
        }

        if !changed {
            return Ok(Rewrite::Keep);
        }

        let mut rewritten = BytesStart::new(String::from_utf8_lossy(name.as_ref()).into_owned());
        for (key, value) in &attributes {
            rewritten.push_attribute((key.as_str(), value.as_str()));
        }
        Ok(Rewrite::Replace(rewritten))
    }

    fn rewrite_text(&mut self, parent: &[u8], text: &str) -> Option<String> {
        let is_instr = xml::prefix(parent) == Some(self.word_prefix.as_bytes())
            && xml::local_name(parent) == b"instrText";
        if !is_instr {
            return None;
        }
        let instr = rename_field_targets(text, self.renames);
        (instr != text).then_some(instr)
    }
}

/// Rename bookmark targets of a field instruction (`REF intro \h`).
fn rename_field_targets(instr: &str, renames: &HashMap<String, String>) -> String {
    instr
        .split(' ')
        .map(|token| renames.get(token).map(String::as_str).unwrap_or(token))
        .collect::<Vec<_>>()
        .join(" ")
}
