//! Carrying related parts from an appended document into the combined one.
//!
//! Content in the body refers to images, charts, embedded objects, headers
//! and hyperlink targets through relationship ids (`r:embed="rId5"`). Those
//! ids are only meaningful within the source document, so every id is
//! translated the first time it is seen:
//!
//! - external targets (hyperlinks) get a fresh relationship in the combined
//!   document;
//! - internal targets are copied under a collision-free part name, along with
//!   their content type and, recursively, the parts they relate to.

use std::collections::HashMap;

use crate::error::Result;
use crate::package::content_types::extension;
use crate::package::{DocxPackage, Relationships, relative_target, resolve_target};

/// Translates relationship ids of one source document.
pub struct PartRelocator<'a> {
    source: &'a DocxPackage,
    source_part: &'a str,
    source_rels: &'a Relationships,
    target: &'a mut DocxPackage,
    target_part: &'a str,
    target_rels: &'a mut Relationships,
    ids: HashMap<String, Option<String>>,
    copied: HashMap<String, String>,
}

impl<'a> PartRelocator<'a> {
    /// Create a relocator from `source_part` of `source` into `target_part`
    /// of `target`.
    pub fn new(
        source: &'a DocxPackage,
        source_part: &'a str,
        source_rels: &'a Relationships,
        target: &'a mut DocxPackage,
        target_part: &'a str,
        target_rels: &'a mut Relationships,
    ) -> Self {
        Self {
            source,
            source_part,
            source_rels,
            target,
            target_part,
            target_rels,
            ids: HashMap::new(),
            copied: HashMap::new(),
        }
    }

    /// Relationship id in the combined document for `old_id`.
    ///
    /// Returns `None` when the source document has no such relationship or
    /// its internal target is missing from the package.
    pub fn map_id(&mut self, old_id: &str) -> Result<Option<String>> {
        if let Some(mapped) = self.ids.get(old_id) {
            return Ok(mapped.clone());
        }

        let source_rels = self.source_rels;
        let mapped = match source_rels.get(old_id) {
            None => {
                log::warn!(
                    "relationship {old_id} referenced by {} does not exist",
                    self.source_part
                );
                None
            }
            Some(rel) if rel.external => Some(self.target_rels.add(
                rel.rel_type.clone(),
                rel.target.clone(),
                true,
            )),
            Some(rel) => {
                let part = resolve_target(self.source_part, &rel.target);
                if self.source.contains_part(&part) {
                    let copied = self.copy_part(&part)?;
                    let target = relative_target(self.target_part, &copied);
                    Some(self.target_rels.add(rel.rel_type.clone(), target, false))
                } else {
                    log::warn!("relationship {old_id} points to missing part {part}");
                    None
                }
            }
        };

        log::debug!("relationship {old_id} -> {mapped:?}");
        self.ids.insert(old_id.to_string(), mapped.clone());
        Ok(mapped)
    }

    /// Number of parts copied so far.
    pub fn parts_copied(&self) -> usize {
        self.copied.len()
    }

    /// Copy one part (and everything it relates to) into the target.
    fn copy_part(&mut self, part: &str) -> Result<String> {
        if let Some(done) = self.copied.get(part) {
            return Ok(done.clone());
        }

        let data = self.source.part(part).map(<[u8]>::to_vec).unwrap_or_default();
        let new_name = self.target.unique_part_name(part);
        self.target.set_part(new_name.clone(), data);
        self.copied.insert(part.to_string(), new_name.clone());
        self.copy_content_type(part, &new_name);

        let mut rels = self.source.relationships_for(part)?;
        if !rels.is_empty() {
            for rel in rels.iter_mut() {
                if rel.external {
                    continue;
                }
                let nested = resolve_target(part, &rel.target);
                if self.source.contains_part(&nested) {
                    let nested_copy = self.copy_part(&nested)?;
                    rel.target = relative_target(&new_name, &nested_copy);
                }
            }
            self.target.set_relationships(&new_name, &rels);
        }

        log::debug!("copied part {part} as {new_name}");
        Ok(new_name)
    }

    fn copy_content_type(&mut self, part: &str, new_name: &str) {
        let source = self.source;
        let source_types = source.content_types();
        let target_types = self.target.content_types_mut();

        if let Some(ct) = source_types.override_for(part) {
            target_types.set_override(new_name, ct);
            return;
        }

        let Some(ext) = extension(part) else {
            return;
        };
        let Some(ct) = source_types.default_for(&ext) else {
            return;
        };
        let existing = target_types.default_for(&ext).map(str::to_string);
        match existing.as_deref() {
            None => target_types.ensure_default(&ext, ct),
            Some(existing) if existing != ct => target_types.set_override(new_name, ct),
            Some(_) => {}
        }
    }
}
