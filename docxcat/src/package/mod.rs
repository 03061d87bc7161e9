//! In-memory model of a Word (`.docx`) package.
//!
//! A `.docx` file is an Open Packaging Conventions zip archive: a set of
//! named parts (mostly XML), a `[Content_Types].xml` part mapping parts to
//! media types, and `_rels/*.rels` parts linking parts to each other.
//!
//! [`DocxPackage`] keeps every part as raw bytes so that anything docxcat
//! does not understand (themes, fonts, custom XML) survives a round trip
//! untouched.
//!
//! # Examples
//!
//! ```no_run
//! use docxcat::package::DocxPackage;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("report.docx")?;
//! let package = DocxPackage::from_bytes(&bytes)?;
//! println!("main part: {}", package.main_document_part()?);
//! # Ok(())
//! # }
//! ```

pub mod content_types;
pub mod relationships;
pub mod xml;

pub use content_types::{CONTENT_TYPES_PART, ContentTypes};
pub use relationships::{Relationship, Relationships};

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{DocxCatError, Result};
use relationships::REL_OFFICE_DOCUMENT;

/// Part holding the package-level relationships.
pub const PACKAGE_RELS_PART: &str = "_rels/.rels";

/// Conventional location of the main document part.
pub const DEFAULT_DOCUMENT_PART: &str = "word/document.xml";

/// Directory holding embedded media in Word packages.
pub const MEDIA_DIR: &str = "word/media/";

/// Upper bound on the buffer reserved from a zip entry's declared size.
const MAX_RESERVED_PART_SIZE: usize = 1 << 20;

/// Bytes to reserve for a part whose header claims `declared` bytes.
/// The header is untrusted; larger parts grow while reading.
fn initial_capacity(declared: u64) -> usize {
    usize::try_from(declared)
        .map_or(MAX_RESERVED_PART_SIZE, |size| size.min(MAX_RESERVED_PART_SIZE))
}

/// A `.docx` package held in memory.
#[derive(Debug, Clone, Default)]
pub struct DocxPackage {
    parts: BTreeMap<String, Vec<u8>>,
    content_types: ContentTypes,
}

impl DocxPackage {
    /// Read a package from the bytes of a zip archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a zip archive, or if the
    /// archive lacks a content types part or a main document part.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = BTreeMap::new();

        for idx in 0..archive.len() {
            let mut file = archive.by_index(idx)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            let mut data = Vec::with_capacity(initial_capacity(file.size()));
            file.read_to_end(&mut data)?;
            parts.insert(name, data);
        }

        Self::from_parts(parts)
    }

    /// Build a package from raw parts, including `[Content_Types].xml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the content types part is missing or malformed,
    /// or if no main document part can be located.
    pub fn from_parts<I, N>(parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, Vec<u8>)>,
        N: Into<String>,
    {
        let mut parts: BTreeMap<String, Vec<u8>> =
            parts.into_iter().map(|(n, d)| (n.into(), d)).collect();

        let types = parts
            .remove(CONTENT_TYPES_PART)
            .ok_or_else(|| DocxCatError::missing_part(CONTENT_TYPES_PART))?;
        let content_types = ContentTypes::parse(&types)?;

        let package = Self {
            parts,
            content_types,
        };

        let main = package.main_document_part()?;
        if !package.contains_part(&main) {
            return Err(DocxCatError::missing_part(main));
        }

        Ok(package)
    }

    /// Serialize the package into zip archive bytes.
    ///
    /// The content types part is written first, as Office expects.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        writer.start_file(CONTENT_TYPES_PART, options)?;
        writer.write_all(self.content_types.to_xml().as_bytes())?;

        for (name, data) in &self.parts {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(data)?;
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }

    /// Name of the main document part, resolved via the package relationships.
    pub fn main_document_part(&self) -> Result<String> {
        let rels = self.relationships_for("")?;
        Ok(rels
            .first_of_type(REL_OFFICE_DOCUMENT)
            .map(|rel| resolve_target("", &rel.target))
            .unwrap_or_else(|| DEFAULT_DOCUMENT_PART.to_string()))
    }

    /// Raw bytes of a part.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(Vec::as_slice)
    }

    /// A part decoded as UTF-8 text.
    pub fn part_text(&self, name: &str) -> Result<&str> {
        let bytes = self
            .part(name)
            .ok_or_else(|| DocxCatError::missing_part(name))?;
        std::str::from_utf8(bytes).map_err(|err| DocxCatError::malformed_part(name, err))
    }

    /// Whether a part exists.
    pub fn contains_part(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    /// Insert or replace a part.
    pub fn set_part(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.parts.insert(name.into(), data);
    }

    /// Number of parts (not counting `[Content_Types].xml`).
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Embedded media parts (`word/media/*`).
    pub fn media_parts(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.parts
            .iter()
            .filter(|(name, _)| name.starts_with(MEDIA_DIR))
            .map(|(name, data)| (name.as_str(), data.as_slice()))
    }

    /// Content types of the package.
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    /// Mutable content types of the package.
    pub fn content_types_mut(&mut self) -> &mut ContentTypes {
        &mut self.content_types
    }

    /// Relationships whose source is `part` (`""` for the package itself).
    ///
    /// A missing relationship part yields an empty set.
    pub fn relationships_for(&self, part: &str) -> Result<Relationships> {
        let rels_name = rels_part_name(part);
        match self.part(&rels_name) {
            Some(bytes) => Relationships::parse(&rels_name, bytes),
            None => Ok(Relationships::default()),
        }
    }

    /// Store the relationships of `part`.
    pub fn set_relationships(&mut self, part: &str, rels: &Relationships) {
        self.set_part(rels_part_name(part), rels.to_xml().into_bytes());
    }

    /// A part name based on `desired` that does not exist in this package.
    ///
    /// `word/media/image1.png` becomes `word/media/image1_2.png`,
    /// `word/media/image1_3.png`, ... until a free name is found.
    pub fn unique_part_name(&self, desired: &str) -> String {
        if !self.contains_part(desired) {
            return desired.to_string();
        }
        let (dir, file) = match desired.rsplit_once('/') {
            Some((dir, file)) => (format!("{dir}/"), file),
            None => (String::new(), desired),
        };
        let (stem, ext) = match file.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
            _ => (file, String::new()),
        };
        let mut n = 2;
        loop {
            let candidate = format!("{dir}{stem}_{n}{ext}");
            if !self.contains_part(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Name of the relationship part for `part` (`""` is the package root).
pub fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None if part.is_empty() => PACKAGE_RELS_PART.to_string(),
        None => format!("_rels/{part}.rels"),
    }
}

/// Directory portion of a part name, with trailing slash (or empty).
pub fn part_dir(part: &str) -> &str {
    match part.rfind('/') {
        Some(idx) => &part[..=idx],
        None => "",
    }
}

/// Resolve a relationship target against its source part.
///
/// Absolute targets (`/word/media/a.png`) are taken from the package root;
/// relative targets are resolved against the source part's directory and
/// normalized (`..` and `.` segments removed).
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("{}{}", part_dir(source_part), target),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Relative target from `source_part` to `target_part`.
pub fn relative_target(source_part: &str, target_part: &str) -> String {
    let from: Vec<&str> = part_dir(source_part)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let to: Vec<&str> = target_part.split('/').collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();
    // The last segment of `to` is the file itself and never part of the prefix.
    let common = common.min(to.len().saturating_sub(1));

    let mut out: Vec<&str> = vec![".."; from.len() - common];
    out.extend_from_slice(&to[common..]);
    out.join("/")
}
