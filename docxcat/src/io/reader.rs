//! Document reading and loading operations.
//!
//! This module loads `.docx` inputs into memory with support for:
//! - Up-front file checks (missing, not a file, zero bytes)
//! - Parsing of the package and its main document part
//! - A repair pass through the office engine for unreadable inputs
//!
//! # Examples
//!
//! ```no_run
//! use docxcat::io::reader::DocxReader;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = DocxReader::new();
//! let paths = vec![PathBuf::from("a.docx"), PathBuf::from("b.docx")];
//! let results = reader.load_sequential(&paths).await;
//! let loaded = results.iter().filter(|r| r.is_ok()).count();
//! println!("{loaded} of {} loaded", results.len());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::convert::OfficeEngine;
use crate::convert::process::resolve_tool;
use crate::error::{DocxCatError, Result};
use crate::io::format_file_size;
use crate::merge::body::DocumentBody;
use crate::package::DocxPackage;

/// A loaded document with metadata.
#[derive(Debug)]
pub struct LoadedDocx {
    /// The document package.
    pub package: DocxPackage,

    /// Parsed main document part.
    pub body: DocumentBody,

    /// Path to the source file.
    pub path: PathBuf,

    /// Number of body-level blocks.
    pub block_count: usize,

    /// Time taken to load the document, repair included.
    pub load_time: Duration,

    /// File size in bytes.
    pub file_size: u64,

    /// Whether the document was only readable after a repair pass.
    pub recovered: bool,
}

/// Result of loading a single document.
pub type LoadResult = Result<LoadedDocx>;

/// Document reader with an optional repair pass.
#[derive(Debug, Clone, Default)]
pub struct DocxReader {
    recovery: Option<OfficeEngine>,
}

impl DocxReader {
    /// Create a reader that skips unreadable documents without repair.
    pub fn new() -> Self {
        Self { recovery: None }
    }

    /// Create a reader that re-saves unreadable documents through `engine`
    /// before giving up on them.
    pub fn with_recovery(engine: OfficeEngine) -> Self {
        Self {
            recovery: Some(engine),
        }
    }

    /// Whether a repair pass is configured.
    pub fn recovers(&self) -> bool {
        self.recovery.is_some()
    }

    /// Load a single document.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the `.docx` file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File doesn't exist or cannot be accessed
    /// - File is empty (never repaired)
    /// - File is not a readable document and repair is off or fails
    pub async fn load(&self, path: &Path) -> Result<LoadedDocx> {
        let start = Instant::now();
        let bytes = read_input(path).await?;
        let file_size = bytes.len() as u64;

        let err = match parse(path, &bytes) {
            Ok((package, body)) => {
                return Ok(LoadedDocx::new(package, body, path, start, file_size, false));
            }
            Err(err) => err,
        };

        let Some(engine) = &self.recovery else {
            return Err(err);
        };
        if resolve_tool(engine.bin()).is_none() {
            log::debug!(
                "no repair attempted for {}: {} is not installed",
                path.display(),
                engine.bin().display()
            );
            return Err(err);
        }

        log::debug!("{} is unreadable ({err}); re-saving it", path.display());
        let (package, body) = self.recover(engine, path).await?;
        Ok(LoadedDocx::new(package, body, path, start, file_size, true))
    }

    async fn recover(
        &self,
        engine: &OfficeEngine,
        path: &Path,
    ) -> Result<(DocxPackage, DocumentBody)> {
        let scratch = tempfile::tempdir()?;
        let repaired = engine
            .resave_docx(path, scratch.path())
            .await
            .map_err(|err| {
                DocxCatError::failed_to_load_docx(path.to_path_buf(), format!("repair failed: {err}"))
            })?;

        let bytes = tokio::fs::read(&repaired).await?;
        parse(path, &bytes).map_err(|err| {
            DocxCatError::failed_to_load_docx(
                path.to_path_buf(),
                format!("repaired copy is still unreadable: {err}"),
            )
        })
    }

    /// Load documents one after another, in order.
    ///
    /// Failures are returned in place; they never stop the batch.
    pub async fn load_sequential(&self, paths: &[PathBuf]) -> Vec<LoadResult> {
        let mut results = Vec::with_capacity(paths.len());

        for path in paths {
            results.push(self.load(path).await);
        }

        results
    }
}

impl LoadedDocx {
    fn new(
        package: DocxPackage,
        body: DocumentBody,
        path: &Path,
        start: Instant,
        file_size: u64,
        recovered: bool,
    ) -> Self {
        Self {
            block_count: body.blocks.len(),
            package,
            body,
            path: path.to_path_buf(),
            load_time: start.elapsed(),
            file_size,
            recovered,
        }
    }

    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

async fn read_input(path: &Path) -> Result<Vec<u8>> {
    let metadata = tokio::fs::metadata(path).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            DocxCatError::file_not_found(path.to_path_buf())
        } else {
            DocxCatError::FileNotAccessible {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    if !metadata.is_file() {
        return Err(DocxCatError::not_a_file(path.to_path_buf()));
    }
    if metadata.len() == 0 {
        return Err(DocxCatError::EmptyDocument {
            path: path.to_path_buf(),
        });
    }

    tokio::fs::read(path)
        .await
        .map_err(|source| DocxCatError::FileNotAccessible {
            path: path.to_path_buf(),
            source,
        })
}

fn parse(path: &Path, bytes: &[u8]) -> Result<(DocxPackage, DocumentBody)> {
    let in_file = |err: DocxCatError| err.with_path(path.to_path_buf());

    let package = DocxPackage::from_bytes(bytes).map_err(in_file)?;
    let part = package.main_document_part().map_err(in_file)?;
    let body = DocumentBody::parse(&part, package.part_text(&part).map_err(in_file)?)
        .map_err(in_file)?;

    Ok((package, body))
}
