//! I/O operations for docxcat.
//!
//! This module handles all file I/O operations including:
//! - Loading `.docx` documents from disk, with an optional repair pass
//! - Writing the combined document to disk
//! - Copying embedded media out of input documents
//!
//! # Examples
//!
//! ```no_run
//! use docxcat::io::{DocxReader, DocxWriter};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = DocxReader::new();
//! let doc = reader.load(&PathBuf::from("input.docx")).await?;
//!
//! let writer = DocxWriter::new();
//! writer.save(&doc.package, &PathBuf::from("copy.docx")).await?;
//! # Ok(())
//! # }
//! ```

pub mod reader;
pub mod writer;

pub use reader::{DocxReader, LoadResult, LoadedDocx};
pub use writer::{DocxWriter, WriteOptions, WriteStatistics};

use std::path::{Path, PathBuf};

use crate::error::{DocxCatError, Result};
use crate::package::DocxPackage;

/// Copy every `word/media/*` part of `package` into `dir`.
///
/// The directory is created if needed. Returns the written paths in part
/// name order.
///
/// # Errors
///
/// Returns an error if the directory or a file cannot be written.
pub async fn extract_media(package: &DocxPackage, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut media: Vec<(&str, &[u8])> = package.media_parts().collect();
    if media.is_empty() {
        return Ok(Vec::new());
    }
    media.sort_by(|a, b| a.0.cmp(b.0));

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| DocxCatError::FailedToCreateOutput {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut written = Vec::with_capacity(media.len());
    for (name, data) in media {
        let file_name = name.rsplit('/').next().unwrap_or(name);
        let path = dir.join(file_name);
        tokio::fs::write(&path, data)
            .await
            .map_err(|source| DocxCatError::FailedToWrite {
                path: path.clone(),
                source,
            })?;
        written.push(path);
    }

    Ok(written)
}

/// Format file size as human-readable string.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}
