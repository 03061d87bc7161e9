//! Document writing and saving operations.
//!
//! This module provides safe document writing with:
//! - Atomic writes (write to temp file, then rename)
//! - An autosave fallback next to the requested path
//! - Write statistics
//!
//! # Examples
//!
//! ```no_run
//! use docxcat::io::writer::DocxWriter;
//! use docxcat::package::DocxPackage;
//! use std::path::Path;
//!
//! # async fn example(package: DocxPackage) -> Result<(), Box<dyn std::error::Error>> {
//! let writer = DocxWriter::new();
//! let stats = writer.save(&package, Path::new("Merged_Doc.docx")).await?;
//! println!("Wrote {}", stats.output_path.display());
//! # Ok(())
//! # }
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task;

use crate::error::{DocxCatError, Result};
use crate::io::format_file_size;
use crate::package::DocxPackage;

/// Suffix appended to the file stem of the fallback output.
pub const AUTOSAVE_SUFFIX: &str = "_autosaved";

/// Options for writing documents.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Use atomic writes (write to temp file, then rename).
    pub atomic: bool,

    /// Try `<stem>_autosaved.<ext>` when the requested path cannot be written.
    pub autosave: bool,

    /// Buffer size for writing (in bytes).
    pub buffer_size: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            atomic: true,
            autosave: true,
            buffer_size: 64 * 1024,
        }
    }
}

/// Statistics about a write operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteStatistics {
    /// Time taken to serialize and write the file.
    #[serde(skip)]
    pub write_time: Duration,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,

    /// Whether the file went to the autosave path instead of the requested one.
    pub autosaved: bool,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// Document writer with configurable behavior.
#[derive(Debug, Clone, Default)]
pub struct DocxWriter {
    options: WriteOptions,
}

impl DocxWriter {
    /// Create a new writer with default options.
    pub fn new() -> Self {
        Self {
            options: WriteOptions::default(),
        }
    }

    /// Create a writer with custom options.
    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Save a package to `path`, overwriting any existing file.
    ///
    /// When the path cannot be written and autosave is enabled, the
    /// package goes to [`autosave_path`] instead; the returned statistics
    /// say which path was used.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The package cannot be serialized
    /// - Neither the requested path nor the autosave path can be written
    pub async fn save(&self, package: &DocxPackage, path: &Path) -> Result<WriteStatistics> {
        let start = Instant::now();
        let bytes = package.to_bytes()?;

        let err = match self.write_bytes(&bytes, path).await {
            Ok(file_size) => {
                return Ok(WriteStatistics {
                    write_time: start.elapsed(),
                    file_size,
                    output_path: path.to_path_buf(),
                    autosaved: false,
                });
            }
            Err(err) => err,
        };

        if !self.options.autosave {
            return Err(err);
        }

        let fallback = autosave_path(path);
        log::warn!(
            "cannot write {} ({err}); saving to {} instead",
            path.display(),
            fallback.display()
        );
        match self.write_bytes(&bytes, &fallback).await {
            Ok(file_size) => Ok(WriteStatistics {
                write_time: start.elapsed(),
                file_size,
                output_path: fallback,
                autosaved: true,
            }),
            Err(fallback_err) => {
                log::debug!("autosave failed too: {fallback_err}");
                Err(err)
            }
        }
    }

    async fn write_bytes(&self, bytes: &[u8], path: &Path) -> Result<u64> {
        let path_buf = path.to_path_buf();
        let options = self.options.clone();
        let bytes = bytes.to_vec();

        task::spawn_blocking(move || {
            let write_path = if options.atomic {
                temp_path(&path_buf)
            } else {
                path_buf.clone()
            };

            let result = write_file(&write_path, &bytes, options.buffer_size).and_then(|()| {
                if options.atomic {
                    std::fs::rename(&write_path, &path_buf).map_err(|source| {
                        DocxCatError::FailedToWrite {
                            path: path_buf.clone(),
                            source,
                        }
                    })?;
                }
                Ok(())
            });

            if result.is_err() && options.atomic {
                let _ = std::fs::remove_file(&write_path);
            }
            result?;

            Ok::<_, DocxCatError>(bytes.len() as u64)
        })
        .await
        .map_err(|e| DocxCatError::other(format!("Write task failed: {e}")))?
    }

    /// Check if a file can be written to the given path.
    ///
    /// Performs pre-flight checks without actually writing.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory doesn't exist
    /// - Parent directory is not writable
    /// - The path itself is a directory
    pub async fn can_write(&self, path: &Path) -> Result<()> {
        if let Ok(metadata) = tokio::fs::metadata(path).await
            && metadata.is_dir()
        {
            return Err(DocxCatError::invalid_config(format!(
                "Output path is a directory: {}",
                path.display()
            )));
        }

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let metadata = tokio::fs::metadata(parent).await.map_err(|_| {
            DocxCatError::invalid_config(format!(
                "Output directory does not exist: {}",
                parent.display()
            ))
        })?;

        if metadata.permissions().readonly() {
            return Err(DocxCatError::invalid_config(format!(
                "Output directory is not writable: {}",
                parent.display()
            )));
        }

        Ok(())
    }
}

/// Fallback path used when `path` cannot be written:
/// `dir/report.docx` becomes `dir/report_autosaved.docx`.
pub fn autosave_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let mut name = format!("{stem}{AUTOSAVE_SUFFIX}");
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(name)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "document".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_file(path: &Path, bytes: &[u8], buffer_size: usize) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|source| DocxCatError::FailedToCreateOutput {
        path: path.to_path_buf(),
        source,
    })?;

    let mut writer = std::io::BufWriter::with_capacity(buffer_size, file);
    writer
        .write_all(bytes)
        .and_then(|()| writer.flush())
        .map_err(|source| DocxCatError::FailedToWrite {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::DocxFixture;
    use tempfile::TempDir;

    fn package() -> DocxPackage {
        DocxPackage::from_bytes(&DocxFixture::new().paragraph("saved").to_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_save_docx() {
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("Merged_Doc.docx");

        let stats = DocxWriter::new().save(&package(), &output_path).await.unwrap();

        assert!(output_path.exists());
        assert!(!temp_path(&output_path).exists());
        assert_eq!(stats.output_path, output_path);
        assert_eq!(stats.file_size, std::fs::metadata(&output_path).unwrap().len());
        assert!(!stats.autosaved);

        let reread = DocxPackage::from_bytes(&std::fs::read(&output_path).unwrap()).unwrap();
        assert!(reread.contains_part("word/document.xml"));
    }

    #[tokio::test]
    async fn test_save_overwrites_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("out.docx");
        std::fs::write(&output_path, b"stale").unwrap();

        DocxWriter::new().save(&package(), &output_path).await.unwrap();
        assert_ne!(std::fs::read(&output_path).unwrap(), b"stale");
    }

    #[tokio::test]
    async fn test_non_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("out.docx");

        let writer = DocxWriter::with_options(WriteOptions {
            atomic: false,
            ..Default::default()
        });
        writer.save(&package(), &output_path).await.unwrap();
        assert!(output_path.exists());
    }

    #[tokio::test]
    async fn test_falls_back_to_autosave_path() {
        let temp_dir = TempDir::new().unwrap();
        // A directory in the way makes the final rename fail.
        let output_path = temp_dir.path().join("out.docx");
        std::fs::create_dir(&output_path).unwrap();

        let stats = DocxWriter::new().save(&package(), &output_path).await.unwrap();

        let expected = temp_dir.path().join("out_autosaved.docx");
        assert!(stats.autosaved);
        assert_eq!(stats.output_path, expected);
        assert!(expected.is_file());
        assert!(!temp_path(&output_path).exists());
    }

    #[tokio::test]
    async fn test_no_autosave_reports_error() {
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("out.docx");
        std::fs::create_dir(&output_path).unwrap();

        let writer = DocxWriter::with_options(WriteOptions {
            autosave: false,
            ..Default::default()
        });
        let err = writer.save(&package(), &output_path).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.exit_code(), 5);
        assert!(!temp_dir.path().join("out_autosaved.docx").exists());
    }

    #[tokio::test]
    async fn test_missing_directory_fails_both_paths() {
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("missing").join("out.docx");

        let err = DocxWriter::new().save(&package(), &output_path).await.unwrap_err();
        match err {
            DocxCatError::FailedToCreateOutput { path, .. } => {
                assert_eq!(path, temp_path(&output_path))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_can_write() {
        let temp_dir = TempDir::new().unwrap();
        let writer = DocxWriter::new();

        assert!(writer.can_write(&temp_dir.path().join("out.docx")).await.is_ok());
        assert!(
            writer
                .can_write(Path::new("/nonexistent/out.docx"))
                .await
                .is_err()
        );
        assert!(writer.can_write(temp_dir.path()).await.is_err());
    }

    #[test]
    fn test_autosave_path() {
        assert_eq!(
            autosave_path(Path::new("out/Merged_Doc.docx")),
            PathBuf::from("out/Merged_Doc_autosaved.docx")
        );
        assert_eq!(
            autosave_path(Path::new("report")),
            PathBuf::from("report_autosaved")
        );
    }
}
