//! Error types for docxcat.
//!
//! Every failure of discovering, reading, merging or writing documents is a
//! [`DocxCatError`]. Each variant maps to a process exit code through
//! [`DocxCatError::exit_code`].
//!
//! Failures of the external conversion tools are not errors of the run;
//! they are reported through [`crate::convert::ConversionOutcome`].

use std::io;
use std::path::PathBuf;

use crate::merge::SkippedInput;

/// Result type alias for docxcat operations.
pub type Result<T> = std::result::Result<T, DocxCatError>;

/// Main error type for docxcat operations.
#[derive(Debug, thiserror::Error)]
pub enum DocxCatError {
    /// Input file was not found.
    #[error("File not found: {}", .path.display())]
    FileNotFound {
        /// Path to the file that was not found.
        path: PathBuf,
    },

    /// Input file is not accessible (permission denied, etc.).
    #[error("Cannot access file: {}\n  Reason: {source}", .path.display())]
    FileNotAccessible {
        /// Path to the inaccessible file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Path exists but is not a regular file.
    #[error("Not a file: {}", .path.display())]
    NotAFile {
        /// Path that is not a file.
        path: PathBuf,
    },

    /// The directory holding the documents to merge does not exist.
    #[error(
        "Input directory not found: {}\n  Hint: create it and place the .docx files to merge inside",
        .path.display()
    )]
    InputDirNotFound {
        /// Expected input directory.
        path: PathBuf,
    },

    /// No candidate documents were found in the input directory.
    #[error("No .docx files found in {}", .dir.display())]
    NoInputFiles {
        /// Directory that was scanned.
        dir: PathBuf,
    },

    /// Documents were found but none of them could be read.
    #[error(
        "No readable documents to merge ({} file(s) skipped){}",
        .skipped.len(),
        skipped_list(.skipped)
    )]
    NoReadableInputs {
        /// Every input that was given up on, with its reason.
        skipped: Vec<SkippedInput>,
    },

    /// Input file is empty.
    #[error("Document is empty (0 bytes): {}", .path.display())]
    EmptyDocument {
        /// Path to the empty file.
        path: PathBuf,
    },

    /// Failed to load a Word document.
    #[error("Failed to load document: {}\n  Reason: {reason}", .path.display())]
    FailedToLoadDocx {
        /// Path to the document.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// Document package is structurally invalid.
    #[error("Corrupted or invalid document: {}\n  Details: {details}", .path.display())]
    CorruptedDocx {
        /// Path to the corrupted document.
        path: PathBuf,
        /// Details about the corruption.
        details: String,
    },

    /// A package part could not be parsed.
    #[error("Malformed part '{part}': {details}")]
    MalformedPart {
        /// Name of the part inside the package.
        part: String,
        /// Parser message.
        details: String,
    },

    /// A part required by the Word format is absent.
    #[error("Package is missing required part '{part}'")]
    MissingPart {
        /// Name of the missing part.
        part: String,
    },

    /// Failed to create output file.
    #[error("Failed to create output file: {}\n  Reason: {source}", .path.display())]
    FailedToCreateOutput {
        /// Path where output should be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to write to output file.
    #[error("Failed to write to output file: {}\n  Reason: {source}", .path.display())]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Merge operation failed.
    #[error("Merge operation failed: {reason}")]
    MergeFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// Zip container error.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML parser or writer error.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Generic I/O error.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

fn skipped_list(skipped: &[SkippedInput]) -> String {
    skipped
        .iter()
        .map(|input| {
            let name = input
                .path
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_else(|| input.path.to_string_lossy());
            format!("\n  - {name}: {}", input.reason)
        })
        .collect()
}

impl From<quick_xml::events::attributes::AttrError> for DocxCatError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(err.into())
    }
}

impl From<anyhow::Error> for DocxCatError {
    fn from(err: anyhow::Error) -> Self {
        Self::other(err.to_string())
    }
}

impl DocxCatError {
    /// Create a FileNotFound error.
    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    /// Create a NotAFile error.
    pub fn not_a_file(path: PathBuf) -> Self {
        Self::NotAFile { path }
    }

    /// Create a FailedToLoadDocx error.
    pub fn failed_to_load_docx(path: PathBuf, reason: impl Into<String>) -> Self {
        Self::FailedToLoadDocx {
            path,
            reason: reason.into(),
        }
    }

    /// Create a CorruptedDocx error.
    pub fn corrupted_docx(path: PathBuf, details: impl Into<String>) -> Self {
        Self::CorruptedDocx {
            path,
            details: details.into(),
        }
    }

    /// Create a MalformedPart error.
    pub fn malformed_part(part: impl Into<String>, details: impl ToString) -> Self {
        Self::MalformedPart {
            part: part.into(),
            details: details.to_string(),
        }
    }

    /// Create a MissingPart error.
    pub fn missing_part(part: impl Into<String>) -> Self {
        Self::MissingPart { part: part.into() }
    }

    /// Create a MergeFailed error.
    pub fn merge_failed(reason: impl Into<String>) -> Self {
        Self::MergeFailed {
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Attach the offending file to a package-level error.
    ///
    /// Errors raised while parsing a package in memory know nothing about
    /// the file it came from; this turns them into [`Self::CorruptedDocx`].
    pub fn with_path(self, path: PathBuf) -> Self {
        match self {
            Self::Zip(err) => Self::corrupted_docx(path, err.to_string()),
            Self::Xml(err) => Self::corrupted_docx(path, err.to_string()),
            Self::MalformedPart { part, details } => {
                Self::corrupted_docx(path, format!("{part}: {details}"))
            }
            Self::MissingPart { part } => {
                Self::corrupted_docx(path, format!("missing part '{part}'"))
            }
            other => other,
        }
    }

    /// Check if this error only concerns a single input document.
    ///
    /// Recoverable errors cause the input to be skipped; the run continues.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EmptyDocument { .. }
                | Self::FailedToLoadDocx { .. }
                | Self::CorruptedDocx { .. }
                | Self::MalformedPart { .. }
                | Self::MissingPart { .. }
                | Self::Zip(_)
                | Self::Xml(_)
        )
    }

    /// Check if this error should stop all processing immediately.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InputDirNotFound { .. }
                | Self::NoInputFiles { .. }
                | Self::NoReadableInputs { .. }
                | Self::FailedToCreateOutput { .. }
                | Self::FailedToWrite { .. }
        )
    }

    /// Check if this error is the empty-input condition.
    pub fn is_empty_input(&self) -> bool {
        matches!(
            self,
            Self::NoInputFiles { .. } | Self::NoReadableInputs { .. }
        )
    }

    /// Process exit code for this error.
    ///
    /// `1` nothing to do or bad arguments, `2` missing paths, `3` unreadable
    /// document, `5` output not written, `6` merge failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoInputFiles { .. }
            | Self::NoReadableInputs { .. }
            | Self::InvalidConfig { .. }
            | Self::Other { .. } => 1,
            Self::FileNotFound { .. }
            | Self::FileNotAccessible { .. }
            | Self::NotAFile { .. }
            | Self::InputDirNotFound { .. } => 2,
            Self::FailedToCreateOutput { .. } | Self::FailedToWrite { .. } | Self::Io { .. } => 5,
            Self::MergeFailed { .. } => 6,
            _ if self.is_recoverable() => 3,
            _ => 1,
        }
    }
}
