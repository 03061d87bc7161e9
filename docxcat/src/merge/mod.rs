//! Document merging operations.
//!
//! This module provides the core merging functionality with:
//! - Body splitting and fragment rewriting
//! - Relocation of images, embedded objects and hyperlink targets
//! - Bookmark renaming and renumbering
//! - Style sheet merging
//! - Metadata management
//! - Order preservation
//!
//! # Examples
//!
//! ```no_run
//! use docxcat::config::Config;
//! use docxcat::discovery::discover_inputs;
//! use docxcat::merge::Merger;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let inputs = discover_inputs(&config.input_dir, "docx")?;
//!
//! let merger = Merger::new();
//! let result = merger.merge(&inputs, &config).await?;
//! println!("Merged {} documents", result.statistics.files_merged);
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod bookmarks;
pub mod document;
pub mod merger;
pub mod metadata;
pub mod relocate;
pub mod styles;

pub use body::{BlockKind, DocumentBody};
pub use document::{AppendReport, CombinedDocument, ContentBlock};
pub use merger::{MergeResult, MergeStatistics, MergedInput, Merger, SkipStage, SkippedInput};
pub use metadata::MetadataManager;

use crate::config::Config;
use crate::discovery::InputDocument;
use crate::error::Result;
use crate::io::DocxReader;

/// Merge documents according to configuration.
///
/// Convenience function that creates a merger and performs the merge.
/// Unreadable documents are skipped without a repair pass.
///
/// # Errors
///
/// Returns an error if no document can be read or the merge fails.
pub async fn merge_docx(
    inputs: &[InputDocument],
    config: &Config,
) -> Result<(CombinedDocument, MergeStatistics)> {
    let merger = Merger::with_reader(DocxReader::new());
    let result = merger.merge(inputs, config).await?;
    Ok((result.document, result.statistics))
}
