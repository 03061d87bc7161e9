//! Core document merging implementation.
//!
//! This module implements the main merge loop: inputs are loaded one after
//! another, the first readable one becomes the base of the combined
//! document, and every later one is appended after a page break. Inputs
//! that cannot be read or appended are skipped and reported.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::discovery::InputDocument;
use crate::error::{DocxCatError, Result};
use crate::io::{DocxReader, LoadedDocx, extract_media, format_file_size};
use crate::merge::document::{AppendReport, CombinedDocument};
use crate::merge::metadata::MetadataManager;

/// Statistics about a merge operation.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStatistics {
    /// Number of documents merged.
    pub files_merged: usize,

    /// Number of documents skipped as unreadable.
    pub files_skipped: usize,

    /// Number of documents that needed a repair pass.
    pub files_recovered: usize,

    /// Body blocks in the combined document, page breaks excluded.
    pub total_blocks: usize,

    /// Page breaks inserted between documents.
    pub page_breaks: usize,

    /// Parts (images, embedded objects) copied into the combined package.
    pub parts_copied: usize,

    /// Bookmarks renamed to avoid collisions.
    pub bookmarks_renamed: usize,

    /// Note and comment references dropped from appended content.
    pub dropped_references: usize,

    /// Relationship references that could not be resolved.
    pub unresolved_references: usize,

    /// Style definitions copied from later documents.
    pub styles_added: usize,

    /// Media files written by image extraction.
    pub images_extracted: usize,

    /// Total time taken for the merge, loading included.
    #[serde(skip)]
    pub merge_time: Duration,

    /// Time taken to load all documents.
    #[serde(skip)]
    pub load_time: Duration,

    /// Total size of the merged input files.
    pub input_size: u64,
}

impl MergeStatistics {
    /// Format input size as human-readable string.
    pub fn format_input_size(&self) -> String {
        format_file_size(self.input_size)
    }

    fn record(&mut self, report: &AppendReport) {
        self.parts_copied += report.parts_copied;
        self.bookmarks_renamed += report.bookmarks_renamed;
        self.dropped_references += report.dropped_references;
        self.unresolved_references += report.unresolved_references;
        self.styles_added += report.styles_added;
    }
}

/// A document that made it into the combined document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedInput {
    /// Path to the document.
    pub path: PathBuf,

    /// Position among the discovered inputs.
    pub ordinal: usize,

    /// Body blocks contributed.
    pub blocks: usize,

    /// Whether the document was read through the repair pass.
    pub recovered: bool,
}

/// Stage at which an input was given up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipStage {
    /// The file could not be read.
    Load,
    /// The file was read but its content could not be carried over.
    Append,
}

/// A document left out of the combined document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedInput {
    /// Path to the document.
    pub path: PathBuf,

    /// Position among the discovered inputs.
    pub ordinal: usize,

    /// Where it failed.
    pub stage: SkipStage,

    /// Why it was skipped.
    pub reason: String,
}

/// Result of a merge operation.
#[derive(Debug)]
pub struct MergeResult {
    /// The combined document, not yet written.
    pub document: CombinedDocument,

    /// Statistics about the merge.
    pub statistics: MergeStatistics,

    /// Documents merged, in order.
    pub merged: Vec<MergedInput>,

    /// Documents skipped, in order.
    pub skipped: Vec<SkippedInput>,
}

impl MergeResult {
    /// Paths of the documents merged, in order.
    pub fn merged_files(&self) -> Vec<&Path> {
        self.merged.iter().map(|m| m.path.as_path()).collect()
    }
}

/// Document merger that combines multiple inputs.
pub struct Merger {
    /// Reader for loading documents.
    reader: DocxReader,

    /// Metadata manager for document properties.
    metadata_manager: MetadataManager,
}

impl Merger {
    /// Create a new merger that skips unreadable documents without repair.
    pub fn new() -> Self {
        Self::with_reader(DocxReader::new())
    }

    /// Create a merger that loads documents through `reader`.
    pub fn with_reader(reader: DocxReader) -> Self {
        Self {
            reader,
            metadata_manager: MetadataManager::new(),
        }
    }

    /// Merge the given documents in order.
    ///
    /// This is the main entry point for merging operations. The metadata
    /// and image extraction settings are taken from `config`.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Documents to merge, in merge order
    /// * `config` - Run configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No input could be read ([`DocxCatError::NoReadableInputs`])
    /// - Metadata cannot be written into the combined package
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use docxcat::merge::Merger;
    /// # use docxcat::config::Config;
    /// # use docxcat::discovery::discover_inputs;
    /// # async fn example(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    /// let inputs = discover_inputs(&config.input_dir, "docx")?;
    /// let result = Merger::new().merge(&inputs, &config).await?;
    /// println!("Merged {} files with {} page breaks",
    ///          result.statistics.files_merged,
    ///          result.statistics.page_breaks);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn merge(&self, inputs: &[InputDocument], config: &Config) -> Result<MergeResult> {
        let merge_start = Instant::now();
        let mut statistics = MergeStatistics::default();
        let mut merged = Vec::new();
        let mut skipped = Vec::new();
        let mut document: Option<CombinedDocument> = None;

        for input in inputs {
            let load_start = Instant::now();
            let loaded = self.reader.load(&input.path).await;
            statistics.load_time += load_start.elapsed();

            let loaded = match loaded {
                Ok(loaded) => loaded,
                Err(err) => {
                    log::warn!("skipping {}: {err}", input.path.display());
                    skipped.push(SkippedInput::new(input, SkipStage::Load, &err));
                    continue;
                }
            };

            if let Some(dir) = &config.extract_images {
                statistics.images_extracted += self.extract_images(&loaded, input, dir).await;
            }

            let blocks = loaded.block_count;
            let appended = match document.as_mut() {
                None => CombinedDocument::new(loaded.package, loaded.body, input.ordinal)
                    .map(|base| {
                        document = Some(base);
                    }),
                Some(combined) => combined
                    .append(&loaded.package, &loaded.body, input.ordinal)
                    .map(|report| {
                        log::debug!(
                            "appended {}: {} block(s), {} part(s) copied",
                            input.path.display(),
                            report.blocks,
                            report.parts_copied
                        );
                        statistics.record(&report);
                    }),
            };

            match appended {
                Ok(()) => {
                    statistics.input_size += loaded.file_size;
                    if loaded.recovered {
                        statistics.files_recovered += 1;
                    }
                    merged.push(MergedInput {
                        path: input.path.clone(),
                        ordinal: input.ordinal,
                        blocks,
                        recovered: loaded.recovered,
                    });
                }
                Err(err) => {
                    log::warn!("cannot merge {}: {err}", input.path.display());
                    skipped.push(SkippedInput::new(input, SkipStage::Append, &err));
                }
            }
        }

        let Some(mut document) = document else {
            return Err(DocxCatError::NoReadableInputs { skipped });
        };

        if !config.metadata.is_empty() {
            self.metadata_manager
                .set_metadata(document.package_mut(), &config.metadata)?;
        }

        statistics.files_merged = merged.len();
        statistics.files_skipped = skipped.len();
        statistics.page_breaks = document.page_breaks();
        statistics.total_blocks = document.blocks().len() - statistics.page_breaks;
        statistics.merge_time = merge_start.elapsed();

        Ok(MergeResult {
            document,
            statistics,
            merged,
            skipped,
        })
    }

    /// Copy the media of one input into `<dir>/<stem>/`.
    ///
    /// Extraction problems are logged and never fail the merge.
    async fn extract_images(&self, loaded: &LoadedDocx, input: &InputDocument, dir: &Path) -> usize {
        let target = dir.join(input.stem());
        match extract_media(&loaded.package, &target).await {
            Ok(written) => written.len(),
            Err(err) => {
                log::warn!("cannot extract images of {}: {err}", input.path.display());
                0
            }
        }
    }
}

impl Default for Merger {
    fn default() -> Self {
        Self::new()
    }
}

impl SkippedInput {
    fn new(input: &InputDocument, stage: SkipStage, err: &DocxCatError) -> Self {
        Self {
            path: input.path.clone(),
            ordinal: input.ordinal,
            stage,
            reason: err.to_string(),
        }
    }
}
