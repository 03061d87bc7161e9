//! Input discovery.
//!
//! Lists the documents to merge: regular files directly inside the input
//! directory whose extension matches (case-insensitively), minus hidden
//! files and the `~$name.docx` lock files Office leaves next to open
//! documents. The result is sorted by file name, which fixes the merge
//! order.
//!
//! # Examples
//!
//! ```no_run
//! use docxcat::discovery::discover_inputs;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! for input in discover_inputs(Path::new("to_merge"), "docx")? {
//!     println!("{}. {}", input.ordinal + 1, input.path.display());
//! }
//! # Ok(())
//! # }
//! ```

use globset::{GlobBuilder, GlobMatcher};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{DocxCatError, Result};

/// Prefix of the lock files Office creates for open documents.
const LOCK_FILE_PREFIX: &str = "~$";

/// A document selected for merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDocument {
    /// Path to the document.
    pub path: PathBuf,

    /// Zero-based position in the merge order.
    pub ordinal: usize,
}

impl InputDocument {
    /// File name for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// File name without extension.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("input{}", self.ordinal + 1))
    }
}

/// List the documents to merge, in merge order.
///
/// # Arguments
///
/// * `dir` - Directory to scan (not recursive)
/// * `extension` - Extension to match, without the dot
///
/// # Errors
///
/// Returns [`DocxCatError::InputDirNotFound`] if `dir` does not exist, and
/// an I/O error if it cannot be listed. An empty result is not an error.
pub fn discover_inputs(dir: &Path, extension: &str) -> Result<Vec<InputDocument>> {
    if !dir.exists() {
        return Err(DocxCatError::InputDirNotFound {
            path: dir.to_path_buf(),
        });
    }
    if !dir.is_dir() {
        return Err(DocxCatError::invalid_config(format!(
            "Input path is not a directory: {}",
            dir.display()
        )));
    }

    let matcher = extension_matcher(extension)?;
    let mut paths = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| DocxCatError::FileNotAccessible {
            path: err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| dir.to_path_buf()),
            source: err.into(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') || name.starts_with(LOCK_FILE_PREFIX) {
            log::debug!("skipping {name}");
            continue;
        }
        if !matcher.is_match(entry.file_name()) {
            continue;
        }

        paths.push(entry.into_path());
    }

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(ordinal, path)| InputDocument { path, ordinal })
        .collect())
}

fn extension_matcher(extension: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(&format!("*.{extension}"))
        .case_insensitive(true)
        .literal_separator(true)
        .build()
        .map_err(|err| DocxCatError::invalid_config(format!("Invalid extension {extension}: {err}")))?;
    Ok(glob.compile_matcher())
}
