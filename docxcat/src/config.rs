//! Run configuration.
//!
//! [`Config`] says where the inputs live, where the combined document and
//! its PDF rendering go, and which external tools to call with what time
//! limits. The CLI builds it; [`Config::validate`] rejects combinations
//! that cannot work before anything is touched.

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory scanned for input documents when none is given.
pub const DEFAULT_INPUT_DIR: &str = "to_merge";

/// Combined document written when no output is given.
pub const DEFAULT_OUTPUT: &str = "Merged_Doc.docx";

/// PDF rendering written when no PDF output is given.
pub const DEFAULT_PDF_OUTPUT: &str = "Merged_Doc.pdf";

/// Extension of the documents docxcat merges.
pub const SOURCE_EXTENSION: &str = "docx";

/// Default office engine binary.
pub const DEFAULT_OFFICE_BIN: &str = "soffice";

/// Default HTML-to-PDF renderer binary.
pub const DEFAULT_RENDERER_BIN: &str = "wkhtmltopdf";

/// External tools and their time limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterSettings {
    /// Office engine used for the primary conversion and for recovery.
    pub office_bin: PathBuf,

    /// HTML renderer used for the secondary conversion.
    pub renderer_bin: PathBuf,

    /// Time limit of the primary conversion.
    pub primary_timeout: Duration,

    /// Time limit of the secondary conversion.
    pub secondary_timeout: Duration,

    /// Time limit of one recovery re-save.
    pub recovery_timeout: Duration,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            office_bin: PathBuf::from(DEFAULT_OFFICE_BIN),
            renderer_bin: PathBuf::from(DEFAULT_RENDERER_BIN),
            primary_timeout: Duration::from_secs(600),
            secondary_timeout: Duration::from_secs(300),
            recovery_timeout: Duration::from_secs(180),
        }
    }
}

/// Core properties to set on the combined document.
///
/// Unset fields keep whatever the first input carried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// `dc:title`.
    pub title: Option<String>,
    /// `dc:creator`.
    pub author: Option<String>,
    /// `dc:subject`.
    pub subject: Option<String>,
    /// `cp:keywords`, comma-separated.
    pub keywords: Option<String>,
}

impl Metadata {
    /// Build metadata from raw command-line values. Values are trimmed and
    /// blank ones dropped.
    pub fn new(
        title: Option<String>,
        author: Option<String>,
        subject: Option<String>,
        keywords: Option<String>,
    ) -> Self {
        Self {
            title: non_blank(title),
            author: non_blank(author),
            subject: non_blank(subject),
            keywords: non_blank(keywords),
        }
    }

    /// Whether no property would be changed.
    pub fn is_empty(&self) -> bool {
        [&self.title, &self.author, &self.subject, &self.keywords]
            .iter()
            .all(|field| field.is_none())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Complete configuration for a merge-and-render run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the documents to merge.
    pub input_dir: PathBuf,

    /// Combined document path.
    pub output: PathBuf,

    /// PDF rendering path.
    pub pdf_output: PathBuf,

    /// External tools and timeouts.
    pub converters: ConverterSettings,

    /// Metadata to set on the combined document.
    pub metadata: Metadata,

    /// Try to repair unreadable inputs through the office engine.
    pub recover: bool,

    /// Copy the media of every readable input into this directory.
    pub extract_images: Option<PathBuf>,

    /// Dry run mode - report the plan without writing anything.
    pub dry_run: bool,

    /// Verbose output mode.
    pub verbose: bool,

    /// Quiet mode - suppress non-error output.
    pub quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output: PathBuf::from(DEFAULT_OUTPUT),
            pdf_output: PathBuf::from(DEFAULT_PDF_OUTPUT),
            converters: ConverterSettings::default(),
            metadata: Metadata::default(),
            recover: true,
            extract_images: None,
            dry_run: false,
            verbose: false,
            quiet: false,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// Checks for logical inconsistencies and invalid combinations.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Verbose and quiet modes are both enabled
    /// - The combined document and the PDF share a path
    /// - An output has the wrong extension
    /// - The combined document would land in the input directory
    /// - A timeout is zero
    pub fn validate(&self) -> Result<()> {
        if self.verbose && self.quiet {
            bail!("Cannot use both --verbose and --quiet");
        }

        if self.output == self.pdf_output {
            bail!(
                "The combined document and the PDF cannot share a path: {}",
                self.output.display()
            );
        }

        if !has_extension(&self.output, SOURCE_EXTENSION) {
            bail!(
                "Output file must have a .{SOURCE_EXTENSION} extension: {}",
                self.output.display()
            );
        }

        if !has_extension(&self.pdf_output, "pdf") {
            bail!(
                "PDF output must have a .pdf extension: {}",
                self.pdf_output.display()
            );
        }

        let output_dir = match self.output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        if same_dir(output_dir, &self.input_dir) {
            bail!(
                "Output file cannot be inside the input directory {}; it would be merged on the next run",
                self.input_dir.display()
            );
        }

        let timeouts = [
            ("primary", self.converters.primary_timeout),
            ("secondary", self.converters.secondary_timeout),
            ("recovery", self.converters.recovery_timeout),
        ];
        for (name, timeout) in timeouts {
            if timeout.is_zero() {
                bail!("The {name} conversion timeout must be at least one second");
            }
        }

        Ok(())
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.components().eq(b.components()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_paths() {
        let config = Config::default();
        assert_eq!(config.input_dir, PathBuf::from("to_merge"));
        assert_eq!(config.output, PathBuf::from("Merged_Doc.docx"));
        assert_eq!(config.pdf_output, PathBuf::from("Merged_Doc.pdf"));
        assert_eq!(config.converters.primary_timeout, Duration::from_secs(600));
        assert_eq!(config.converters.secondary_timeout, Duration::from_secs(300));
        assert_eq!(config.converters.recovery_timeout, Duration::from_secs(180));
        assert!(config.recover);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_metadata_drops_blank_values() {
        let meta = Metadata::new(
            Some("  Quarterly report ".to_string()),
            Some("\t \n".to_string()),
            None,
            Some("finance, q3".to_string()),
        );

        assert_eq!(meta.title.as_deref(), Some("Quarterly report"));
        assert!(meta.author.is_none());
        assert!(meta.subject.is_none());
        assert_eq!(meta.keywords.as_deref(), Some("finance, q3"));
        assert!(!meta.is_empty());
        assert!(Metadata::new(Some(" ".into()), None, None, None).is_empty());
    }

    #[test]
    fn test_flag_conflicts_rejected() {
        let config = Config {
            verbose: true,
            quiet: true,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("--verbose"));
    }

    #[test]
    fn test_output_paths_checked() {
        let base = Config::default();

        let shared = Config {
            pdf_output: PathBuf::from(DEFAULT_OUTPUT),
            ..base.clone()
        };
        assert!(shared.validate().is_err());

        let upper_case = Config {
            output: PathBuf::from("MERGED.DOCX"),
            ..base.clone()
        };
        assert!(upper_case.validate().is_ok());

        for (output, pdf_output) in [
            ("merged.doc", DEFAULT_PDF_OUTPUT),
            (DEFAULT_OUTPUT, "merged.html"),
            ("to_merge/merged.docx", DEFAULT_PDF_OUTPUT),
        ] {
            let config = Config {
                output: output.into(),
                pdf_output: pdf_output.into(),
                ..base.clone()
            };
            assert!(config.validate().is_err(), "{output} / {pdf_output}");
        }
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.converters.recovery_timeout = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("recovery"));
    }
}
