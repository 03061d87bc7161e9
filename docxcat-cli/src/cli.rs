//! CLI argument parsing for docxcat.
//!
//! This module defines the command-line interface structure using `clap`.
//! It handles argument parsing, validation, and help text generation.
//! Every flag is optional: with no arguments docxcat merges `to_merge/*.docx`
//! into `Merged_Doc.docx` and renders `Merged_Doc.pdf`.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use docxcat::config::{
    Config, ConverterSettings, DEFAULT_INPUT_DIR, DEFAULT_OFFICE_BIN, DEFAULT_OUTPUT,
    DEFAULT_PDF_OUTPUT, DEFAULT_RENDERER_BIN, Metadata,
};
use docxcat::error::{DocxCatError, Result};

/// Merge Word documents into one and render it to PDF.
///
/// docxcat reads every .docx file in the input directory in file name
/// order, appends them into a single document with a page break between
/// each, and converts the result to PDF with LibreOffice. When LibreOffice
/// is missing or fails, the document is converted to HTML and printed
/// with wkhtmltopdf instead.
#[derive(Parser, Debug)]
#[command(name = "docxcat")]
#[command(version)]
#[command(about = "Merge Word documents and render the result to PDF", long_about = None)]
#[command(author)]
pub struct Cli {
    /// Directory holding the .docx files to merge
    ///
    /// Files are merged in file name order. Hidden files and Office lock
    /// files (~$name.docx) are ignored. Subdirectories are not scanned.
    #[arg(
        short,
        long,
        value_name = "DIR",
        env = "DOCXCAT_INPUT_DIR",
        default_value = DEFAULT_INPUT_DIR
    )]
    pub input_dir: PathBuf,

    /// Combined document path
    ///
    /// Overwritten if it exists. When it cannot be written, the document
    /// is saved next to it as <name>_autosaved.docx.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// PDF output path
    #[arg(long = "pdf", value_name = "FILE", default_value = DEFAULT_PDF_OUTPUT)]
    pub pdf_output: PathBuf,

    /// Office engine used for conversion and repair
    #[arg(
        long,
        value_name = "BIN",
        env = "DOCXCAT_OFFICE_BIN",
        default_value = DEFAULT_OFFICE_BIN
    )]
    pub office_bin: PathBuf,

    /// HTML to PDF renderer used when the office engine fails
    #[arg(
        long,
        value_name = "BIN",
        env = "DOCXCAT_RENDERER_BIN",
        default_value = DEFAULT_RENDERER_BIN
    )]
    pub renderer_bin: PathBuf,

    /// Time limit for the office engine conversion, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 600)]
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub primary_timeout: u64,

    /// Time limit for the HTML renderer, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 300)]
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub secondary_timeout: u64,

    /// Time limit for repairing one unreadable document, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 180)]
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub recovery_timeout: u64,

    /// Skip unreadable documents without trying to repair them
    ///
    /// By default an unreadable document is re-saved through the office
    /// engine once before it is skipped.
    #[arg(long)]
    pub no_recover: bool,

    /// Copy the images of every document into DIR/<document name>/
    #[arg(long, value_name = "DIR")]
    pub extract_images: Option<PathBuf>,

    /// Set title metadata for the combined document
    ///
    /// If not specified, the title of the first document is kept.
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Set author metadata for the combined document
    #[arg(long, value_name = "TEXT")]
    pub author: Option<String>,

    /// Set subject metadata for the combined document
    #[arg(long, value_name = "TEXT")]
    pub subject: Option<String>,

    /// Set keywords metadata for the combined document (comma-separated)
    #[arg(long, value_name = "TEXT")]
    pub keywords: Option<String>,

    /// Dry run - list the documents and the plan without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose output - show statistics and converter details
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all non-error output
    ///
    /// Only errors and warnings will be printed.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print a JSON report of the run on stdout
    ///
    /// Progress messages move to stderr.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Convert CLI arguments into a validated Config.
    ///
    /// # Errors
    ///
    /// Returns [`DocxCatError::InvalidConfig`] if configuration validation
    /// fails.
    pub fn to_config(&self) -> Result<Config> {
        let metadata = Metadata::new(
            self.title.clone(),
            self.author.clone(),
            self.subject.clone(),
            self.keywords.clone(),
        );

        let config = Config {
            input_dir: self.input_dir.clone(),
            output: self.output.clone(),
            pdf_output: self.pdf_output.clone(),
            converters: ConverterSettings {
                office_bin: self.office_bin.clone(),
                renderer_bin: self.renderer_bin.clone(),
                primary_timeout: Duration::from_secs(self.primary_timeout),
                secondary_timeout: Duration::from_secs(self.secondary_timeout),
                recovery_timeout: Duration::from_secs(self.recovery_timeout),
            },
            metadata,
            recover: !self.no_recover,
            extract_images: self.extract_images.clone(),
            dry_run: self.dry_run,
            verbose: self.verbose,
            quiet: self.quiet,
        };

        config.validate().map_err(|e| {
            DocxCatError::invalid_config(format!("Configuration validation failed: {e}"))
        })?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("docxcat").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).to_config().unwrap();
        let expected = Config::default();

        assert_eq!(config.output, expected.output);
        assert_eq!(config.pdf_output, expected.pdf_output);
        assert_eq!(config.converters.primary_timeout, Duration::from_secs(600));
        assert_eq!(config.converters.secondary_timeout, Duration::from_secs(300));
        assert_eq!(config.converters.recovery_timeout, Duration::from_secs(180));
        assert!(config.recover);
        assert!(config.metadata.is_empty());
    }

    #[test]
    fn test_flags() {
        let config = parse(&[
            "--input-dir",
            "docs",
            "-o",
            "out/book.docx",
            "--pdf",
            "out/book.pdf",
            "--no-recover",
            "--title",
            "  Book  ",
            "--primary-timeout",
            "30",
            "--extract-images",
            "images",
            "-n",
        ])
        .to_config()
        .unwrap();

        assert_eq!(config.input_dir, PathBuf::from("docs"));
        assert_eq!(config.output, PathBuf::from("out/book.docx"));
        assert_eq!(config.pdf_output, PathBuf::from("out/book.pdf"));
        assert!(!config.recover);
        assert!(config.dry_run);
        assert_eq!(config.metadata.title.as_deref(), Some("Book"));
        assert_eq!(config.converters.primary_timeout, Duration::from_secs(30));
        assert_eq!(config.extract_images, Some(PathBuf::from("images")));
    }

    #[rstest]
    #[case(&["--primary-timeout", "0"])]
    #[case(&["--verbose", "--quiet"])]
    #[case(&["--recovery-timeout", "soon"])]
    fn test_rejected_arguments(#[case] args: &[&str]) {
        let parsed = Cli::try_parse_from(std::iter::once("docxcat").chain(args.iter().copied()));
        assert!(parsed.is_err());
    }

    #[rstest]
    #[case(&["-o", "merged.pdf"])]
    #[case(&["--pdf", "merged.docx"])]
    #[case(&["-o", "same.docx", "--pdf", "same.docx"])]
    fn test_invalid_config(#[case] args: &[&str]) {
        let err = parse(args).to_config().unwrap_err();
        assert!(matches!(err, DocxCatError::InvalidConfig { .. }));
        assert_eq!(err.exit_code(), 1);
    }
}
