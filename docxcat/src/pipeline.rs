//! One complete run: discover, merge, write, render.
//!
//! [`run`] drives the three steps in order and reports through an
//! [`OutputFormatter`]. Only a missing input set and a combined document
//! that cannot be written end the run with an error; unreadable inputs are
//! skipped and a failed rendering is recorded in the returned report.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

use crate::config::{Config, SOURCE_EXTENSION};
use crate::convert::{self, ConversionOutcome, ConverterAvailability, OfficeEngine, PdfConverter};
use crate::discovery::{InputDocument, discover_inputs};
use crate::error::{DocxCatError, Result};
use crate::io::{DocxReader, DocxWriter, WriteStatistics};
use crate::merge::{MergeStatistics, MergedInput, Merger, SkippedInput};
use crate::output::{
    OutputFormatter, display_availability, display_conversion_outcome, display_merge_statistics,
};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    /// Combined document and PDF were both written.
    Completed,
    /// Combined document written, but no PDF could be produced.
    RenderingFailed,
    /// Nothing was written.
    DryRun,
}

impl RunStatus {
    /// Process exit code for this status.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Completed | Self::DryRun => 0,
            Self::RenderingFailed => 7,
        }
    }
}

/// Everything a run did, serializable for `--json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// How the run ended.
    pub status: RunStatus,
    /// Discovered inputs, in merge order.
    pub inputs: Vec<PathBuf>,
    /// Inputs that made it into the combined document.
    pub merged: Vec<MergedInput>,
    /// Inputs that were skipped.
    pub skipped: Vec<SkippedInput>,
    /// Merge statistics (absent on a dry run).
    pub statistics: Option<MergeStatistics>,
    /// Where the combined document went.
    pub document: Option<WriteStatistics>,
    /// Converters found on this machine.
    pub converters: ConverterAvailability,
    /// Result of the PDF conversion.
    pub conversion: Option<ConversionOutcome>,
    /// Wall time of the run in milliseconds.
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Process exit code for this run.
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    fn new(status: RunStatus, inputs: &[InputDocument], converters: ConverterAvailability) -> Self {
        Self {
            status,
            inputs: inputs.iter().map(|input| input.path.clone()).collect(),
            merged: Vec::new(),
            skipped: Vec::new(),
            statistics: None,
            document: None,
            converters,
            conversion: None,
            elapsed_ms: 0,
        }
    }
}

/// Run docxcat once with the given configuration.
///
/// # Errors
///
/// Returns an error if:
/// - The input directory is missing or holds no documents
/// - None of the documents can be read
/// - The combined document cannot be written (autosave included)
///
/// # Examples
///
/// ```no_run
/// use docxcat::config::Config;
/// use docxcat::output::OutputFormatter;
/// use docxcat::pipeline;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let report = pipeline::run(&config, &OutputFormatter::from_config(&config)).await?;
/// std::process::exit(report.exit_code());
/// # }
/// ```
pub async fn run(config: &Config, formatter: &OutputFormatter) -> Result<RunReport> {
    let start = Instant::now();

    let inputs = discover_inputs(&config.input_dir, SOURCE_EXTENSION)?;
    if inputs.is_empty() {
        return Err(DocxCatError::NoInputFiles {
            dir: config.input_dir.clone(),
        });
    }

    formatter.section(&format!(
        "Found {} document(s) in {}",
        inputs.len(),
        config.input_dir.display()
    ));
    for input in &inputs {
        formatter.list_item(input.ordinal + 1, &input.file_name());
    }

    let converters = convert::detect(&config.converters);
    display_availability(formatter, &converters);

    if config.dry_run {
        return dry_run(config, formatter, &inputs, converters, start).await;
    }

    let mut report = RunReport::new(RunStatus::Completed, &inputs, converters);

    formatter.section("Merging documents...");
    let reader = if config.recover {
        DocxReader::with_recovery(OfficeEngine::new(
            &config.converters.office_bin,
            config.converters.recovery_timeout,
        ))
    } else {
        DocxReader::new()
    };
    let result = match Merger::with_reader(reader).merge(&inputs, config).await {
        Ok(result) => result,
        Err(err) => {
            if let DocxCatError::NoReadableInputs { skipped } = &err {
                display_skipped(formatter, skipped);
                formatter.error("None of the documents could be read");
            }
            return Err(err);
        }
    };

    let total = inputs.len();
    for merged in &result.merged {
        let name = display_name(&merged.path);
        let note = if merged.recovered { " (repaired)" } else { "" };
        formatter.progress(
            merged.ordinal + 1,
            total,
            &format!("{name}: {} block(s){note}", merged.blocks),
        );
    }
    display_skipped(formatter, &result.skipped);
    display_merge_statistics(formatter, &result.statistics);

    let written = DocxWriter::new()
        .save(&result.document.into_package(), &config.output)
        .await?;
    if written.autosaved {
        formatter.warning(&format!(
            "Could not write {}; saved to {} instead",
            config.output.display(),
            written.output_path.display()
        ));
    }
    formatter.success(&format!(
        "Wrote {} ({})",
        written.output_path.display(),
        written.format_file_size()
    ));

    formatter.section("Rendering PDF...");
    let outcome = PdfConverter::new(&config.converters)
        .convert(&written.output_path, &config.pdf_output)
        .await;
    display_conversion_outcome(formatter, &outcome);

    if !outcome.is_success() {
        report.status = RunStatus::RenderingFailed;
        formatter.warning(&format!(
            "Only the combined document is available: {}",
            written.output_path.display()
        ));
    }

    report.merged = result.merged;
    report.skipped = result.skipped;
    report.statistics = Some(result.statistics);
    report.document = Some(written);
    report.conversion = Some(outcome);
    report.elapsed_ms = start.elapsed().as_millis() as u64;
    Ok(report)
}

async fn dry_run(
    config: &Config,
    formatter: &OutputFormatter,
    inputs: &[InputDocument],
    converters: ConverterAvailability,
    start: Instant,
) -> Result<RunReport> {
    let writer = DocxWriter::new();
    for output in [&config.output, &config.pdf_output] {
        if let Err(err) = writer.can_write(output).await {
            formatter.warning(&err.to_string());
        }
    }

    formatter.section("Dry run completed successfully");
    formatter.info(&format!("  Combined document would be: {}", config.output.display()));
    match converters.planned_route() {
        Some(route) => formatter.info(&format!(
            "  PDF would be: {} (via {route})",
            config.pdf_output.display()
        )),
        None => formatter.info("  PDF would not be produced: no converter available"),
    }
    if let Some(dir) = &config.extract_images {
        formatter.info(&format!("  Images would be copied into: {}", dir.display()));
    }
    formatter.info("  Run without --dry-run to merge the documents");

    let mut report = RunReport::new(RunStatus::DryRun, inputs, converters);
    report.elapsed_ms = start.elapsed().as_millis() as u64;
    Ok(report)
}

fn display_skipped(formatter: &OutputFormatter, skipped: &[SkippedInput]) {
    for input in skipped {
        formatter.warning(&format!(
            "Skipped {}: {}",
            display_name(&input.path),
            input.reason
        ));
    }
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
