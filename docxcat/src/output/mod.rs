//! Output formatting and display for docxcat.
//!
//! This module handles all user-facing output including:
//! - Formatted status messages
//! - Error and warning display
//! - Summary reports
//! - Quiet and verbose modes
//!
//! Internal diagnostics go through the `log` facade instead.
//!
//! # Examples
//!
//! ```no_run
//! use docxcat::output::OutputFormatter;
//! use docxcat::config::Config;
//!
//! # fn example(config: Config) {
//! let formatter = OutputFormatter::from_config(&config);
//! formatter.info("Starting merge operation");
//! formatter.success("Merge completed successfully");
//! # }
//! ```

pub mod formatter;

pub use formatter::{MessageLevel, OutputFormatter, Verbosity};

use crate::config::Config;
use crate::convert::{ConversionOutcome, ConverterAvailability};
use crate::io::format_file_size;
use crate::merge::MergeStatistics;

/// Create an output formatter from configuration.
///
/// # Returns
///
/// An OutputFormatter configured according to quiet/verbose settings.
pub fn create_formatter(config: &Config) -> OutputFormatter {
    OutputFormatter::from_config(config)
}

/// Display merge statistics to the user.
pub fn display_merge_statistics(formatter: &OutputFormatter, stats: &MergeStatistics) {
    if stats.files_skipped > 0 {
        formatter.warning(&format!(
            "Warning: {} file(s) skipped as unreadable",
            stats.files_skipped
        ));
    }

    formatter.info(&format!(
        "Merged {} file(s) in {:.2}s: {} blocks, {} page break(s), {}",
        stats.files_merged,
        stats.merge_time.as_secs_f64(),
        stats.total_blocks,
        stats.page_breaks,
        stats.format_input_size()
    ));

    formatter.detail("Files repaired", &stats.files_recovered.to_string());
    formatter.detail("Parts copied", &stats.parts_copied.to_string());
    formatter.detail("Styles added", &stats.styles_added.to_string());
    formatter.detail("Bookmarks renamed", &stats.bookmarks_renamed.to_string());
    formatter.detail(
        "Note/comment references dropped",
        &stats.dropped_references.to_string(),
    );
    if stats.unresolved_references > 0 {
        formatter.detail(
            "Unresolved references",
            &stats.unresolved_references.to_string(),
        );
    }
    if stats.images_extracted > 0 {
        formatter.detail("Images extracted", &stats.images_extracted.to_string());
    }
}

/// Display which converters were found.
pub fn display_availability(formatter: &OutputFormatter, availability: &ConverterAvailability) {
    let describe = |found: &Option<std::path::PathBuf>| match found {
        Some(path) => path.display().to_string(),
        None => "not found".to_string(),
    };
    formatter.detail("Office engine", &describe(&availability.office));
    formatter.detail("HTML renderer", &describe(&availability.renderer));

    match availability.planned_route() {
        Some(route) => formatter.debug(&format!("PDF will be produced by the {route}")),
        None => formatter
            .warning("No PDF converter found; only the combined document will be written"),
    }
}

/// Display how the PDF was produced, or why it was not.
///
/// A fallback to the secondary route is a warning; failure of both routes
/// is an error.
pub fn display_conversion_outcome(formatter: &OutputFormatter, outcome: &ConversionOutcome) {
    for attempt in outcome.failures() {
        let message = format!("{} failed: {}", attempt.route, attempt.reason);
        if outcome.is_success() {
            formatter.warning(&message);
        } else {
            formatter.error(&message);
        }
    }

    match outcome {
        ConversionOutcome::Success {
            path,
            route,
            size,
            page_count,
            ..
        } => {
            let pages = page_count
                .map(|n| format!(", {n} page(s)"))
                .unwrap_or_default();
            formatter.success(&format!(
                "Wrote {} via {route} ({}{pages})",
                path.display(),
                format_file_size(*size)
            ));
        }
        ConversionOutcome::Failed { .. } => {
            formatter.error("No PDF produced: both conversion routes failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{ConversionAttempt, ConversionRoute};
    use std::path::PathBuf;

    #[test]
    fn test_create_formatter() {
        let formatter = create_formatter(&Config::default());
        assert!(formatter.should_print());

        let quiet = Config {
            quiet: true,
            ..Default::default()
        };
        assert!(create_formatter(&quiet).is_quiet());
    }

    #[test]
    fn test_display_summaries() {
        let formatter = OutputFormatter::verbose();
        display_merge_statistics(
            &formatter,
            &MergeStatistics {
                files_merged: 2,
                files_skipped: 1,
                ..Default::default()
            },
        );
        display_availability(
            &formatter,
            &ConverterAvailability {
                office: None,
                renderer: Some(PathBuf::from("/usr/bin/wkhtmltopdf")),
            },
        );
        display_conversion_outcome(
            &formatter,
            &ConversionOutcome::Success {
                path: PathBuf::from("Merged_Doc.pdf"),
                route: ConversionRoute::HtmlRenderer,
                size: 2048,
                page_count: Some(3),
                fallbacks: vec![ConversionAttempt {
                    route: ConversionRoute::OfficeEngine,
                    reason: "soffice is not installed".to_string(),
                }],
            },
        );
        display_conversion_outcome(&formatter, &ConversionOutcome::Failed { attempts: vec![] });
    }
}
