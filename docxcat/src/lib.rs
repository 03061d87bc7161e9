//! docxcat - Concatenate Word documents and render the result to PDF.
//!
//! This library merges a directory of `.docx` files into one combined
//! document and converts it to PDF through external tools. It supports:
//!
//! - Ordered concatenation with page breaks between documents
//! - Images, embedded objects, hyperlinks and bookmarks carried over
//! - Style sheet and metadata merging
//! - Repair of unreadable inputs through the office engine
//! - PDF conversion with a fallback route through HTML
//! - Comprehensive error handling
//!
//! # Examples
//!
//! ## Complete Run
//!
//! ```no_run
//! use docxcat::config::Config;
//! use docxcat::output::OutputFormatter;
//! use docxcat::pipeline;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let report = pipeline::run(&config, &OutputFormatter::from_config(&config)).await?;
//! println!("Finished with status {:?}", report.status);
//! # Ok(())
//! # }
//! ```
//!
//! ## Using Individual Components
//!
//! ```no_run
//! use docxcat::config::{Config, ConverterSettings};
//! use docxcat::convert::PdfConverter;
//! use docxcat::discovery::discover_inputs;
//! use docxcat::io::DocxWriter;
//! use docxcat::merge::Merger;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let inputs = discover_inputs(Path::new("to_merge"), "docx")?;
//!
//! let result = Merger::new().merge(&inputs, &config).await?;
//! let written = DocxWriter::new()
//!     .save(&result.document.into_package(), Path::new("Merged_Doc.docx"))
//!     .await?;
//!
//! let outcome = PdfConverter::new(&ConverterSettings::default())
//!     .convert(&written.output_path, Path::new("Merged_Doc.pdf"))
//!     .await;
//! println!("PDF produced: {}", outcome.is_success());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod convert;
pub mod discovery;
pub mod error;
pub mod io;
pub mod merge;
pub mod output;
pub mod package;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::Config;
pub use error::{DocxCatError, Result};
pub use pipeline::{RunReport, RunStatus};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
