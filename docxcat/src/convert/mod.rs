//! Rendering the combined document to PDF.
//!
//! Conversion is a small state machine with two routes:
//!
//! ```text
//! NotStarted -> TryPrimary -> Success
//!                   |
//!                   v
//!              TrySecondary -> Success
//!                   |
//!                   v
//!                 Failed
//! ```
//!
//! The primary route hands the document to the office engine. The secondary
//! route converts it to HTML in-process and prints that with an HTML
//! renderer. Each route gets exactly one attempt; a route only succeeds if
//! its tool exits cleanly within its time limit and leaves a non-empty PDF.
//!
//! A failed conversion is not an error of the run: the outcome is reported
//! through [`ConversionOutcome`] and the combined document stays in place.

pub mod html;
pub mod office;
pub mod process;
pub mod renderer;

pub use html::{HtmlConverter, HtmlDocument};
pub use office::OfficeEngine;
pub use process::ToolError;
pub use renderer::HtmlRenderer;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::ConverterSettings;
use crate::error::DocxCatError;

/// One of the two ways to produce a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConversionRoute {
    /// Direct conversion by the office engine.
    OfficeEngine,
    /// Built-in HTML conversion, printed by the HTML renderer.
    HtmlRenderer,
}

impl fmt::Display for ConversionRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OfficeEngine => f.write_str("office engine"),
            Self::HtmlRenderer => f.write_str("HTML renderer"),
        }
    }
}

/// Position in the conversion state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    /// Nothing attempted yet.
    NotStarted,
    /// Running the office engine.
    TryPrimary,
    /// Running the HTML route.
    TrySecondary,
    /// A PDF was produced.
    Success,
    /// Both routes failed.
    Failed,
}

impl ConversionState {
    /// Whether the machine has stopped.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Route tried in this state, if any.
    pub fn route(self) -> Option<ConversionRoute> {
        match self {
            Self::TryPrimary => Some(ConversionRoute::OfficeEngine),
            Self::TrySecondary => Some(ConversionRoute::HtmlRenderer),
            _ => None,
        }
    }

    /// State that follows this one, given whether its attempt succeeded.
    pub fn next(self, succeeded: bool) -> Self {
        match (self, succeeded) {
            (Self::NotStarted, _) => Self::TryPrimary,
            (Self::TryPrimary | Self::TrySecondary, true) => Self::Success,
            (Self::TryPrimary, false) => Self::TrySecondary,
            (Self::TrySecondary, false) => Self::Failed,
            (terminal, _) => terminal,
        }
    }
}

/// A route that did not produce a PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionAttempt {
    /// Route that was tried.
    pub route: ConversionRoute,
    /// Why it failed.
    pub reason: String,
}

/// Result of rendering the combined document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ConversionOutcome {
    /// A PDF was produced.
    #[serde(rename_all = "camelCase")]
    Success {
        /// Where the PDF was written.
        path: PathBuf,
        /// Route that produced it.
        route: ConversionRoute,
        /// PDF size in bytes.
        size: u64,
        /// Page count, when the PDF could be parsed.
        page_count: Option<usize>,
        /// Routes that failed before this one.
        fallbacks: Vec<ConversionAttempt>,
    },
    /// No route produced a PDF.
    Failed {
        /// Every failed attempt, in order.
        attempts: Vec<ConversionAttempt>,
    },
}

impl ConversionOutcome {
    /// Whether a PDF was produced.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Route that produced the PDF.
    pub fn route(&self) -> Option<ConversionRoute> {
        match self {
            Self::Success { route, .. } => Some(*route),
            Self::Failed { .. } => None,
        }
    }

    /// Failed attempts, whether or not a later route succeeded.
    pub fn failures(&self) -> &[ConversionAttempt] {
        match self {
            Self::Success { fallbacks, .. } => fallbacks,
            Self::Failed { attempts } => attempts,
        }
    }
}

/// Failure of a single route.
#[derive(Debug, thiserror::Error)]
enum RouteError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("HTML conversion failed: {0}")]
    Markup(#[from] DocxCatError),

    #[error("cannot prepare HTML file: {0}")]
    Scratch(#[from] std::io::Error),
}

/// Which converters can be found on this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverterAvailability {
    /// Resolved office engine binary.
    pub office: Option<PathBuf>,
    /// Resolved HTML renderer binary.
    pub renderer: Option<PathBuf>,
}

impl ConverterAvailability {
    /// Route expected to be taken first.
    pub fn planned_route(&self) -> Option<ConversionRoute> {
        if self.office.is_some() {
            Some(ConversionRoute::OfficeEngine)
        } else if self.renderer.is_some() {
            Some(ConversionRoute::HtmlRenderer)
        } else {
            None
        }
    }
}

/// Look up the configured converters.
pub fn detect(settings: &ConverterSettings) -> ConverterAvailability {
    ConverterAvailability {
        office: process::resolve_tool(&settings.office_bin),
        renderer: process::resolve_tool(&settings.renderer_bin),
    }
}

/// Drives the conversion state machine.
#[derive(Debug, Clone)]
pub struct PdfConverter {
    office: OfficeEngine,
    renderer: HtmlRenderer,
    html: HtmlConverter,
}

impl PdfConverter {
    /// Create a converter from the configured tools and time limits.
    pub fn new(settings: &ConverterSettings) -> Self {
        Self {
            office: OfficeEngine::new(&settings.office_bin, settings.primary_timeout),
            renderer: HtmlRenderer::new(&settings.renderer_bin, settings.secondary_timeout),
            html: HtmlConverter::new(),
        }
    }

    /// Render `docx` to `pdf`.
    ///
    /// Any PDF already at `pdf` is removed first, so a failed conversion
    /// never leaves an outdated rendering behind.
    pub async fn convert(&self, docx: &Path, pdf: &Path) -> ConversionOutcome {
        if let Err(err) = remove_stale(pdf).await {
            log::warn!("cannot remove previous PDF {}: {err}", pdf.display());
        }

        let mut state = ConversionState::NotStarted.next(true);
        let mut attempts = Vec::new();
        let mut produced = None;

        while !state.is_terminal() {
            let Some(route) = state.route() else {
                break;
            };
            log::debug!("conversion state {state:?}");

            let result = match route {
                ConversionRoute::OfficeEngine => self
                    .office
                    .convert_to_pdf(docx, pdf)
                    .await
                    .map_err(RouteError::from),
                ConversionRoute::HtmlRenderer => self.via_html(docx, pdf).await,
            };

            match result {
                Ok(size) => produced = Some((route, size)),
                Err(err) => {
                    log::warn!("{route} could not produce a PDF: {err}");
                    if let Err(err) = remove_stale(pdf).await {
                        log::warn!("cannot remove partial PDF {}: {err}", pdf.display());
                    }
                    attempts.push(ConversionAttempt {
                        route,
                        reason: err.to_string(),
                    });
                }
            }
            state = state.next(produced.is_some());
        }

        match produced {
            Some((route, size)) => ConversionOutcome::Success {
                path: pdf.to_path_buf(),
                route,
                size,
                page_count: page_count(pdf).await,
                fallbacks: attempts,
            },
            None => ConversionOutcome::Failed { attempts },
        }
    }

    async fn via_html(&self, docx: &Path, pdf: &Path) -> Result<u64, RouteError> {
        let document = self.html.convert_file(docx)?;
        log::debug!(
            "HTML conversion: {} paragraphs, {} tables, {} images",
            document.paragraphs,
            document.tables,
            document.images
        );

        let scratch = tempfile::tempdir()?;
        let stem = docx
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let html_path = scratch.path().join(format!("{stem}.html"));
        document.write_to(&html_path).await?;

        Ok(self.renderer.render(&html_path, pdf).await?)
    }
}

async fn remove_stale(pdf: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(pdf).await {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// Number of pages of a PDF, if it parses.
pub async fn page_count(pdf: &Path) -> Option<usize> {
    let bytes = tokio::fs::read(pdf).await.ok()?;
    match lopdf::Document::load_mem(&bytes) {
        Ok(doc) => Some(doc.get_pages().len()),
        Err(err) => {
            log::debug!("cannot count pages of {}: {err}", pdf.display());
            None
        }
    }
}
