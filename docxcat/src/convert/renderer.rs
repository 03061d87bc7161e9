//! The HTML to PDF renderer (`wkhtmltopdf`).

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::convert::process::{ToolError, expect_output, run_tool};

/// HTML renderer invocation.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    bin: PathBuf,
    timeout: Duration,
}

impl HtmlRenderer {
    /// Create a renderer wrapper.
    pub fn new(bin: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    /// Binary as configured.
    pub fn bin(&self) -> &Path {
        &self.bin
    }

    /// Render `html` into `pdf`, returning the PDF size in bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the renderer fails, times out, or writes
    /// an empty file.
    pub async fn render(&self, html: &Path, pdf: &Path) -> Result<u64, ToolError> {
        run_tool(
            &self.bin,
            [
                OsStr::new("--quiet"),
                html.as_os_str(),
                pdf.as_os_str(),
            ],
            self.timeout,
        )
        .await?;
        expect_output(&self.bin, pdf).await
    }
}
