//! The office engine (LibreOffice `soffice`) in headless mode.
//!
//! Used twice: as the primary DOCX to PDF converter, and to repair
//! documents docxcat cannot read by re-saving them as DOCX.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::convert::process::{ToolError, expect_output, run_tool};

/// Headless office engine invocation.
#[derive(Debug, Clone)]
pub struct OfficeEngine {
    bin: PathBuf,
    timeout: Duration,
}

impl OfficeEngine {
    /// Create an engine wrapper.
    ///
    /// # Arguments
    ///
    /// * `bin` - Binary name or path (`soffice`)
    /// * `timeout` - Time limit for one conversion
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

    /// Convert `input` into `format`, writing into `out_dir`.
    ///
    /// The engine names its output after the input's stem, with the
    /// extension of the target format: `report.docx` converted to `pdf`
    /// lands at `<out_dir>/report.pdf`.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the engine fails, times out, or leaves no
    /// output behind.
    pub async fn convert(
        &self,
        input: &Path,
        format: &str,
        out_dir: &Path,
    ) -> Result<PathBuf, ToolError> {
        let extension = format.split(':').next().unwrap_or(format);
        let stem = input
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| "document".into());
        let mut expected = out_dir.join(stem);
        expected.set_extension(extension);

        run_tool(
            &self.bin,
            [
                OsStr::new("--headless"),
                OsStr::new("--convert-to"),
                OsStr::new(format),
                OsStr::new("--outdir"),
                out_dir.as_os_str(),
                input.as_os_str(),
            ],
            self.timeout,
        )
        .await?;

        expect_output(&self.bin, &expected).await?;
        Ok(expected)
    }

    /// Convert a document to PDF at `pdf_path`.
    ///
    /// The engine cannot be told the output file name, so it writes into a
    /// scratch directory and the result is moved into place.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the conversion fails or the result cannot
    /// be moved.
    pub async fn convert_to_pdf(&self, input: &Path, pdf_path: &Path) -> Result<u64, ToolError> {
        let scratch = tempfile::tempdir().map_err(|source| self.io_error(source))?;
        let produced = self.convert(input, "pdf", scratch.path()).await?;
        move_file(&produced, pdf_path)
            .await
            .map_err(|source| self.io_error(source))?;
        expect_output(&self.bin, pdf_path).await
    }

    /// Re-save a document through the engine into `out_dir`.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the engine cannot open or save the file.
    pub async fn resave_docx(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ToolError> {
        self.convert(input, "docx:MS Word 2007 XML", out_dir).await
    }

    fn io_error(&self, source: std::io::Error) -> ToolError {
        ToolError::Io {
            tool: self.bin.display().to_string(),
            source,
        }
    }
}

/// Move a file, falling back to copy and delete across filesystems.
pub(crate) async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}
