//! Console messages for a merge run.
//!
//! Every message has a [`MessageLevel`]; the formatter's [`Verbosity`]
//! decides which levels reach the terminal.
//!
//! # Examples
//!
//! ```
//! use docxcat::output::formatter::OutputFormatter;
//!
//! let formatter = OutputFormatter::new(false, false);
//! formatter.info("Merging documents...");
//! formatter.success("Combined document written");
//! formatter.warning("b.docx skipped");
//! ```

use crate::config::Config;
use std::io::{self, IsTerminal, Write};

const RESET: &str = "\x1b[0m";

/// Kind of console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    /// Progress and plain information.
    Info,
    /// A finished step.
    Success,
    /// Something was skipped or degraded.
    Warning,
    /// The run cannot continue.
    Error,
    /// Extra detail for `--verbose`.
    Debug,
}

impl MessageLevel {
    /// Symbol and ANSI color for this level.
    fn decoration(self) -> (&'static str, &'static str) {
        match self {
            MessageLevel::Info => ("", ""),
            MessageLevel::Success => ("✓ ", "\x1b[32m"),
            MessageLevel::Warning => ("⚠ ", "\x1b[33m"),
            MessageLevel::Error => ("✗ ", "\x1b[31m"),
            MessageLevel::Debug => ("→ ", "\x1b[36m"),
        }
    }
}

/// How much the formatter prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Warnings and errors only.
    Quiet,
    /// Everything except debug detail.
    Normal,
    /// Everything.
    Verbose,
}

impl Verbosity {
    fn shows(self, level: MessageLevel) -> bool {
        match level {
            MessageLevel::Warning | MessageLevel::Error => true,
            MessageLevel::Info | MessageLevel::Success => self >= Verbosity::Normal,
            MessageLevel::Debug => self == Verbosity::Verbose,
        }
    }
}

/// Writes leveled messages to stdout, or to stderr when stdout carries the
/// JSON report.
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    verbosity: Verbosity,
    colored: bool,
    to_stderr: bool,
}

fn color_supported(terminal: bool) -> bool {
    terminal && std::env::var_os("TERM").is_some_and(|term| term != "dumb")
}

impl OutputFormatter {
    /// Create a formatter; `quiet` wins over `verbose`.
    pub fn new(quiet: bool, verbose: bool) -> Self {
        let verbosity = match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        };
        Self {
            verbosity,
            colored: color_supported(io::stdout().is_terminal()),
            to_stderr: false,
        }
    }

    /// Formatter for a run. A dry run always prints its plan.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.quiet && !config.dry_run, config.verbose)
    }

    /// Warnings and errors only.
    pub fn quiet() -> Self {
        Self::new(true, false)
    }

    /// Everything, debug detail included.
    pub fn verbose() -> Self {
        Self::new(false, true)
    }

    /// Send every message to stderr.
    pub fn with_stderr(mut self) -> Self {
        self.to_stderr = true;
        self.colored = color_supported(io::stderr().is_terminal());
        self
    }

    /// Current verbosity.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Print a plain message.
    pub fn info(&self, message: &str) {
        self.emit(MessageLevel::Info, message);
    }

    /// Print a finished step.
    pub fn success(&self, message: &str) {
        self.emit(MessageLevel::Success, message);
    }

    /// Print a warning, even in quiet mode.
    pub fn warning(&self, message: &str) {
        self.emit(MessageLevel::Warning, message);
    }

    /// Print an error, even in quiet mode.
    pub fn error(&self, message: &str) {
        self.emit(MessageLevel::Error, message);
    }

    /// Print verbose-only detail.
    pub fn debug(&self, message: &str) {
        self.emit(MessageLevel::Debug, message);
    }

    /// Print a blank line and a heading.
    pub fn section(&self, title: &str) {
        if self.should_print() {
            self.write_line(&format!("\n{title}"));
        }
    }

    /// Print `label: value`, verbose only.
    pub fn detail(&self, label: &str, value: &str) {
        if self.is_verbose() {
            self.write_line(&format!("  {label}: {value}"));
        }
    }

    /// Print a step counter, e.g. `[2/5] b.docx`.
    pub fn progress(&self, current: usize, total: usize, message: &str) {
        if self.should_print() {
            self.write_line(&format!("  [{current}/{total}] {message}"));
        }
    }

    /// Print a numbered entry; `index` is 1-based.
    pub fn list_item(&self, index: usize, message: &str) {
        if self.should_print() {
            self.write_line(&format!("  {index}. {message}"));
        }
    }

    /// Whether informational messages are shown.
    pub fn should_print(&self) -> bool {
        self.verbosity.shows(MessageLevel::Info)
    }

    /// Whether debug detail is shown.
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Whether only warnings and errors are shown.
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    fn emit(&self, level: MessageLevel, message: &str) {
        if !self.verbosity.shows(level) {
            return;
        }
        let (symbol, color) = level.decoration();
        if self.colored && !color.is_empty() {
            self.write_line(&format!("{color}{symbol}{message}{RESET}"));
        } else {
            self.write_line(&format!("{symbol}{message}"));
        }
    }

    fn write_line(&self, line: &str) {
        // Write errors (a closed pipe) are ignored.
        let _ = if self.to_stderr {
            writeln!(io::stderr().lock(), "{line}")
        } else {
            writeln!(io::stdout().lock(), "{line}")
        };
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new(false, false)
    }
}
