//! docxcat - Merge Word documents and render the result to PDF.
//!
//! Runs once and exits with a status that tells scripts what happened:
//! 0 merged and rendered, 1 nothing to merge or invalid arguments,
//! 2 missing input directory, 3 unreadable document, 5 combined document
//! not written, 6 merge failure, 7 merged but no PDF produced.

mod cli;

use clap::Parser;
use std::process;

use crate::cli::Cli;
use docxcat::error::DocxCatError;
use docxcat::output::OutputFormatter;
use docxcat::pipeline::{self, RunReport};

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    // Everything runs sequentially on one thread.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: cannot start runtime: {err}");
            process::exit(1);
        }
    };

    let code = match runtime.block_on(run(&cli)) {
        Ok(report) => {
            if cli.json {
                print_json(&report);
            }
            report.exit_code()
        }
        Err(err) => {
            eprintln!("Error: {err}");
            err.exit_code()
        }
    };
    process::exit(code);
}

/// Main application logic.
async fn run(cli: &Cli) -> Result<RunReport, DocxCatError> {
    let config = cli.to_config()?;

    let mut formatter = OutputFormatter::from_config(&config);
    if cli.json {
        formatter = formatter.with_stderr();
    }

    if formatter.is_verbose() {
        formatter.section(&format!("{} v{}", docxcat::NAME, docxcat::VERSION));
    }

    pipeline::run(&config, &formatter).await
}

fn print_json(report: &RunReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{json}"),
        Err(err) => log::error!("cannot serialize run report: {err}"),
    }
}
