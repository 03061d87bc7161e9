//! Integration tests for dry-run mode.

use docxcat::config::Config;
use docxcat::convert::ConversionRoute;
use docxcat::output::OutputFormatter;
use docxcat::pipeline::{self, RunStatus};
use serial_test::serial;

use crate::common::{Workspace, docx_with_paragraphs};

#[tokio::test]
#[serial]
async fn test_dry_run_lists_inputs_without_writing() {
    let ws = Workspace::new();
    ws.add("b.docx", &docx_with_paragraphs(&["b"]));
    ws.add("a.docx", &docx_with_paragraphs(&["a"]));
    let images = ws.dir.path().join("images");
    let config = Config {
        dry_run: true,
        extract_images: Some(images.clone()),
        ..ws.config()
    };

    let report = pipeline::run(&config, &OutputFormatter::quiet())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::DryRun);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        report.inputs,
        vec![ws.input_dir().join("a.docx"), ws.input_dir().join("b.docx")]
    );
    assert!(report.conversion.is_none());
    assert!(!config.output.exists());
    assert!(!config.pdf_output.exists());
    assert!(!images.exists());
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn test_dry_run_reports_planned_route() {
    let ws = Workspace::new();
    ws.add("a.docx", &docx_with_paragraphs(&["a"]));
    let renderer = ws.tool("wkhtmltopdf", "exit 0");
    let mut config = Config {
        dry_run: true,
        ..ws.config()
    };
    config.converters.renderer_bin = renderer;

    let report = pipeline::run(&config, &OutputFormatter::quiet())
        .await
        .unwrap();

    assert_eq!(report.converters.office, None);
    assert!(report.converters.renderer.is_some());
    assert_eq!(
        report.converters.planned_route(),
        Some(ConversionRoute::HtmlRenderer)
    );
}
