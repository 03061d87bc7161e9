//! Integration tests for PDF conversion and document repair.
//!
//! The office engine and the HTML renderer are shell scripts that follow
//! the real tools' command lines:
//! `soffice --headless --convert-to <fmt> --outdir <dir> <input>` and
//! `wkhtmltopdf --quiet <in.html> <out.pdf>`.

#![cfg(unix)]

use docxcat::config::Config;
use docxcat::convert::{ConversionOutcome, ConversionRoute};
use docxcat::output::OutputFormatter;
use docxcat::pipeline::{self, RunStatus};
use serial_test::serial;

use crate::common::{Workspace, docx_with_paragraphs};

const OFFICE_WRITES_PDF: &str =
    r#"printf '%%PDF-1.4\n%% rendered\n' > "$5/$(basename "$6" .docx).pdf""#;

const RENDERER_NEEDS_BETA: &str = r#"grep -q beta "$2" || exit 4
printf '%%PDF-1.4\n%% from html\n' > "$3""#;

fn with_tools(ws: &Workspace, office: Option<&str>, renderer: Option<&str>) -> Config {
    let mut config = ws.config();
    if let Some(body) = office {
        config.converters.office_bin = ws.tool("soffice", body);
    }
    if let Some(body) = renderer {
        config.converters.renderer_bin = ws.tool("wkhtmltopdf", body);
    }
    config
}

#[tokio::test]
#[serial]
async fn test_primary_route_produces_pdf() {
    let ws = Workspace::new();
    ws.add("a.docx", &docx_with_paragraphs(&["alpha"]));
    ws.add("b.docx", &docx_with_paragraphs(&["beta"]));
    let config = with_tools(&ws, Some(OFFICE_WRITES_PDF), None);

    let report = pipeline::run(&config, &OutputFormatter::quiet())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.exit_code(), 0);
    match report.conversion.unwrap() {
        ConversionOutcome::Success {
            route, fallbacks, size, ..
        } => {
            assert_eq!(route, ConversionRoute::OfficeEngine);
            assert!(fallbacks.is_empty());
            assert!(size > 0);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(config.output.is_file());
    assert!(config.pdf_output.is_file());
}

#[tokio::test]
#[serial]
async fn test_missing_office_engine_falls_back_to_renderer() {
    let ws = Workspace::new();
    ws.add("a.docx", &docx_with_paragraphs(&["alpha"]));
    ws.add("b.docx", &docx_with_paragraphs(&["beta"]));
    let config = with_tools(&ws, None, Some(RENDERER_NEEDS_BETA));

    let report = pipeline::run(&config, &OutputFormatter::quiet())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    let outcome = report.conversion.unwrap();
    assert_eq!(outcome.route(), Some(ConversionRoute::HtmlRenderer));
    assert_eq!(outcome.failures().len(), 1);
    assert_eq!(outcome.failures()[0].route, ConversionRoute::OfficeEngine);
    assert!(std::fs::metadata(&config.pdf_output).unwrap().len() > 0);
}

#[tokio::test]
#[serial]
async fn test_failing_office_engine_falls_back_to_renderer() {
    let ws = Workspace::new();
    ws.add("a.docx", &docx_with_paragraphs(&["beta"]));
    let config = with_tools(
        &ws,
        Some("echo 'cannot open' >&2; exit 81"),
        Some(RENDERER_NEEDS_BETA),
    );

    let report = pipeline::run(&config, &OutputFormatter::quiet())
        .await
        .unwrap();

    let outcome = report.conversion.unwrap();
    assert!(outcome.is_success());
    assert!(outcome.failures()[0].reason.contains("cannot open"));
}

#[tokio::test]
#[serial]
async fn test_both_routes_failing_keeps_combined_document() {
    let ws = Workspace::new();
    ws.add("a.docx", &docx_with_paragraphs(&["alpha"]));
    let config = with_tools(&ws, Some("exit 1"), Some("exit 1"));

    let report = pipeline::run(&config, &OutputFormatter::quiet())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::RenderingFailed);
    assert_eq!(report.exit_code(), 7);
    assert!(std::fs::metadata(&config.output).unwrap().len() > 0);
    assert!(!config.pdf_output.exists());

    let outcome = report.conversion.unwrap();
    assert!(!outcome.is_success());
    let routes: Vec<ConversionRoute> = outcome.failures().iter().map(|a| a.route).collect();
    assert_eq!(
        routes,
        vec![ConversionRoute::OfficeEngine, ConversionRoute::HtmlRenderer]
    );
}

#[tokio::test]
#[serial]
async fn test_unreadable_document_is_repaired() {
    let ws = Workspace::new();
    ws.add("a.docx", &docx_with_paragraphs(&["alpha"]));
    ws.add("b.docx", b"not a zip archive");
    let repaired = ws.dir.path().join("repaired.bin");
    std::fs::write(&repaired, docx_with_paragraphs(&["beta (repaired)"])).unwrap();

    let office = format!(
        r#"case "$3" in
  docx*) cp '{}' "$5/$(basename "$6" .docx).docx" ;;
  *) exit 1 ;;
esac"#,
        repaired.display()
    );
    let config = with_tools(&ws, Some(&office), None);

    let report = pipeline::run(&config, &OutputFormatter::quiet())
        .await
        .unwrap();

    assert!(report.skipped.is_empty());
    assert!(report.merged[1].recovered);
    assert_eq!(report.statistics.as_ref().unwrap().files_recovered, 1);
    assert_eq!(
        crate::common::block_texts(&config.output),
        vec!["alpha", "<page>", "beta (repaired)"]
    );
}

#[tokio::test]
#[serial]
async fn test_no_recover_skips_unreadable_document() {
    let ws = Workspace::new();
    ws.add("a.docx", &docx_with_paragraphs(&["alpha"]));
    ws.add("b.docx", b"not a zip archive");
    let marker = ws.dir.path().join("office-called");
    let office = format!("touch '{}'; exit 1", marker.display());
    let config = Config {
        recover: false,
        ..with_tools(&ws, Some(&office), None)
    };

    let report = pipeline::run(&config, &OutputFormatter::quiet())
        .await
        .unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.merged.len(), 1);
    // Only the PDF conversion ran the engine.
    assert!(marker.exists());
    assert_eq!(report.status, RunStatus::RenderingFailed);
}
