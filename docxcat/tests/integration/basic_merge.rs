//! Integration tests for merging a directory of documents.

use docxcat::discovery::discover_inputs;
use docxcat::merge::merge_docx;
use docxcat::output::OutputFormatter;
use docxcat::pipeline::{self, RunStatus};
use serial_test::serial;

use crate::common::{Workspace, block_texts, docx_with_paragraphs};

#[tokio::test]
#[serial]
async fn test_merge_three_documents_in_name_order() {
    let ws = Workspace::new();
    // Written out of order on purpose.
    ws.add("c.docx", &docx_with_paragraphs(&["gamma"]));
    ws.add("a.docx", &docx_with_paragraphs(&["alpha 1", "alpha 2"]));
    ws.add("b.docx", &docx_with_paragraphs(&["beta"]));
    let config = ws.config();

    let report = pipeline::run(&config, &OutputFormatter::quiet())
        .await
        .unwrap();

    assert_eq!(report.merged.len(), 3);
    assert!(report.skipped.is_empty());
    assert_eq!(
        block_texts(&config.output),
        vec!["alpha 1", "alpha 2", "<page>", "beta", "<page>", "gamma"]
    );
    let stats = report.statistics.unwrap();
    assert_eq!(stats.page_breaks, 2);
    assert_eq!(stats.total_blocks, 4);
}

#[tokio::test]
#[serial]
async fn test_lock_and_hidden_files_are_ignored() {
    let ws = Workspace::new();
    ws.add("report.docx", &docx_with_paragraphs(&["report"]));
    ws.add("~$report.docx", b"lock");
    ws.add(".hidden.docx", b"hidden");
    ws.add("notes.txt", b"not a document");
    ws.add("UPPER.DOCX", &docx_with_paragraphs(&["upper"]));

    let inputs = discover_inputs(&ws.input_dir(), "docx").unwrap();
    let names: Vec<String> = inputs.iter().map(|i| i.file_name()).collect();
    assert_eq!(names, vec!["UPPER.DOCX", "report.docx"]);

    let report = pipeline::run(&ws.config(), &OutputFormatter::quiet())
        .await
        .unwrap();
    assert!(report.skipped.is_empty());
    assert_eq!(block_texts(&ws.config().output), vec!["upper", "<page>", "report"]);
}

#[tokio::test]
#[serial]
async fn test_corrupt_input_is_skipped() {
    let ws = Workspace::new();
    ws.add("a.docx", &docx_with_paragraphs(&["alpha"]));
    ws.add("b.docx", b"PK not really a zip");
    ws.add("c.docx", &docx_with_paragraphs(&["gamma"]));
    let config = ws.config();

    let report = pipeline::run(&config, &OutputFormatter::quiet())
        .await
        .unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].path.ends_with("b.docx"));
    assert_eq!(block_texts(&config.output), vec!["alpha", "<page>", "gamma"]);
}

#[tokio::test]
#[serial]
async fn test_existing_output_is_overwritten() {
    let ws = Workspace::new();
    ws.add("a.docx", &docx_with_paragraphs(&["fresh"]));
    let config = ws.config();
    std::fs::write(&config.output, b"stale").unwrap();
    std::fs::write(&config.pdf_output, b"stale pdf").unwrap();

    let report = pipeline::run(&config, &OutputFormatter::quiet())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::RenderingFailed);
    assert_eq!(block_texts(&config.output), vec!["fresh"]);
    // A failed rendering never leaves the previous PDF behind.
    assert!(!config.pdf_output.exists());
}

#[tokio::test]
async fn test_merge_convenience_function() {
    let ws = Workspace::new();
    ws.add("1.docx", &docx_with_paragraphs(&["one"]));
    ws.add("2.docx", &docx_with_paragraphs(&["two"]));
    let inputs = discover_inputs(&ws.input_dir(), "docx").unwrap();

    let (document, stats) = merge_docx(&inputs, &ws.config()).await.unwrap();
    assert_eq!(stats.files_merged, 2);
    assert_eq!(document.page_breaks(), 1);
}
