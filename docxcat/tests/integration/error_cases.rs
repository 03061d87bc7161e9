//! Integration tests for error handling and edge cases.

use docxcat::config::Config;
use docxcat::error::DocxCatError;
use docxcat::output::OutputFormatter;
use docxcat::pipeline;
use serial_test::serial;

use crate::common::Workspace;

#[tokio::test]
#[serial]
async fn test_error_missing_input_dir() {
    let ws = Workspace::new();
    let config = Config {
        input_dir: ws.dir.path().join("nowhere"),
        ..ws.config()
    };

    let err = pipeline::run(&config, &OutputFormatter::quiet())
        .await
        .unwrap_err();
    assert!(matches!(err, DocxCatError::InputDirNotFound { .. }));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
#[serial]
async fn test_error_empty_input_dir() {
    let ws = Workspace::new();
    let config = ws.config();

    let err = pipeline::run(&config, &OutputFormatter::quiet())
        .await
        .unwrap_err();
    assert!(matches!(err, DocxCatError::NoInputFiles { .. }));
    assert!(err.is_empty_input());
    assert_eq!(err.exit_code(), 1);
    assert!(!config.output.exists());
}

#[tokio::test]
#[serial]
async fn test_error_only_zero_byte_document() {
    let ws = Workspace::new();
    ws.add("empty.docx", b"");
    let config = ws.config();

    let err = pipeline::run(&config, &OutputFormatter::quiet())
        .await
        .unwrap_err();
    assert!(matches!(&err, DocxCatError::NoReadableInputs { skipped } if skipped.len() == 1));
    let msg = err.to_string();
    assert!(msg.contains("empty.docx"), "{msg}");
    assert!(msg.contains("0 bytes"), "{msg}");
    assert!(err.is_empty_input());
    assert!(!config.output.exists());
    assert!(!config.pdf_output.exists());
}

#[tokio::test]
#[serial]
async fn test_error_output_not_writable() {
    let ws = Workspace::new();
    ws.add("a.docx", &crate::common::docx_with_paragraphs(&["a"]));
    let config = Config {
        output: ws.dir.path().join("missing-dir").join("out.docx"),
        ..ws.config()
    };

    let err = pipeline::run(&config, &OutputFormatter::quiet())
        .await
        .unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.exit_code(), 5);
}

#[test]
fn test_error_invalid_configuration() {
    let ws = Workspace::new();

    let same_paths = Config {
        pdf_output: ws.dir.path().join("Merged_Doc.docx"),
        ..ws.config()
    };
    assert!(same_paths.validate().is_err());

    let inside_inputs = Config {
        output: ws.input_dir().join("Merged_Doc.docx"),
        ..ws.config()
    };
    assert!(inside_inputs.validate().is_err());
}
