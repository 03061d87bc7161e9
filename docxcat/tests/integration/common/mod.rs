//! Shared helpers for the integration tests.
//!
//! Documents are generated on the fly; external tools are stood in for by
//! small shell scripts.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use docxcat::config::{Config, ConverterSettings};
use docxcat::merge::body::{DocumentBody, fragment_text};
use docxcat::package::DocxPackage;
use tempfile::TempDir;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Bytes of a `.docx` whose body holds one paragraph per entry of `texts`.
pub fn docx_with_paragraphs(texts: &[&str]) -> Vec<u8> {
    let body: String = texts
        .iter()
        .map(|text| format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>"))
        .collect();

    let parts = vec![
        (
            "[Content_Types].xml",
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
                r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
                r#"<Default Extension="xml" ContentType="application/xml"/>"#,
                r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
                "</Types>"
            )
            .as_bytes()
            .to_vec(),
        ),
        (
            "_rels/.rels",
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
                r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
                "</Relationships>"
            )
            .as_bytes()
            .to_vec(),
        ),
        (
            "word/document.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>{body}<w:sectPr/></w:body></w:document>"#
            )
            .into_bytes(),
        ),
    ];

    DocxPackage::from_parts(parts)
        .and_then(|package| package.to_bytes())
        .unwrap()
}

/// A scratch directory laid out like a docxcat working directory.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    /// Create a workspace with an empty `to_merge/` directory.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("to_merge")).unwrap();
        Self { dir }
    }

    pub fn input_dir(&self) -> PathBuf {
        self.dir.path().join("to_merge")
    }

    /// Put a file into the input directory.
    pub fn add(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.input_dir().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    /// Configuration writing into the workspace, with converters that do
    /// not exist unless replaced.
    pub fn config(&self) -> Config {
        Config {
            input_dir: self.input_dir(),
            output: self.dir.path().join("Merged_Doc.docx"),
            pdf_output: self.dir.path().join("Merged_Doc.pdf"),
            converters: ConverterSettings {
                office_bin: "docxcat-test-missing-office".into(),
                renderer_bin: "docxcat-test-missing-renderer".into(),
                ..Default::default()
            },
            quiet: true,
            ..Default::default()
        }
    }

    /// Write an executable shell script into the workspace.
    pub fn tool(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }
}

/// Texts of the body-level blocks of a written document, page breaks
/// rendered as `"<page>"`.
pub fn block_texts(docx: &Path) -> Vec<String> {
    let package = DocxPackage::from_bytes(&std::fs::read(docx).unwrap()).unwrap();
    let part = package.main_document_part().unwrap();
    let body = DocumentBody::parse(&part, package.part_text(&part).unwrap()).unwrap();

    body.blocks
        .iter()
        .map(|(_, xml)| {
            if xml.contains(r#"w:type="page""#) {
                "<page>".to_string()
            } else {
                fragment_text(xml).unwrap()
            }
        })
        .collect()
}
