//! Programmatic `.docx` fixtures for unit tests.

use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::merge::metadata::CORE_PROPERTIES_CONTENT_TYPE;
use crate::package::relationships::{
    REL_CORE_PROPERTIES, REL_HYPERLINK, REL_IMAGE, REL_OFFICE_DOCUMENT, REL_STYLES,
};
use crate::package::xml::{MC_NS, W_NS, escape};

/// A 1x1 transparent PNG.
pub(crate) const PNG_PIXEL: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

const BASE_NAMESPACES: &[(&str, &str)] = &[
    ("w", W_NS),
    (
        "r",
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
    ),
    (
        "wp",
        "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing",
    ),
    ("a", "http://schemas.openxmlformats.org/drawingml/2006/main"),
    (
        "pic",
        "http://schemas.openxmlformats.org/drawingml/2006/picture",
    ),
];

/// Builder for a minimal but valid Word package.
#[derive(Debug, Clone)]
pub(crate) struct DocxFixture {
    blocks: Vec<String>,
    rels: Vec<(String, &'static str, String, bool)>,
    media: Vec<(String, Vec<u8>)>,
    namespaces: Vec<(String, String)>,
    styles: Vec<String>,
    title: Option<String>,
    core_properties: bool,
    next_bookmark: u32,
}

impl DocxFixture {
    pub(crate) fn new() -> Self {
        Self {
            blocks: Vec::new(),
            rels: vec![(
                "rId1".to_string(),
                REL_STYLES,
                "styles.xml".to_string(),
                false,
            )],
            media: Vec::new(),
            namespaces: Vec::new(),
            styles: Vec::new(),
            title: None,
            core_properties: true,
            next_bookmark: 0,
        }
    }

    fn add_rel(&mut self, rel_type: &'static str, target: String, external: bool) -> String {
        let id = format!("rId{}", self.rels.len() + 1);
        self.rels.push((id.clone(), rel_type, target, external));
        id
    }

    /// Raw body-level XML.
    pub(crate) fn block(mut self, xml: impl Into<String>) -> Self {
        self.blocks.push(xml.into());
        self
    }

    pub(crate) fn paragraph(self, text: &str) -> Self {
        let xml = format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", escape(text));
        self.block(xml)
    }

    pub(crate) fn bold(self, text: &str) -> Self {
        let xml = format!(
            "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>{}</w:t></w:r></w:p>",
            escape(text)
        );
        self.block(xml)
    }

    /// Paragraph using `style_id`, defined in the style sheet.
    pub(crate) fn styled_paragraph(mut self, style_id: &str, text: &str) -> Self {
        if !self.styles.iter().any(|s| s.contains(&format!("\"{style_id}\""))) {
            self.styles.push(format!(
                r#"<w:style w:type="paragraph" w:styleId="{style_id}"><w:name w:val="{style_id}"/><w:basedOn w:val="Normal"/></w:style>"#
            ));
        }
        let xml = format!(
            r#"<w:p><w:pPr><w:pStyle w:val="{style_id}"/></w:pPr><w:r><w:t>{}</w:t></w:r></w:p>"#,
            escape(text)
        );
        self.block(xml)
    }

    pub(crate) fn heading(self, level: u8, text: &str) -> Self {
        self.styled_paragraph(&format!("Heading{level}"), text)
    }

    /// Bulleted list item.
    pub(crate) fn list_item(self, text: &str) -> Self {
        let xml = format!(
            r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr></w:pPr><w:r><w:t>{}</w:t></w:r></w:p>"#,
            escape(text)
        );
        self.block(xml)
    }

    pub(crate) fn table(self, rows: &[&[&str]]) -> Self {
        let mut xml = String::from("<w:tbl><w:tblPr/>");
        for row in rows {
            xml.push_str("<w:tr>");
            for cell in *row {
                xml.push_str(&format!(
                    "<w:tc><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:tc>",
                    escape(cell)
                ));
            }
            xml.push_str("</w:tr>");
        }
        xml.push_str("</w:tbl>");
        self.block(xml)
    }

    /// Inline 100x50 pixel picture stored as `word/media/<name>`.
    pub(crate) fn image(mut self, name: &str) -> Self {
        let id = self.add_rel(REL_IMAGE, format!("media/{name}"), false);
        self.media.push((format!("word/media/{name}"), PNG_PIXEL.to_vec()));
        let xml = format!(
            concat!(
                "<w:p><w:r><w:drawing><wp:inline>",
                r#"<wp:extent cx="952500" cy="476250"/><wp:docPr id="1" name="{name}"/>"#,
                "<a:graphic><a:graphicData><pic:pic><pic:blipFill>",
                r#"<a:blip r:embed="{id}"/>"#,
                "</pic:blipFill></pic:pic></a:graphicData></a:graphic>",
                "</wp:inline></w:drawing></w:r></w:p>"
            ),
            name = escape(name),
            id = id
        );
        self.block(xml)
    }

    pub(crate) fn hyperlink(mut self, text: &str, url: &str) -> Self {
        let id = self.add_rel(REL_HYPERLINK, url.to_string(), true);
        let xml = format!(
            r#"<w:p><w:hyperlink r:id="{id}"><w:r><w:t>{}</w:t></w:r></w:hyperlink></w:p>"#,
            escape(text)
        );
        self.block(xml)
    }

    pub(crate) fn bookmark(mut self, name: &str, text: &str) -> Self {
        let id = self.next_bookmark;
        self.next_bookmark += 1;
        let xml = format!(
            r#"<w:p><w:bookmarkStart w:id="{id}" w:name="{}"/><w:r><w:t>{}</w:t></w:r><w:bookmarkEnd w:id="{id}"/></w:p>"#,
            escape(name),
            escape(text)
        );
        self.block(xml)
    }

    pub(crate) fn internal_link(self, anchor: &str, text: &str) -> Self {
        let xml = format!(
            r#"<w:p><w:hyperlink w:anchor="{}"><w:r><w:t>{}</w:t></w:r></w:hyperlink></w:p>"#,
            escape(anchor),
            escape(text)
        );
        self.block(xml)
    }

    pub(crate) fn footnote_reference(self, text: &str) -> Self {
        let xml = format!(
            r#"<w:p><w:r><w:t>{}</w:t></w:r><w:r><w:footnoteReference w:id="1"/></w:r></w:p>"#,
            escape(text)
        );
        self.block(xml)
    }

    /// Declare an extra namespace on the root, marked ignorable.
    pub(crate) fn namespace(mut self, prefix: &str, uri: &str) -> Self {
        self.namespaces.push((prefix.to_string(), uri.to_string()));
        self
    }

    pub(crate) fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub(crate) fn without_core_properties(mut self) -> Self {
        self.core_properties = false;
        self
    }

    fn document_xml(&self) -> String {
        let mut root = String::from("<w:document");
        for (prefix, uri) in BASE_NAMESPACES {
            root.push_str(&format!(r#" xmlns:{prefix}="{uri}""#));
        }
        if !self.namespaces.is_empty() {
            root.push_str(&format!(r#" xmlns:mc="{MC_NS}""#));
            for (prefix, uri) in &self.namespaces {
                root.push_str(&format!(r#" xmlns:{prefix}="{uri}""#));
            }
            let ignorable: Vec<&str> = self.namespaces.iter().map(|(p, _)| p.as_str()).collect();
            root.push_str(&format!(r#" mc:Ignorable="{}""#, ignorable.join(" ")));
        }
        root.push('>');

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>{root}<w:body>{}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#,
            self.blocks.concat()
        )
    }

    fn styles_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="{W_NS}"><w:docDefaults/><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>{}</w:styles>"#,
            self.styles.concat()
        )
    }

    fn document_rels(&self) -> String {
        let mut out = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (id, rel_type, target, external) in &self.rels {
            out.push_str(&format!(
                r#"<Relationship Id="{id}" Type="{rel_type}" Target="{}""#,
                escape(target)
            ));
            if *external {
                out.push_str(r#" TargetMode="External""#);
            }
            out.push_str("/>");
        }
        out.push_str("</Relationships>");
        out
    }

    fn package_rels(&self) -> String {
        let mut out = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_OFFICE_DOCUMENT}" Target="word/document.xml"/>"#
        );
        if self.core_properties {
            out.push_str(&format!(
                r#"<Relationship Id="rId2" Type="{REL_CORE_PROPERTIES}" Target="docProps/core.xml"/>"#
            ));
        }
        out.push_str("</Relationships>");
        out
    }

    fn content_types(&self) -> String {
        let mut out = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
        );
        if self.core_properties {
            out.push_str(&format!(
                r#"<Override PartName="/docProps/core.xml" ContentType="{CORE_PROPERTIES_CONTENT_TYPE}"/>"#
            ));
        }
        out.push_str("</Types>");
        out
    }

    fn core_xml(&self) -> String {
        let title = self.title.as_deref().unwrap_or("Fixture");
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>{}</dc:title><dc:creator>Fixture author</dc:creator></cp:coreProperties>"#,
            escape(title)
        )
    }

    /// All parts, `[Content_Types].xml` first.
    pub(crate) fn parts(&self) -> Vec<(String, Vec<u8>)> {
        let mut parts = vec![
            ("[Content_Types].xml".to_string(), self.content_types().into_bytes()),
            ("_rels/.rels".to_string(), self.package_rels().into_bytes()),
            ("word/document.xml".to_string(), self.document_xml().into_bytes()),
            (
                "word/_rels/document.xml.rels".to_string(),
                self.document_rels().into_bytes(),
            ),
            ("word/styles.xml".to_string(), self.styles_xml().into_bytes()),
        ];
        if self.core_properties {
            parts.push(("docProps/core.xml".to_string(), self.core_xml().into_bytes()));
        }
        parts.extend(self.media.iter().cloned());
        parts
    }

    /// Zip archive bytes of the package.
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in self.parts() {
            writer.start_file(name, options).unwrap();
            writer.write_all(&data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}

/// Write an executable `sh` script standing in for an external tool.
pub(crate) fn fake_tool(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}

/// Bytes of a PDF with `page_count` empty pages.
pub(crate) fn pdf_with_pages(page_count: usize) -> Vec<u8> {
    use lopdf::{Document, Object, dictionary};

    let mut doc = Document::with_version("1.4");
    let catalog_id = doc.new_object_id();
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();
    for _ in 0..page_count {
        let page_id = doc.new_object_id();
        let page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(page_id, page.into());
        page_ids.push(page_id);
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.into_iter().map(Object::from).collect::<Vec<Object>>(),
        "Count" => page_count as i64,
    };
    let catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };
    doc.objects.insert(pages_id, pages.into());
    doc.objects.insert(catalog_id, catalog.into());
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
