//! Built-in DOCX to HTML conversion.
//!
//! Feeds the secondary conversion route: the combined document is turned
//! into a single self-contained HTML page (images inlined as base64 data
//! URIs) which an HTML renderer then prints to PDF.
//!
//! The conversion streams over the main document part and keeps what an
//! HTML page can express:
//!
//! - paragraphs, with headings taken from `Heading1`-`Heading6`/`Title`
//!   styles (directly or through `basedOn`)
//! - bold, italic, underline, strike-through, super- and subscript runs
//! - external and internal hyperlinks, bookmark anchors
//! - tables (with horizontal spans) and bulleted list items
//! - inline pictures at their document size
//! - explicit page breaks
//!
//! Deleted revisions and field instructions are skipped; field results are
//! kept as ordinary text.

use std::collections::HashMap;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{DocxCatError, Result};
use crate::merge::bookmarks::GO_BACK_BOOKMARK;
use crate::merge::metadata::MetadataManager;
use crate::merge::styles;
use crate::package::relationships::REL_STYLES;
use crate::package::xml::{self, W_NS, escape};
use crate::package::{DocxPackage, Relationships, resolve_target};

/// English Metric Units per CSS pixel at 96 dpi.
pub const EMU_PER_PIXEL: i64 = 9525;

const PAGE_BREAK: &str = "<div class=\"page-break\"></div>\n";

const STYLESHEET: &str = "\
body { font-family: 'Liberation Serif', 'Times New Roman', serif; font-size: 12pt; }
p, li { white-space: pre-wrap; margin: 0 0 6pt 0; }
table { border-collapse: collapse; margin: 6pt 0; }
td { border: 1px solid #999; padding: 2pt 4pt; vertical-align: top; }
img { max-width: 100%; }
.page-break { page-break-after: always; }
";

/// Word elements whose whole subtree is left out of the page.
const SKIPPED: &[&[u8]] = &[
    b"del",
    b"moveFrom",
    b"delText",
    b"instrText",
    b"delInstrText",
    b"sectPr",
];

/// A converted document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlDocument {
    /// Page title, from the document's core properties.
    pub title: String,
    /// Markup of the page body.
    pub body: String,
    /// Number of paragraphs converted.
    pub paragraphs: usize,
    /// Number of tables converted.
    pub tables: usize,
    /// Number of images inlined.
    pub images: usize,
}

impl HtmlDocument {
    /// Full HTML page.
    pub fn to_html(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{STYLESHEET}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
            escape(&self.title),
            self.body
        )
    }

    /// Write the page to `path`.
    pub async fn write_to(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::write(path, self.to_html()).await
    }
}

/// Converts Word packages into [`HtmlDocument`]s.
#[derive(Debug, Clone, Default)]
pub struct HtmlConverter;

impl HtmlConverter {
    /// Create a converter.
    pub fn new() -> Self {
        Self
    }

    /// Convert a `.docx` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid Word
    /// package.
    pub fn convert_file(&self, path: &Path) -> Result<HtmlDocument> {
        let bytes = std::fs::read(path).map_err(|source| DocxCatError::FileNotAccessible {
            path: path.to_path_buf(),
            source,
        })?;
        let package =
            DocxPackage::from_bytes(&bytes).map_err(|err| err.with_path(path.to_path_buf()))?;
        self.convert_package(&package)
            .map_err(|err| err.with_path(path.to_path_buf()))
    }

    /// Convert a package held in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the main document part is malformed.
    pub fn convert_package(&self, package: &DocxPackage) -> Result<HtmlDocument> {
        let part = package.main_document_part()?;
        let text = package.part_text(&part)?;
        let rels = package.relationships_for(&part)?;
        let headings = heading_styles(package, &part, &rels)?;
        let title = MetadataManager::new()
            .title(package)?
            .unwrap_or_else(|| "Document".to_string());

        let mut builder = HtmlBuilder::new(package, &part, &rels, &headings);
        let mut reader = Reader::from_str(text);
        loop {
            match reader
                .read_event()
                .map_err(|err| DocxCatError::malformed_part(&part, err))?
            {
                Event::Eof => break,
                event => builder.handle(event)?,
            }
        }

        Ok(builder.finish(title))
    }
}

/// Heading level of a built-in style id (`Heading2`, `heading 2`, `Title`).
fn builtin_heading_level(id: &str) -> Option<u8> {
    if id.eq_ignore_ascii_case("title") {
        return Some(1);
    }
    let lower = id.to_ascii_lowercase();
    let digits = lower.strip_prefix("heading")?.trim_start();
    match digits.parse::<u8>() {
        Ok(level @ 1..=6) => Some(level),
        _ => None,
    }
}

/// Heading levels of the document's styles, following `basedOn` chains.
fn heading_styles(
    package: &DocxPackage,
    part: &str,
    rels: &Relationships,
) -> Result<HashMap<String, u8>> {
    let mut levels = HashMap::new();
    let Some(rel) = rels.first_of_type(REL_STYLES) else {
        return Ok(levels);
    };
    let styles_part = resolve_target(part, &rel.target);
    if !package.contains_part(&styles_part) {
        return Ok(levels);
    }

    let defs = styles::parse_styles(&styles_part, package.part_text(&styles_part)?)?;
    let based_on: HashMap<&str, &str> = defs
        .iter()
        .filter_map(|def| def.based_on.as_deref().map(|parent| (def.id.as_str(), parent)))
        .collect();

    for def in &defs {
        let mut current = def.id.as_str();
        for _ in 0..16 {
            if let Some(level) = builtin_heading_level(current) {
                levels.insert(def.id.clone(), level);
                break;
            }
            match based_on.get(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
    }

    Ok(levels)
}

/// Whether a toggle property (`<w:b/>`, `<w:b w:val="0"/>`) is on.
fn toggle(e: &BytesStart<'_>) -> Result<bool> {
    Ok(!matches!(
        xml::attr_local(e, b"val")?.as_deref(),
        Some("0" | "false" | "off" | "none")
    ))
}

#[derive(Debug, Default)]
struct Paragraph {
    html: String,
    style: Option<String>,
    list: bool,
    align: Option<&'static str>,
    break_before: bool,
    break_after: bool,
}

#[derive(Debug, Default)]
struct Run {
    html: String,
    bold: bool,
    italic: bool,
    underline: bool,
    strike: bool,
    superscript: bool,
    subscript: bool,
}

impl Run {
    fn into_html(self) -> String {
        let mut html = self.html;
        if html.is_empty() {
            return html;
        }
        let tags = [
            (self.superscript, "sup"),
            (self.subscript, "sub"),
            (self.strike, "s"),
            (self.underline, "u"),
            (self.italic, "em"),
            (self.bold, "strong"),
        ];
        for (on, tag) in tags {
            if on {
                html = format!("<{tag}>{html}</{tag}>");
            }
        }
        html
    }
}

struct HtmlBuilder<'a> {
    package: &'a DocxPackage,
    part: &'a str,
    rels: &'a Relationships,
    headings: &'a HashMap<String, u8>,
    word_prefix: Option<String>,

    out: String,
    paragraphs: Vec<Paragraph>,
    runs: Vec<Run>,
    links: Vec<bool>,
    cells: Vec<usize>,
    in_paragraph_props: bool,
    in_run_props: bool,
    in_text: bool,
    list_open: bool,
    skip_depth: usize,
    extent: Option<(i64, i64)>,
    alt: Option<String>,

    paragraph_count: usize,
    table_count: usize,
    image_count: usize,
}

impl<'a> HtmlBuilder<'a> {
    fn new(
        package: &'a DocxPackage,
        part: &'a str,
        rels: &'a Relationships,
        headings: &'a HashMap<String, u8>,
    ) -> Self {
        Self {
            package,
            part,
            rels,
            headings,
            word_prefix: None,
            out: String::new(),
            paragraphs: Vec::new(),
            runs: Vec::new(),
            links: Vec::new(),
            cells: Vec::new(),
            in_paragraph_props: false,
            in_run_props: false,
            in_text: false,
            list_open: false,
            skip_depth: 0,
            extent: None,
            alt: None,
            paragraph_count: 0,
            table_count: 0,
            image_count: 0,
        }
    }

    fn handle(&mut self, event: Event<'_>) -> Result<()> {
        if self.skip_depth > 0 {
            match event {
                Event::Start(_) => self.skip_depth += 1,
                Event::End(_) => self.skip_depth -= 1,
                _ => {}
            }
            return Ok(());
        }

        match event {
            Event::Start(e) => self.start(&e, false),
            Event::Empty(e) => self.start(&e, true),
            Event::End(e) => {
                let name = e.name();
                if let Some(local) = self.word_local(name.as_ref()) {
                    self.end(local);
                }
                Ok(())
            }
            Event::Text(t) if self.in_text => {
                let text = t.unescape()?;
                self.push_text(&text);
                Ok(())
            }
            Event::CData(t) if self.in_text => {
                let text = String::from_utf8_lossy(&t).into_owned();
                self.push_text(&text);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn word_local<'n>(&self, name: &'n [u8]) -> Option<&'n [u8]> {
        let prefix = self.word_prefix.as_deref().unwrap_or("w");
        (xml::prefix(name) == Some(prefix.as_bytes())).then(|| xml::local_name(name))
    }

    fn start(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<()> {
        if self.word_prefix.is_none() {
            let namespaces = xml::namespace_declarations(e)?;
            self.word_prefix = Some(xml::prefix_for(&namespaces, W_NS).unwrap_or("w").to_string());
            return Ok(());
        }

        let name = e.name();
        let Some(local) = self.word_local(name.as_ref()) else {
            return self.start_foreign(e, empty);
        };

        if SKIPPED.contains(&local) {
            if !empty {
                self.skip_depth = 1;
            }
            return Ok(());
        }

        match local {
            b"p" => self.paragraphs.push(Paragraph::default()),
            b"pPr" => self.in_paragraph_props = !self.paragraphs.is_empty(),
            b"r" => self.runs.push(Run::default()),
            b"rPr" => self.in_run_props = !self.in_paragraph_props && !self.runs.is_empty(),
            b"t" => self.in_text = !self.in_paragraph_props,
            _ if self.in_paragraph_props => self.paragraph_property(local, e)?,
            _ if self.in_run_props => self.run_property(local, e)?,
            b"tab" => self.push_raw("\t"),
            b"cr" => self.push_raw("<br/>"),
            b"noBreakHyphen" => self.push_raw("-"),
            b"br" => match xml::attr_local(e, b"type")?.as_deref() {
                Some("page") => match self.paragraphs.last_mut() {
                    Some(paragraph) => paragraph.break_after = true,
                    None => self.push_raw(PAGE_BREAK),
                },
                Some("column") => {}
                _ => self.push_raw("<br/>"),
            },
            b"hyperlink" => {
                let href = self.hyperlink_target(e)?;
                if let Some(href) = &href {
                    self.push_raw(&format!("<a href=\"{}\">", escape(href)));
                }
                self.links.push(href.is_some());
            }
            b"bookmarkStart" => {
                if let Some(name) = xml::attr_local(e, b"name")?
                    && name != GO_BACK_BOOKMARK
                {
                    self.push_raw(&format!("<a id=\"{}\"></a>", escape(&name)));
                }
            }
            b"tbl" => {
                self.close_list();
                self.table_count += 1;
                self.push_raw("<table>\n");
            }
            b"tr" => {
                self.close_list();
                self.push_raw("<tr>");
            }
            b"tc" => {
                self.close_list();
                self.push_raw("<td");
                let position = self.sink().len();
                self.cells.push(position);
                self.push_raw(">");
            }
            b"gridSpan" => {
                let span = xml::attr_local(e, b"val")?.and_then(|v| v.parse::<u32>().ok());
                if let (Some(span @ 2..), Some(&position)) = (span, self.cells.last()) {
                    self.sink().insert_str(position, &format!(" colspan=\"{span}\""));
                }
            }
            b"drawing" | b"pict" => {
                self.extent = None;
                self.alt = None;
            }
            _ => {}
        }

        if empty {
            self.end(local);
        }
        Ok(())
    }

    fn start_foreign(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<()> {
        let name = e.name();
        match xml::local_name(name.as_ref()) {
            b"Fallback" => {
                if !empty {
                    self.skip_depth = 1;
                }
            }
            b"extent" => {
                let cx = xml::attr_local(e, b"cx")?.and_then(|v| v.parse::<i64>().ok());
                let cy = xml::attr_local(e, b"cy")?.and_then(|v| v.parse::<i64>().ok());
                if let (Some(cx), Some(cy)) = (cx, cy) {
                    self.extent = Some((cx, cy));
                }
            }
            b"docPr" => {
                self.alt = xml::attr_local(e, b"descr")?.filter(|d| !d.is_empty());
            }
            b"blip" => {
                if let Some(id) = xml::attr_local(e, b"embed")? {
                    self.image(&id)?;
                }
            }
            b"imagedata" => {
                if let Some(id) = xml::attr_local(e, b"id")? {
                    self.image(&id)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn paragraph_property(&mut self, local: &[u8], e: &BytesStart<'_>) -> Result<()> {
        let Some(paragraph) = self.paragraphs.last_mut() else {
            return Ok(());
        };
        match local {
            b"pStyle" => paragraph.style = xml::attr_local(e, b"val")?,
            b"numPr" => paragraph.list = true,
            b"pageBreakBefore" => paragraph.break_before = toggle(e)?,
            b"jc" => {
                paragraph.align = match xml::attr_local(e, b"val")?.as_deref() {
                    Some("center") => Some("center"),
                    Some("right" | "end") => Some("right"),
                    Some("both" | "distribute") => Some("justify"),
                    _ => None,
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn run_property(&mut self, local: &[u8], e: &BytesStart<'_>) -> Result<()> {
        let Some(run) = self.runs.last_mut() else {
            return Ok(());
        };
        match local {
            b"b" => run.bold = toggle(e)?,
            b"i" => run.italic = toggle(e)?,
            b"u" => run.underline = toggle(e)?,
            b"strike" | b"dstrike" => run.strike = toggle(e)?,
            b"vertAlign" => {
                let align = xml::attr_local(e, b"val")?;
                run.superscript = align.as_deref() == Some("superscript");
                run.subscript = align.as_deref() == Some("subscript");
            }
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, local: &[u8]) {
        match local {
            b"p" => self.end_paragraph(),
            b"pPr" => self.in_paragraph_props = false,
            b"rPr" => self.in_run_props = false,
            b"t" => self.in_text = false,
            b"r" => {
                if let Some(run) = self.runs.pop() {
                    let html = run.into_html();
                    self.push_raw(&html);
                }
            }
            b"hyperlink" => {
                if self.links.pop() == Some(true) {
                    self.push_raw("</a>");
                }
            }
            b"tc" => {
                self.close_list();
                self.cells.pop();
                self.push_raw("</td>");
            }
            b"tr" => {
                self.close_list();
                self.push_raw("</tr>\n");
            }
            b"tbl" => {
                self.close_list();
                self.push_raw("</table>\n");
            }
            _ => {}
        }
    }

    fn end_paragraph(&mut self) {
        let Some(paragraph) = self.paragraphs.pop() else {
            return;
        };
        self.paragraph_count += 1;
        self.in_paragraph_props = false;

        let level = paragraph.style.as_deref().and_then(|style| {
            self.headings
                .get(style)
                .copied()
                .or_else(|| builtin_heading_level(style))
        });
        let is_item = paragraph.list && level.is_none();
        let align = paragraph
            .align
            .map(|a| format!(" style=\"text-align: {a}\""))
            .unwrap_or_default();
        let content = paragraph.html;

        if !is_item || paragraph.break_before {
            self.close_list();
        }
        if paragraph.break_before {
            self.push_raw(PAGE_BREAK);
        }

        if is_item {
            if !self.list_open {
                self.push_raw("<ul>\n");
                self.list_open = true;
            }
            self.push_raw(&format!("<li{align}>{content}</li>\n"));
        } else if let Some(level) = level {
            self.push_raw(&format!("<h{level}{align}>{content}</h{level}>\n"));
        } else if !content.is_empty() {
            self.push_raw(&format!("<p{align}>{content}</p>\n"));
        } else if !paragraph.break_after {
            self.push_raw("<p>&#160;</p>\n");
        }

        if paragraph.break_after {
            self.close_list();
            self.push_raw(PAGE_BREAK);
        }
    }

    fn hyperlink_target(&self, e: &BytesStart<'_>) -> Result<Option<String>> {
        if let Some(id) = xml::attr_local(e, b"id")?
            && let Some(rel) = self.rels.get(&id)
            && rel.external
        {
            return Ok(Some(rel.target.clone()));
        }
        Ok(xml::attr_local(e, b"anchor")?.map(|anchor| format!("#{anchor}")))
    }

    fn image(&mut self, id: &str) -> Result<()> {
        let package = self.package;
        let Some(rel) = self.rels.get(id).filter(|rel| !rel.external) else {
            log::debug!("image {id} has no internal target; skipped");
            return Ok(());
        };
        let part = resolve_target(self.part, &rel.target);
        let Some(data) = package.part(&part) else {
            log::debug!("image part {part} is missing; skipped");
            return Ok(());
        };
        let mime = package
            .content_types()
            .content_type_of(&part)
            .unwrap_or("application/octet-stream");

        let mut tag = format!("<img src=\"data:{mime};base64,{}\"", STANDARD.encode(data));
        if let Some((cx, cy)) = self.extent.take() {
            let (width, height) = (cx / EMU_PER_PIXEL, cy / EMU_PER_PIXEL);
            if width > 0 && height > 0 {
                tag.push_str(&format!(" width=\"{width}\" height=\"{height}\""));
            }
        }
        if let Some(alt) = self.alt.take() {
            tag.push_str(&format!(" alt=\"{}\"", escape(&alt)));
        }
        tag.push_str("/>");

        self.image_count += 1;
        self.push_raw(&tag);
        Ok(())
    }

    fn sink(&mut self) -> &mut String {
        match (self.runs.last_mut(), self.paragraphs.last_mut()) {
            (Some(run), _) => &mut run.html,
            (None, Some(paragraph)) => &mut paragraph.html,
            (None, None) => &mut self.out,
        }
    }

    fn push_raw(&mut self, html: &str) {
        self.sink().push_str(html);
    }

    fn push_text(&mut self, text: &str) {
        let escaped = escape(text);
        self.sink().push_str(&escaped);
    }

    fn close_list(&mut self) {
        if self.list_open {
            self.list_open = false;
            self.push_raw("</ul>\n");
        }
    }

    fn finish(mut self, title: String) -> HtmlDocument {
        self.close_list();
        HtmlDocument {
            title,
            body: self.out,
            paragraphs: self.paragraph_count,
            tables: self.table_count,
            images: self.image_count,
        }
    }
}
