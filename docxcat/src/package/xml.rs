//! Small helpers shared by the XML parts of a package.

use quick_xml::events::BytesStart;
use quick_xml::name::QName;

use crate::error::Result;

/// Standard XML declaration written at the top of every generated part.
pub const XML_DECLARATION: &str =
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// WordprocessingML main namespace.
pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Office document relationships namespace (`r:id`, `r:embed`, ...).
pub const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Package relationships namespace (`.rels` parts).
pub const PACKAGE_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Content types namespace (`[Content_Types].xml`).
pub const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

/// Markup compatibility namespace (`mc:Ignorable`).
pub const MC_NS: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";

/// Return the part of a qualified name after the prefix.
pub fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

/// Return the prefix of a qualified name, if any.
pub fn prefix(name: &[u8]) -> Option<&[u8]> {
    name.iter().position(|&b| b == b':').map(|idx| &name[..idx])
}

/// Read and unescape an attribute by its qualified name.
pub fn attr(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Read an attribute by its local name, ignoring the prefix.
///
/// Word writes `w:val`, `w:id` and friends with whatever prefix the document
/// bound to the main namespace; this lookup tolerates unusual prefixes.
pub fn attr_local(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        if local_name(key) == local && !key.starts_with(b"xmlns") {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Namespace declarations (`xmlns:p="uri"`) carried by an element.
///
/// The default namespace is reported with an empty prefix.
pub fn namespace_declarations(e: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut decls = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        let prefix = if key == b"xmlns" {
            String::new()
        } else if let Some(rest) = key.strip_prefix(b"xmlns:") {
            String::from_utf8_lossy(rest).into_owned()
        } else {
            continue;
        };
        decls.push((prefix, attr.unescape_value()?.into_owned()));
    }
    Ok(decls)
}

/// Find the prefix bound to `uri` in a list of declarations.
pub fn prefix_for<'a>(decls: &'a [(String, String)], uri: &str) -> Option<&'a str> {
    decls
        .iter()
        .find(|(_, bound)| bound == uri)
        .map(|(prefix, _)| prefix.as_str())
}

/// Whether a qualified name is `prefix:local`.
pub fn is_qualified(name: QName<'_>, prefix: &str, local: &[u8]) -> bool {
    let name = name.as_ref();
    name.len() == prefix.len() + 1 + local.len()
        && name.starts_with(prefix.as_bytes())
        && name[prefix.len()] == b':'
        && name.ends_with(local)
}

/// Escape text for use in XML content or attribute values.
pub fn escape(text: &str) -> std::borrow::Cow<'_, str> {
    quick_xml::escape::escape(text)
}
