//! Block-level body elements of `word/document.xml`
//!
//! The body is kept as a list of top-level children, each holding the exact XML
//! it was read from. Paragraphs additionally expose their style id and plain text,
//! which is all the splitter needs to find section boundaries and names.

use super::styles::attribute;
use super::DocxError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const PART: &str = "word/document.xml";

/// A top-level child of `<w:body>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyElement {
    /// A `<w:p>` paragraph
    Paragraph(Paragraph),
    /// A `<w:tbl>` table
    Table(Table),
    /// Any other block-level child (content controls, bookmarks, ...), carried verbatim
    Other(RawBlock),
}

impl BodyElement {
    /// The raw OOXML of this element
    pub fn xml(&self) -> &str {
        match self {
            BodyElement::Paragraph(p) => &p.xml,
            BodyElement::Table(t) => &t.xml,
            BodyElement::Other(b) => &b.xml,
        }
    }

    /// The paragraph, if this element is one
    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            BodyElement::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    /// Human-readable element kind for log and error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            BodyElement::Paragraph(_) => "paragraph",
            BodyElement::Table(_) => "table",
            BodyElement::Other(_) => "non-text block",
        }
    }
}

/// A paragraph with its style and text extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    /// Style id from `<w:pPr><w:pStyle w:val=".."/>`, if any
    pub style_id: Option<String>,
    /// Concatenated run text (tabs as `\t`, breaks as `\n`)
    pub text: String,
    xml: String,
}

impl Paragraph {
    /// Create an unstyled paragraph holding `text`
    pub fn new(text: &str) -> Self {
        Self {
            style_id: None,
            text: text.to_string(),
            xml: generate_paragraph_xml(None, text),
        }
    }

    /// Create a paragraph with the given style id
    pub fn with_style(style_id: &str, text: &str) -> Self {
        Self {
            style_id: Some(style_id.to_string()),
            text: text.to_string(),
            xml: generate_paragraph_xml(Some(style_id), text),
        }
    }
}

/// A table, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Text of all cells, concatenated
    pub text: String,
    xml: String,
}

/// An unrecognised block-level element, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    /// Qualified tag name, e.g. `w:sdt`
    pub tag: String,
    xml: String,
}

/// `word/document.xml` split into the parts around the body children
#[derive(Debug, Clone)]
pub(super) struct ParsedBody {
    /// Everything up to and including the `<w:body>` start tag
    pub prologue: String,
    pub elements: Vec<BodyElement>,
    /// Trailing `<w:sectPr>` of the body
    pub section_properties: Option<String>,
    /// Everything from the `</w:body>` end tag on
    pub epilogue: String,
}

/// Scanner state for one top-level body child
struct BlockScanner {
    tag: String,
    start: usize,
    /// Depth inside the block, the block root being 1
    depth: usize,
    style_id: Option<String>,
    text: String,
    in_text: bool,
    ppr_depth: Option<usize>,
    /// Depth of an open text box or markup-compatibility fallback, whose text is not ours
    hidden_depth: Option<usize>,
}

impl BlockScanner {
    fn new(e: &BytesStart<'_>, start: usize) -> Self {
        Self {
            tag: String::from_utf8_lossy(e.name().as_ref()).to_string(),
            start,
            depth: 1,
            style_id: None,
            text: String::new(),
            in_text: false,
            ppr_depth: None,
            hidden_depth: None,
        }
    }

    fn on_start(&mut self, e: &BytesStart<'_>) {
        self.depth += 1;
        match e.name().as_ref() {
            b"w:txbxContent" | b"mc:Fallback" if self.hidden_depth.is_none() => {
                self.hidden_depth = Some(self.depth)
            }
            b"w:t" => self.in_text = true,
            b"w:pPr" => self.ppr_depth = Some(self.depth),
            _ => self.on_marker(e, self.depth),
        }
    }

    fn on_empty(&mut self, e: &BytesStart<'_>) {
        self.on_marker(e, self.depth + 1);
    }

    /// Handle elements that carry meaning by their presence or attributes
    fn on_marker(&mut self, e: &BytesStart<'_>, depth: usize) {
        if self.hidden_depth.is_some() {
            return;
        }
        match e.name().as_ref() {
            // Only the paragraph's own properties, not those of nested paragraphs
            b"w:pStyle" if self.ppr_depth == Some(2) && depth == 3 => {
                if self.style_id.is_none() {
                    self.style_id = attribute(e, b"w:val");
                }
            }
            // Tab stop definitions inside pPr are not text
            b"w:tab" if self.ppr_depth.is_none() => self.text.push('\t'),
            b"w:br" | b"w:cr" if self.ppr_depth.is_none() => self.text.push('\n'),
            _ => {}
        }
    }

    fn on_end(&mut self, name: &[u8]) {
        match name {
            b"w:t" => self.in_text = false,
            b"w:pPr" if self.ppr_depth == Some(self.depth) => self.ppr_depth = None,
            _ => {}
        }
        if self.hidden_depth == Some(self.depth) {
            self.hidden_depth = None;
        }
        self.depth -= 1;
    }

    fn on_text(&mut self, text: &str) {
        if self.in_text && self.hidden_depth.is_none() {
            self.text.push_str(text);
        }
    }

    fn finish(self, xml: &str) -> BodyElement {
        let xml = xml.to_string();
        match self.tag.as_str() {
            "w:p" => BodyElement::Paragraph(Paragraph {
                style_id: self.style_id,
                text: self.text,
                xml,
            }),
            "w:tbl" => BodyElement::Table(Table {
                text: self.text,
                xml,
            }),
            _ => BodyElement::Other(RawBlock { tag: self.tag, xml }),
        }
    }
}

fn xml_error(e: impl std::fmt::Display) -> DocxError {
    DocxError::Xml {
        part: PART,
        detail: e.to_string(),
    }
}

/// Split `word/document.xml` into prologue, body children, section properties and epilogue
pub(super) fn parse_document_xml(xml: &str) -> Result<ParsedBody, DocxError> {
    let mut reader = Reader::from_str(xml);

    let mut depth = 0usize;
    // Depth of <w:body> while inside it
    let mut body_depth: Option<usize> = None;
    let mut prologue: Option<String> = None;
    let mut epilogue: Option<String> = None;
    let mut current: Option<BlockScanner> = None;
    let mut elements = Vec::new();

    loop {
        let start = reader.buffer_position();
        let event = reader.read_event().map_err(xml_error)?;
        let end = reader.buffer_position();

        match event {
            Event::Start(e) => {
                depth += 1;
                match (body_depth, current.as_mut()) {
                    (None, _) if prologue.is_none() && e.name().as_ref() == b"w:body" => {
                        body_depth = Some(depth);
                        prologue = Some(xml[..end].to_string());
                    }
                    (Some(bd), None) if depth == bd + 1 => {
                        current = Some(BlockScanner::new(&e, start));
                    }
                    (Some(_), Some(scanner)) => scanner.on_start(&e),
                    _ => {}
                }
            }
            Event::Empty(e) => match (body_depth, current.as_mut()) {
                (None, _) if prologue.is_none() && e.name().as_ref() == b"w:body" => {
                    // <w:body/>: rewrite as an open/close pair so content can be inserted
                    let tag = xml[start..end].trim_end_matches("/>").trim_end();
                    prologue = Some(format!("{}{}>", &xml[..start], tag));
                    epilogue = Some(format!("</w:body>{}", &xml[end..]));
                }
                (Some(_), None) => {
                    elements.push(BlockScanner::new(&e, start).finish(&xml[start..end]));
                }
                (Some(_), Some(scanner)) => scanner.on_empty(&e),
                _ => {}
            },
            Event::End(e) => {
                match (body_depth, current.take()) {
                    (Some(bd), None) if depth == bd => {
                        body_depth = None;
                        epilogue = Some(xml[start..].to_string());
                    }
                    (Some(bd), Some(scanner)) if depth == bd + 1 => {
                        let block_start = scanner.start;
                        elements.push(scanner.finish(&xml[block_start..end]));
                    }
                    (_, Some(mut scanner)) => {
                        scanner.on_end(e.name().as_ref());
                        current = Some(scanner);
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) => {
                if let Some(scanner) = current.as_mut() {
                    let text = t.unescape().map_err(xml_error)?;
                    scanner.on_text(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }

        if epilogue.is_some() {
            break;
        }
    }

    let prologue = prologue.ok_or(DocxError::MissingPart("<w:body>"))?;
    let epilogue = epilogue.ok_or_else(|| xml_error("<w:body> is never closed"))?;

    let section_properties = match elements.last() {
        Some(BodyElement::Other(block)) if block.tag == "w:sectPr" => {
            elements.pop().map(|e| e.xml().to_string())
        }
        _ => None,
    };

    Ok(ParsedBody {
        prologue,
        elements,
        section_properties,
        epilogue,
    })
}

/// Generate OOXML for a paragraph of plain text
///
/// Newlines become `<w:br/>` and tabs `<w:tab/>`, mirroring how they are read back.
pub(super) fn generate_paragraph_xml(style_id: Option<&str>, text: &str) -> String {
    let mut xml = String::from("<w:p>");
    if let Some(style) = style_id {
        xml.push_str(&format!(
            r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#,
            escape_xml(style)
        ));
    }
    xml.push_str("<w:r>");

    let mut segment = String::new();
    for c in text.chars() {
        match c {
            '\n' | '\t' => {
                push_text(&mut xml, &segment);
                segment.clear();
                xml.push_str(if c == '\n' { "<w:br/>" } else { "<w:tab/>" });
            }
            _ => segment.push(c),
        }
    }
    push_text(&mut xml, &segment);

    xml.push_str("</w:r></w:p>");
    xml
}

fn push_text(xml: &mut String, segment: &str) {
    if !segment.is_empty() {
        xml.push_str(&format!(
            r#"<w:t xml:space="preserve">{}</w:t>"#,
            escape_xml(segment)
        ));
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        )
    }

    #[test]
    fn test_parse_paragraphs_and_tables() {
        let xml = document(concat!(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Intro</w:t></w:r></w:p>"#,
            "\n  ",
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
            r#"<w:sdt><w:sdtContent/></w:sdt>"#,
            r#"<w:sectPr><w:pgSz w:w="12240"/></w:sectPr>"#,
        ));

        let body = parse_document_xml(&xml).unwrap();

        assert_eq!(body.elements.len(), 3);
        let BodyElement::Paragraph(heading) = &body.elements[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(heading.style_id.as_deref(), Some("Heading1"));
        assert_eq!(heading.text, "Intro");
        assert!(matches!(&body.elements[1], BodyElement::Table(t) if t.text == "cell"));
        assert!(matches!(&body.elements[2], BodyElement::Other(b) if b.tag == "w:sdt"));
        assert_eq!(
            body.section_properties.as_deref(),
            Some(r#"<w:sectPr><w:pgSz w:w="12240"/></w:sectPr>"#)
        );
        assert!(body.prologue.ends_with("<w:body>"));
        assert_eq!(body.epilogue, "</w:body></w:document>");
    }

    #[test]
    fn test_element_xml_is_kept_verbatim() {
        let paragraph = r#"<w:p w14:paraId="1A2B"><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve"> bold </w:t></w:r></w:p>"#;
        let body = parse_document_xml(&document(paragraph)).unwrap();
        assert_eq!(body.elements[0].xml(), paragraph);
    }

    #[test]
    fn test_text_extraction_handles_tabs_breaks_and_entities() {
        let xml = document(concat!(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr>"#,
            r#"<w:r><w:t>A &amp; B</w:t><w:tab/><w:t>C</w:t><w:br/><w:t>D</w:t></w:r></w:p>"#
        ));

        let body = parse_document_xml(&xml).unwrap();
        let paragraph = body.elements[0].as_paragraph().unwrap();

        assert_eq!(paragraph.text, "A & B\tC\nD");
        assert_eq!(paragraph.style_id, None);
    }

    #[test]
    fn test_text_box_content_is_not_paragraph_text() {
        let xml = document(concat!(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Pump</w:t></w:r>"#,
            r#"<w:r><mc:AlternateContent><mc:Choice Requires="wps"><w:drawing><wps:txbx>"#,
            r#"<w:txbxContent><w:p><w:r><w:t>Callout</w:t><w:br/></w:r></w:p></w:txbxContent>"#,
            r#"</wps:txbx></w:drawing></mc:Choice><mc:Fallback><w:pict><v:textbox>"#,
            r#"<w:txbxContent><w:p><w:r><w:t>Callout</w:t></w:r></w:p></w:txbxContent>"#,
            r#"</v:textbox></w:pict></mc:Fallback></mc:AlternateContent></w:r>"#,
            r#"<w:r><w:t xml:space="preserve"> Setup</w:t></w:r></w:p>"#
        ));

        let body = parse_document_xml(&xml).unwrap();
        let paragraph = body.elements[0].as_paragraph().unwrap();

        assert_eq!(paragraph.text, "Pump Setup");
        assert_eq!(paragraph.style_id.as_deref(), Some("Heading1"));
    }

    #[test]
    fn test_nested_paragraph_style_is_not_the_table_style() {
        let xml = document(
            r#"<w:tbl><w:tr><w:tc><w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr></w:p></w:tc></w:tr></w:tbl>"#,
        );
        let body = parse_document_xml(&xml).unwrap();
        assert!(matches!(body.elements[0], BodyElement::Table(_)));
    }

    #[test]
    fn test_self_closing_body() {
        let xml = r#"<w:document xmlns:w="x"><w:body/></w:document>"#;
        let body = parse_document_xml(xml).unwrap();

        assert!(body.elements.is_empty());
        assert_eq!(body.prologue, r#"<w:document xmlns:w="x"><w:body>"#);
        assert_eq!(body.epilogue, "</w:body></w:document>");
    }

    #[test]
    fn test_missing_body_is_an_error() {
        let result = parse_document_xml(r#"<w:document xmlns:w="x"></w:document>"#);
        assert!(matches!(result, Err(DocxError::MissingPart(_))));
    }

    #[test]
    fn test_generated_paragraph_reads_back() {
        let generated = generate_paragraph_xml(Some("Heading2"), "Tools <& more>\nline two\tend");
        let body = parse_document_xml(&document(&generated)).unwrap();
        let paragraph = body.elements[0].as_paragraph().unwrap();

        assert_eq!(paragraph.style_id.as_deref(), Some("Heading2"));
        assert_eq!(paragraph.text, "Tools <& more>\nline two\tend");
    }
}
