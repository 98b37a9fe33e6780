//! In-memory model of a DOCX package
//!
//! A .docx file is a ZIP archive of XML parts. This model keeps every part exactly as
//! read and decomposes only `word/document.xml`, into the text before the body
//! children, the ordered list of body children, the trailing section properties and
//! the text after the body. Saving writes the parts back in their original order with
//! the body re-assembled from the (possibly truncated or extended) element list.
//!
//! Everything is owned data, so `clone()` yields a fully independent document: removing
//! elements from one copy can never affect another.

mod body;
mod error;
mod styles;

pub use body::{BodyElement, Paragraph, RawBlock, Table};
pub use error::DocxError;
pub use styles::StyleSheet;

use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::read::ZipArchive;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";

/// One entry of the ZIP archive
#[derive(Debug, Clone, PartialEq, Eq)]
struct PackagePart {
    name: String,
    /// Raw bytes; empty for the document part, which is regenerated on save
    data: Vec<u8>,
    compression: CompressionMethod,
}

/// A loaded word-processing document
#[derive(Debug, Clone)]
pub struct DocxDocument {
    parts: Vec<PackagePart>,
    prologue: String,
    elements: Vec<BodyElement>,
    section_properties: Option<String>,
    epilogue: String,
    styles: StyleSheet,
}

impl DocxDocument {
    /// Load a document from a .docx file
    pub fn open(path: &Path) -> Result<Self, DocxError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Load a document from the bytes of a .docx file
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let mut parts = Vec::with_capacity(archive.len());
        let mut document_xml: Option<String> = None;
        let mut styles = StyleSheet::default();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();

            // Skip directories
            if name.ends_with('/') {
                continue;
            }

            let compression = match file.compression() {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;

            if name == DOCUMENT_PART {
                document_xml = Some(into_utf8(&name, data)?);
                data = Vec::new();
            } else if name == STYLES_PART {
                styles = StyleSheet::parse(std::str::from_utf8(&data).map_err(|_| {
                    DocxError::Encoding {
                        part: name.clone(),
                    }
                })?)?;
            }

            parts.push(PackagePart {
                name,
                data,
                compression,
            });
        }

        let document_xml = document_xml.ok_or(DocxError::MissingPart(DOCUMENT_PART))?;
        let parsed = body::parse_document_xml(&document_xml)?;

        log::debug!(
            "Loaded DOCX with {} parts, {} body elements, {} named styles",
            parts.len(),
            parsed.elements.len(),
            styles.len()
        );

        Ok(Self {
            parts,
            prologue: parsed.prologue,
            elements: parsed.elements,
            section_properties: parsed.section_properties,
            epilogue: parsed.epilogue,
            styles,
        })
    }

    /// Write the document to a .docx file, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<(), DocxError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Serialize the document to the bytes of a .docx file
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let document_xml = self.document_xml();

        for part in &self.parts {
            // Fixed timestamp keeps output byte-for-byte reproducible
            let options = SimpleFileOptions::default()
                .compression_method(part.compression)
                .last_modified_time(zip::DateTime::default());
            zip.start_file(part.name.as_str(), options)?;
            if part.name == DOCUMENT_PART {
                zip.write_all(document_xml.as_bytes())?;
            } else {
                zip.write_all(&part.data)?;
            }
        }

        Ok(zip.finish()?.into_inner())
    }

    /// Re-assemble `word/document.xml` from the current element list
    pub fn document_xml(&self) -> String {
        let body_len: usize = self.elements.iter().map(|e| e.xml().len()).sum();
        let mut xml = String::with_capacity(self.prologue.len() + body_len + 256);
        xml.push_str(&self.prologue);
        for element in &self.elements {
            xml.push_str(element.xml());
        }
        if let Some(ref sect_pr) = self.section_properties {
            xml.push_str(sect_pr);
        }
        xml.push_str(&self.epilogue);
        xml
    }

    /// Body elements in document order
    pub fn elements(&self) -> &[BodyElement] {
        &self.elements
    }

    /// Number of body elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the body has no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The document's style sheet
    pub fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    /// Paragraphs of the body, skipping tables and other blocks
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.elements.iter().filter_map(BodyElement::as_paragraph)
    }

    /// Append an element at the end of the body (before the section properties)
    pub fn push(&mut self, element: BodyElement) {
        self.elements.push(element);
    }

    /// Append an unstyled paragraph of text
    ///
    /// Not idempotent: each call adds another paragraph.
    pub fn add_paragraph(&mut self, text: &str) {
        self.push(BodyElement::Paragraph(Paragraph::new(text)));
    }

    /// Cut the document in two at element index `cut`
    ///
    /// The head receives elements `[0, cut)` and the tail `[cut, end)`. The head is a
    /// complete copy of the package truncated after copying, the tail is this document
    /// with its prefix removed; both keep every other part and the section properties.
    /// `cut` values past the end are clamped.
    pub fn split_at(self, cut: usize) -> (Self, Self) {
        let cut = cut.min(self.elements.len());

        let mut head = self.clone();
        head.elements.truncate(cut);

        let mut tail = self;
        tail.elements.drain(..cut);

        (head, tail)
    }
}

fn into_utf8(part: &str, data: Vec<u8>) -> Result<String, DocxError> {
    String::from_utf8(data).map_err(|_| DocxError::Encoding {
        part: part.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Minimal hand-written packages for unit tests

    use super::*;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

    const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/></w:style><w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/></w:style></w:styles>"#;

    /// Shorthand for building body content
    pub enum Block<'a> {
        H1(&'a str),
        H2(&'a str),
        H3(&'a str),
        P(&'a str),
        Tbl(&'a str),
    }

    fn block_xml(block: &Block<'_>) -> String {
        match block {
            Block::H1(text) => body::generate_paragraph_xml(Some("Heading1"), text),
            Block::H2(text) => body::generate_paragraph_xml(Some("Heading2"), text),
            Block::H3(text) => body::generate_paragraph_xml(Some("Heading3"), text),
            Block::P(text) => body::generate_paragraph_xml(None, text),
            Block::Tbl(text) => format!(
                "<w:tbl><w:tr><w:tc>{}</w:tc></w:tr></w:tbl>",
                body::generate_paragraph_xml(None, text)
            ),
        }
    }

    /// Build the bytes of a .docx whose body holds `blocks`
    pub fn docx_bytes(blocks: &[Block<'_>]) -> Vec<u8> {
        let body: String = blocks.iter().map(block_xml).collect();
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#,
            body
        );

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, data) in [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", ROOT_RELS),
            (DOCUMENT_PART, document.as_str()),
            (STYLES_PART, STYLES),
        ] {
            zip.start_file(name, options).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    /// Build a loaded document whose body holds `blocks`
    pub fn docx(blocks: &[Block<'_>]) -> DocxDocument {
        DocxDocument::from_bytes(&docx_bytes(blocks)).unwrap()
    }

    /// Paragraph/table texts of a document, for compact assertions
    pub fn texts(doc: &DocxDocument) -> Vec<String> {
        doc.elements()
            .iter()
            .map(|e| match e {
                BodyElement::Paragraph(p) => p.text.clone(),
                BodyElement::Table(t) => t.text.clone(),
                BodyElement::Other(b) => b.tag.clone(),
            })
            .collect()
    }
}
