//! Paragraph style lookup from `word/styles.xml`
//!
//! Paragraphs reference their style by id (`<w:pStyle w:val="Heading1"/>`), while
//! the human-readable name ("heading 1") lives in the style sheet. Word always
//! writes built-in names in English, so the name is the reliable thing to match on.

use super::DocxError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

/// Style id to style name mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSheet {
    names: HashMap<String, String>,
}

impl StyleSheet {
    /// Parse the contents of `word/styles.xml`
    pub fn parse(xml: &str) -> Result<Self, DocxError> {
        let mut names = HashMap::new();
        let mut reader = Reader::from_str(xml);
        let mut current_id: Option<String> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.name().as_ref() == b"w:style" => {
                    current_id = attribute(&e, b"w:styleId");
                }
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"w:name" => {
                    if let (Some(id), Some(name)) = (current_id.as_ref(), attribute(&e, b"w:val"))
                    {
                        names.insert(id.clone(), name);
                    }
                }
                Ok(Event::End(e)) if e.name().as_ref() == b"w:style" => {
                    current_id = None;
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(DocxError::Xml {
                        part: "word/styles.xml",
                        detail: e.to_string(),
                    })
                }
                _ => {}
            }
        }

        Ok(Self { names })
    }

    /// Look up the declared name of a style id
    pub fn name_of(&self, style_id: &str) -> Option<&str> {
        self.names.get(style_id).map(String::as_str)
    }

    /// Name of the style if declared, otherwise the id itself
    pub fn display_name<'a>(&'a self, style_id: &'a str) -> &'a str {
        self.name_of(style_id).unwrap_or(style_id)
    }

    /// Number of named styles
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the style sheet declares no named styles
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Extract an attribute value by key from an element
pub(super) fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(Result::ok)
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_style_names() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
  <w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/></w:style>
  <w:style w:type="paragraph" w:styleId="Titre2"><w:name w:val="heading 2"/></w:style>
</w:styles>"#;

        let styles = StyleSheet::parse(xml).unwrap();

        assert_eq!(styles.len(), 3);
        assert_eq!(styles.name_of("Heading1"), Some("heading 1"));
        assert_eq!(styles.name_of("Titre2"), Some("heading 2"));
        assert_eq!(styles.display_name("Unknown"), "Unknown");
    }

    #[test]
    fn test_name_outside_style_is_ignored() {
        // w:name also appears in other contexts (e.g. latent styles use w:lsdException)
        let xml = r#"<w:styles><w:name w:val="stray"/></w:styles>"#;
        let styles = StyleSheet::parse(xml).unwrap();
        assert!(styles.is_empty());
    }
}
