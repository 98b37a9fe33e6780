//! Naming split sections and collecting them by name

use crate::docx::{BodyElement, DocxDocument};
use thiserror::Error;

/// A section whose first body element cannot provide a name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedSectionError {
    /// The section has no body elements at all
    #[error("Section has no body elements")]
    Empty,

    /// The first element is a table or another non-paragraph block
    #[error("Section starts with a {0} instead of a paragraph")]
    NotAParagraph(&'static str),
}

/// Name of a section: the trimmed text of its first paragraph
///
/// # Parameters
/// * `section` - A section as yielded by the splitter
///
/// # Returns
/// * `Ok(String)` - The trimmed text, possibly empty
/// * `Err(MalformedSectionError)` - The section is empty or does not start with a paragraph
pub fn section_name(section: &DocxDocument) -> Result<String, MalformedSectionError> {
    match section.elements().first() {
        None => Err(MalformedSectionError::Empty),
        Some(BodyElement::Paragraph(paragraph)) => Ok(paragraph.text.trim().to_string()),
        Some(other) => Err(MalformedSectionError::NotAParagraph(other.kind_name())),
    }
}

/// Sections keyed by name, in first-insertion order
///
/// Inserting a name that is already present replaces the stored section but keeps
/// its original position.
#[derive(Debug, Clone, Default)]
pub struct SectionMap {
    entries: Vec<(String, DocxDocument)>,
}

impl SectionMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a section, returning the one it replaced
    pub fn insert(&mut self, name: String, section: DocxDocument) -> Option<DocxDocument> {
        if let Some(slot) = self.entries.iter_mut().find(|(key, _)| *key == name) {
            log::warn!(
                "Duplicate section name '{}': later section replaces earlier one",
                name
            );
            return Some(std::mem::replace(&mut slot.1, section));
        }
        self.entries.push((name, section));
        None
    }

    /// Look up a section by name
    pub fn get(&self, name: &str) -> Option<&DocxDocument> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, section)| section)
    }

    /// Section names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// `(name, section)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DocxDocument)> {
        self.entries
            .iter()
            .map(|(name, section)| (name.as_str(), section))
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no sections
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for SectionMap {
    type Item = (String, DocxDocument);
    type IntoIter = std::vec::IntoIter<(String, DocxDocument)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Name every yielded section and collect them, dropping ordinal 0
///
/// Ordinal 0 is the content before the first real boundary and is never kept.
/// Naming happens as each section arrives, so a malformed section stops the
/// collection at that point.
pub fn collect_sections<I>(sections: I) -> Result<SectionMap, MalformedSectionError>
where
    I: IntoIterator<Item = (usize, DocxDocument)>,
{
    let mut map = SectionMap::new();
    let mut dropped_prefix = false;

    for (ordinal, section) in sections {
        if ordinal == 0 {
            log::debug!("Dropping leading content ({} elements)", section.len());
            dropped_prefix = true;
            continue;
        }
        let name = section_name(&section)?;
        log::debug!("Section {} named '{}'", ordinal, name);
        map.insert(name, section);
    }

    if map.is_empty() && dropped_prefix {
        log::warn!("Document has no section boundary after its leading content; nothing kept");
    }

    Ok(map)
}
