//! Splitting a document into sections at heading boundaries
//!
//! [`split_sections`] returns a lazy iterator. Each call to `next()` scans the
//! remaining document from its start for the next heading, cuts there, yields the
//! part before the cut and keeps the rest for the following call. The remaining
//! document only ever shrinks, so every element is scanned by at most one cut and
//! ends up in exactly one yielded section.
//!
//! # Ordinals
//! Each yielded section carries an ordinal. Ordinal 0 is the content before the
//! first real boundary (a title page, a table of contents, or with `skip_first` the
//! whole first heading section); the pipeline drops it. Sections starting at later
//! boundaries are numbered 1, 2, ... in order.

use crate::docx::{BodyElement, DocxDocument, StyleSheet};
use regex::Regex;
use std::sync::LazyLock;

/// Deepest heading rank that starts a new section
pub const MAX_BOUNDARY_RANK: u32 = 2;

static HEADING_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*heading\s*(\d+)").expect("valid heading regex"));

/// Options controlling where cuts are made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitOptions {
    /// Treat the first heading of the document as part of the leading (ordinal 0) content
    pub skip_first: bool,
    /// Offset applied to every cut relative to the heading's index
    ///
    /// `-1` keeps the element before each heading (typically a page break) with the
    /// new section.
    pub bias: isize,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            skip_first: true,
            bias: 0,
        }
    }
}

/// Heading rank encoded in a style name, e.g. 2 for "heading 2" or "Heading2"
pub fn heading_rank(style_name: &str) -> Option<u32> {
    HEADING_STYLE
        .captures(style_name)
        .and_then(|caps| caps[1].parse().ok())
}

/// Whether `element` starts a new section
///
/// True for paragraphs styled as heading 1 or heading 2. The style name comes from
/// the style sheet; if it is not declared there, or does not look like a heading, the
/// style id is tried instead.
pub fn is_boundary(element: &BodyElement, styles: &StyleSheet) -> bool {
    let Some(style_id) = element.as_paragraph().and_then(|p| p.style_id.as_deref()) else {
        return false;
    };

    heading_rank(styles.display_name(style_id))
        .or_else(|| heading_rank(style_id))
        .is_some_and(|rank| (1..=MAX_BOUNDARY_RANK).contains(&rank))
}

/// Split `document` into sections, lazily
pub fn split_sections(document: DocxDocument, options: SplitOptions) -> SectionSplitter {
    SectionSplitter {
        remaining: Some(document),
        counter: 0,
        first_pull: true,
        options,
    }
}

/// Forward-only iterator over `(ordinal, section)` pairs
///
/// Dropping the iterator abandons the remaining content.
#[derive(Debug)]
pub struct SectionSplitter {
    remaining: Option<DocxDocument>,
    counter: usize,
    first_pull: bool,
    options: SplitOptions,
}

impl SectionSplitter {
    /// Find the index of the next cut in `document`, if any
    fn next_cut(&mut self, document: &DocxDocument, first_pull: bool) -> Option<usize> {
        let len = document.len();
        let mut deferred = first_pull && self.options.skip_first;

        let boundaries = document
            .elements()
            .iter()
            .enumerate()
            .filter(|(_, element)| is_boundary(element, document.styles()))
            .map(|(index, _)| index);

        for index in boundaries {
            if deferred {
                log::debug!("Skipping first boundary at element {}", index);
                deferred = false;
                continue;
            }

            let cut = index.saturating_add_signed(self.options.bias).min(len);
            if cut > 0 {
                return Some(cut);
            }

            // The heading that opens the remaining document. On the first pull without
            // skip_first there is nothing before it, so the ordinal 0 prefix is empty.
            // With skip_first everything up to the next real cut stays ordinal 0.
            if first_pull && !self.options.skip_first && self.counter == 0 {
                self.counter = 1;
            }
        }

        None
    }
}

impl Iterator for SectionSplitter {
    type Item = (usize, DocxDocument);

    fn next(&mut self) -> Option<Self::Item> {
        let document = self.remaining.take()?;
        if document.is_empty() {
            return None;
        }
        let first_pull = std::mem::replace(&mut self.first_pull, false);

        match self.next_cut(&document, first_pull) {
            Some(cut) => {
                let (head, tail) = document.split_at(cut);
                let ordinal = self.counter;
                self.counter += 1;
                log::debug!(
                    "Section {}: {} elements, {} remaining",
                    ordinal,
                    head.len(),
                    tail.len()
                );
                if !tail.is_empty() {
                    self.remaining = Some(tail);
                }
                Some((ordinal, head))
            }
            None => {
                log::debug!("Section {}: final, {} elements", self.counter, document.len());
                Some((self.counter, document))
            }
        }
    }
}
