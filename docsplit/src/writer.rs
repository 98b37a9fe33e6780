//! Persisting collected sections as tagged .docx files

use crate::docx::{DocxDocument, DocxError};
use crate::metadata::MetadataLog;
use crate::sections::SectionMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while writing sections
#[derive(Error, Debug)]
pub enum WriteError {
    /// The output directory could not be created
    #[error("Failed to create output directory {path}: {source}", path = .0.display(), source = .1)]
    CreateDirError(PathBuf, #[source] std::io::Error),

    /// Saving, re-loading or appending to a section file failed
    #[error("Failed to write section {path}: {source}", path = .0.display(), source = .1)]
    DocxError(PathBuf, #[source] DocxError),
}

/// Line appended to every written section to record its tool tag
pub fn tool_tag_line(tag: &str) -> String {
    format!("This document is for troubleshooting tool: {}", tag)
}

/// Reduce a section name to a file stem
///
/// Keeps alphanumeric characters (any script), `.` and `-`; everything else,
/// whitespace included, is removed. Different names can collapse to the same stem.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-'))
        .collect()
}

/// Load a .docx, append one paragraph of text and save it back in place
///
/// Appending is not idempotent: every call adds another paragraph.
pub fn append_text_to_docx(path: &Path, text: &str) -> Result<(), DocxError> {
    let mut document = DocxDocument::open(path)?;
    document.add_paragraph(text);
    document.save(path)
}

/// Write every section to `output_dir` and tag it with `tag`
///
/// # Parameters
/// * `sections` - Named sections in the order they are written
/// * `output_dir` - Destination directory, created if missing
/// * `tag` - Tool name appended to each section and recorded in `metadata`
/// * `metadata` - Accumulator receiving one `{document, tool}` entry per section;
///   `document` is the file name of `output_dir`
///
/// # Returns
/// * `Ok(Vec<PathBuf>)` - Paths of the written files, in order
/// * `Err(WriteError)` - The directory or a section file could not be written
pub fn persist_sections(
    sections: &SectionMap,
    output_dir: &Path,
    tag: &str,
    metadata: &mut MetadataLog,
) -> Result<Vec<PathBuf>, WriteError> {
    std::fs::create_dir_all(output_dir)
        .map_err(|e| WriteError::CreateDirError(output_dir.to_path_buf(), e))?;

    let document_name = output_dir
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let tag_line = tool_tag_line(tag);

    let mut written = Vec::with_capacity(sections.len());
    for (name, section) in sections.iter() {
        let stem = sanitize_filename(name);
        if stem.is_empty() {
            log::warn!("Section '{}' has no usable file name characters", name);
        }
        let path = output_dir.join(format!("{}.docx", stem));

        section
            .save(&path)
            .and_then(|()| append_text_to_docx(&path, &tag_line))
            .map_err(|e| WriteError::DocxError(path.clone(), e))?;

        log::info!("Wrote section '{}' to {}", name, path.display());
        metadata.record(document_name.as_str(), tag);
        written.push(path);
    }

    Ok(written)
}
