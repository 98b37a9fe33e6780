//! Accumulated `{document, tool}` records for written sections

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// One written section and the tool it was tagged with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Name of the directory the section was written to (the source document's stem)
    pub document: String,
    /// Tool tag appended to the section
    pub tool: String,
}

/// Errors that can occur while exporting metadata
#[derive(Error, Debug)]
pub enum MetadataError {
    /// IO error writing the export file
    #[error("IO error writing {path}: {source}", path = .0.display(), source = .1)]
    IoError(std::path::PathBuf, #[source] std::io::Error),

    /// Serialization to JSON failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Writing a CSV record failed
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Caller-owned accumulator of metadata entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataLog {
    entries: Vec<MetadataEntry>,
}

impl MetadataLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one entry
    pub fn record(&mut self, document: impl Into<String>, tool: impl Into<String>) {
        self.entries.push(MetadataEntry {
            document: document.into(),
            tool: tool.into(),
        });
    }

    /// Append every entry of another log, keeping order
    pub fn extend(&mut self, other: MetadataLog) {
        self.entries.extend(other.entries);
    }

    /// Entries in recording order
    pub fn entries(&self) -> &[MetadataEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the log to `path`, as CSV for a `.csv` extension and JSON lines otherwise
    pub fn write(&self, path: &Path) -> Result<(), MetadataError> {
        match path.extension().and_then(|s| s.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => self.write_csv(path),
            _ => self.write_jsonl(path),
        }
    }

    /// Write one JSON object per line
    pub fn write_jsonl(&self, path: &Path) -> Result<(), MetadataError> {
        let io_error = |e| MetadataError::IoError(path.to_path_buf(), e);

        let file = File::create(path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        for entry in &self.entries {
            serde_json::to_writer(&mut writer, entry)?;
            writer.write_all(b"\n").map_err(io_error)?;
        }
        writer.flush().map_err(io_error)?;

        log::info!("Wrote {} metadata entries to {}", self.len(), path.display());
        Ok(())
    }

    /// Write a `document,tool` CSV with a header row
    pub fn write_csv(&self, path: &Path) -> Result<(), MetadataError> {
        let mut writer = csv::Writer::from_path(path)?;
        for entry in &self.entries {
            writer.serialize(entry)?;
        }
        writer
            .flush()
            .map_err(|e| MetadataError::IoError(path.to_path_buf(), e))?;

        log::info!("Wrote {} metadata entries to {}", self.len(), path.display());
        Ok(())
    }
}
