//! Format conversion through a headless office suite

use crate::collaborator::{check_output, CollaboratorError};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Converts documents between office formats
pub trait DocumentConverter {
    /// Convert `input` to `format` (a file extension such as `pdf` or `docx`),
    /// writing into `out_dir`, and return the path of the produced file
    fn convert(&self, input: &Path, format: &str, out_dir: &Path)
        -> Result<PathBuf, CollaboratorError>;
}

/// LibreOffice `soffice --headless --convert-to`
#[derive(Debug, Clone)]
pub struct OfficeConverter {
    binary: String,
}

impl OfficeConverter {
    /// Use the given `soffice` executable (name on `PATH` or full path)
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for OfficeConverter {
    fn default() -> Self {
        Self::new("soffice")
    }
}

/// Path LibreOffice writes for `input` converted to `format` in `out_dir`
///
/// The output keeps the input's stem; a filter suffix such as `pdf:writer_pdf_Export`
/// does not affect the extension.
pub fn converted_path(input: &Path, format: &str, out_dir: &Path) -> PathBuf {
    let extension = format.split(':').next().unwrap_or(format);
    let stem = input.file_stem().unwrap_or_default();
    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(extension);
    out_dir.join(file_name)
}

impl DocumentConverter for OfficeConverter {
    fn convert(
        &self,
        input: &Path,
        format: &str,
        out_dir: &Path,
    ) -> Result<PathBuf, CollaboratorError> {
        std::fs::create_dir_all(out_dir)?;

        log::info!(
            "Converting {} to {} in {}",
            input.display(),
            format,
            out_dir.display()
        );
        let result = Command::new(&self.binary)
            .arg("--headless")
            .arg("--convert-to")
            .arg(format)
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            .output();
        check_output(&self.binary, result)?;

        let produced = converted_path(input, format, out_dir);
        if !produced.is_file() {
            return Err(CollaboratorError::MissingOutput(produced));
        }
        Ok(produced)
    }
}
