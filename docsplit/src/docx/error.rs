//! Error types for loading and saving DOCX packages

use thiserror::Error;

/// Errors that can occur while reading or writing a DOCX package
#[derive(Error, Debug)]
pub enum DocxError {
    /// I/O error while reading or writing the package
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a readable ZIP archive
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A required part is missing from the package
    #[error("Package has no {0} part")]
    MissingPart(&'static str),

    /// An XML part is not valid UTF-8
    #[error("Part {part} is not valid UTF-8")]
    Encoding {
        /// Name of the offending part
        part: String,
    },

    /// XML could not be parsed
    #[error("Malformed XML in {part}: {detail}")]
    Xml {
        /// Name of the offending part
        part: &'static str,
        /// Parser message
        detail: String,
    },
}
