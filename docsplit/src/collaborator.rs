//! Errors shared by the external collaborators
//!
//! Office conversion runs as a separate program, page rasterization goes through
//! the PDFium library and the vision model is a remote service. Each is reached
//! through a trait ([`crate::convert::DocumentConverter`],
//! [`crate::render::PageRasterizer`], [`crate::vision::VisionModel`]) so that the
//! pipeline can be driven by test doubles, and all of them report failures with
//! [`CollaboratorError`].

use std::path::PathBuf;
use std::process::Output;
use thiserror::Error;

/// Failure of an external tool or service
#[derive(Error, Debug)]
pub enum CollaboratorError {
    /// The external program could not be started
    #[error("Failed to execute {program}: {source}")]
    Spawn {
        /// Program name as configured
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The external program exited unsuccessfully
    #[error("{program} failed with {status}: {stderr}")]
    Failed {
        /// Program name as configured
        program: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// The program succeeded but the expected file is not there
    #[error("Expected output {path} was not produced", path = .0.display())]
    MissingOutput(PathBuf),

    /// PDFium could not be loaded, or could not open or render a PDF
    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    /// Image decoding, composition or encoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The model API answered with an error status
    #[error("Model API returned {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// The model answered without any text
    #[error("Model response contained no text")]
    EmptyResponse,

    /// The API key environment variable is not set
    #[error("API key variable {0} is not set")]
    MissingApiKey(String),

    /// Local file handling around the external call failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turn the result of `Command::output()` into an error unless the program succeeded
pub(crate) fn check_output(
    program: &str,
    result: std::io::Result<Output>,
) -> Result<Output, CollaboratorError> {
    let output = result.map_err(|source| CollaboratorError::Spawn {
        program: program.to_string(),
        source,
    })?;

    if !output.status.success() {
        return Err(CollaboratorError::Failed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_check_output_reports_spawn_failure() {
        let result = Command::new("docsplit-no-such-program").output();
        let err = check_output("docsplit-no-such-program", result).unwrap_err();
        assert!(matches!(err, CollaboratorError::Spawn { ref program, .. } if program == "docsplit-no-such-program"));
    }

    #[cfg(unix)]
    #[test]
    fn test_check_output_reports_failure_status() {
        let result = Command::new("sh").args(["-c", "echo boom >&2; exit 3"]).output();
        match check_output("sh", result) {
            Err(CollaboratorError::Failed { stderr, .. }) => assert_eq!(stderr, "boom"),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
