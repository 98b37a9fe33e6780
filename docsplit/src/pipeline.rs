//! Batch pipeline over a directory of troubleshooting manuals
//!
//! The pipeline runs in two stages:
//! 1. **Prepare**: convert legacy formats, classify each manual's tool, split it
//!    into tagged section files and render every section to PDF
//! 2. **Annotate**: describe each section's diagrams with the vision model, append
//!    the description to the section, and collect renamed PDFs under the final
//!    output directory
//!
//! Failures of a single manual or section are logged, recorded in the stage
//! report, and do not stop the batch.

use crate::collaborator::CollaboratorError;
use crate::config::PipelineConfig;
use crate::convert::DocumentConverter;
use crate::docx::{DocxDocument, DocxError};
use crate::metadata::{MetadataError, MetadataLog};
use crate::sections::{collect_sections, section_name, MalformedSectionError};
use crate::splitter::{split_sections, SplitOptions};
use crate::vision::Annotator;
use crate::writer::{append_text_to_docx, persist_sections, WriteError};
use itertools::Itertools;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Extensions converted to .docx before processing
const LEGACY_EXTENSIONS: &[&str] = &["odt", "doc"];

/// Prefix of the lock files word processors leave next to open documents
const LOCK_FILE_PREFIX: &str = "~$";

/// Line appended to an annotated section naming the manual it came from
pub fn source_line(document: &str) -> String {
    format!(
        "This information is taken from troubleshooting document: {}",
        document
    )
}

/// Split one manual and write its tagged sections
///
/// # Parameters
/// * `input` - The .docx manual
/// * `options` - Where to cut
/// * `output_dir` - Directory receiving one .docx per section
/// * `tag` - Tool name appended to every section
/// * `metadata` - Accumulator receiving one entry per written section
///
/// # Returns
/// * `Ok(Vec<PathBuf>)` - Written section files, in document order
/// * `Err(PipelineError)` - The manual could not be read, a section has no name, or writing failed
pub fn split_document(
    input: &Path,
    options: SplitOptions,
    output_dir: &Path,
    tag: &str,
    metadata: &mut MetadataLog,
) -> Result<Vec<PathBuf>, PipelineError> {
    let document = DocxDocument::open(input)
        .map_err(|e| PipelineError::DocxError(input.to_path_buf(), e))?;
    log::info!(
        "Splitting {} ({} body elements)",
        input.display(),
        document.len()
    );

    let sections = collect_sections(split_sections(document, options))
        .map_err(|e| PipelineError::MalformedSection(input.to_path_buf(), e))?;
    if sections.is_empty() {
        log::warn!("{} produced no sections", input.display());
    }

    Ok(persist_sections(&sections, output_dir, tag, metadata)?)
}

/// One section as the splitter sees it, for dry runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSummary {
    /// Ordinal yielded by the splitter (0 is dropped by the pipeline)
    pub ordinal: usize,
    /// Section name, or why it has none
    pub name: Result<String, MalformedSectionError>,
    /// Number of body elements
    pub elements: usize,
}

/// Split a manual without writing anything
pub fn preview_sections(
    input: &Path,
    options: SplitOptions,
) -> Result<Vec<SectionSummary>, PipelineError> {
    let document = DocxDocument::open(input)
        .map_err(|e| PipelineError::DocxError(input.to_path_buf(), e))?;

    Ok(split_sections(document, options)
        .map(|(ordinal, section)| SectionSummary {
            ordinal,
            name: section_name(&section),
            elements: section.len(),
        })
        .collect())
}

/// A manual processed by the prepare stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedDocument {
    /// Manual file stem, also the name of its output directory
    pub name: String,
    /// Tool name from the model, or the sentinel
    pub tool: String,
    /// Section .docx files written
    pub sections: Vec<PathBuf>,
}

/// Outcome of the prepare stage
#[derive(Debug, Default)]
pub struct PrepareReport {
    /// Manuals that were split
    pub documents: Vec<PreparedDocument>,
    /// Everything that went wrong along the way
    pub failures: Vec<PipelineError>,
    /// Metadata of all written sections
    pub metadata: MetadataLog,
}

/// Outcome of the annotate stage
#[derive(Debug, Default)]
pub struct AnnotateReport {
    /// Renamed PDFs under the final output directory
    pub annotated: Vec<PathBuf>,
    /// Section PDFs without a usable name or matching .docx
    pub skipped: Vec<PathBuf>,
    /// Everything that went wrong along the way
    pub failures: Vec<PipelineError>,
}

/// Stage 1: classify, split and render every manual in the input directory
///
/// Writes the metadata export once all manuals are done.
pub fn prepare(
    config: &PipelineConfig,
    converter: &dyn DocumentConverter,
    annotator: &Annotator<'_>,
) -> Result<PrepareReport, PipelineError> {
    let mut report = PrepareReport::default();

    convert_legacy_documents(config, converter, &mut report)?;

    let manuals: Vec<PathBuf> = list_files(&config.input_dir, &["docx"])?
        .into_iter()
        .filter(|path| !file_name(path).starts_with(LOCK_FILE_PREFIX))
        .collect();
    log::info!(
        "Found {} manuals in {}",
        manuals.len(),
        config.input_dir.display()
    );

    for manual in &manuals {
        prepare_document(config, manual, converter, annotator, &mut report);
    }

    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| PipelineError::IoError(config.output_dir.clone(), e))?;
    report.metadata.write(&config.metadata_path())?;

    Ok(report)
}

/// Convert .odt/.doc manuals to .docx next to the originals
fn convert_legacy_documents(
    config: &PipelineConfig,
    converter: &dyn DocumentConverter,
    report: &mut PrepareReport,
) -> Result<(), PipelineError> {
    for legacy in list_files(&config.input_dir, LEGACY_EXTENSIONS)? {
        match converter.convert(&legacy, "docx", &config.input_dir) {
            Ok(converted) => log::info!(
                "Converted {} to {}",
                legacy.display(),
                converted.display()
            ),
            Err(e) => {
                log::error!("Failed to convert {}: {}", legacy.display(), e);
                report
                    .failures
                    .push(PipelineError::ConversionError(legacy, e));
            }
        }
    }
    Ok(())
}

fn prepare_document(
    config: &PipelineConfig,
    manual: &Path,
    converter: &dyn DocumentConverter,
    annotator: &Annotator<'_>,
    report: &mut PrepareReport,
) {
    let name = file_stem(manual);
    log::info!("Processing {}", manual.display());

    let tool = match converter.convert(manual, "pdf", &config.input_pdf_dir) {
        Ok(pdf) => annotator.tool_name(&pdf),
        Err(e) => {
            log::error!("Failed to render {} for classification: {}", manual.display(), e);
            report
                .failures
                .push(PipelineError::ConversionError(manual.to_path_buf(), e));
            annotator.sentinel().to_string()
        }
    };
    log::info!("{} is for tool '{}'", name, tool);

    let output_dir = config.output_dir.join(&name);
    let mut metadata = MetadataLog::new();
    let sections = match split_document(
        manual,
        config.splitter.options(),
        &output_dir,
        &tool,
        &mut metadata,
    ) {
        Ok(sections) => sections,
        Err(e) => {
            log::error!("Failed to split {}: {}", manual.display(), e);
            report.failures.push(e);
            return;
        }
    };
    report.metadata.extend(metadata);

    for section in &sections {
        if let Err(e) = converter.convert(section, "pdf", &output_dir) {
            log::error!("Failed to render section {}: {}", section.display(), e);
            report
                .failures
                .push(PipelineError::ConversionError(section.clone(), e));
        }
    }

    log::info!("{}: {} sections for tool '{}'", name, sections.len(), tool);
    report.documents.push(PreparedDocument {
        name,
        tool,
        sections,
    });
}

/// Stage 2: annotate every section PDF and collect the results
///
/// Source directories are the direct subdirectories of the output directory,
/// visited in name order and numbered from 0; the number prefixes every PDF
/// collected from that directory. Appending to a section is not idempotent, so
/// running this stage twice annotates sections twice.
pub fn annotate(
    config: &PipelineConfig,
    converter: &dyn DocumentConverter,
    annotator: &Annotator<'_>,
) -> Result<AnnotateReport, PipelineError> {
    let final_dir = config.final_output_path();
    let mut report = AnnotateReport::default();

    let source_dirs = list_subdirectories(&config.output_dir)?
        .into_iter()
        .filter(|dir| *dir != final_dir);

    for (number, dir) in source_dirs.enumerate() {
        let document = file_name(&dir);
        let target_dir = final_dir.join(document.replace(' ', "_"));
        log::info!("Annotating {} as number {}", document, number);

        for pdf in list_files(&dir, &["pdf"])? {
            match annotate_section(&pdf, &document, number, &target_dir, converter, annotator) {
                Ok(Some(annotated)) => report.annotated.push(annotated),
                Ok(None) => report.skipped.push(pdf),
                Err(e) => {
                    log::error!("Failed to annotate {}: {}", pdf.display(), e);
                    report.failures.push(e);
                }
            }
        }
    }

    Ok(report)
}

/// Annotate one section PDF; `Ok(None)` when it has no matching section file
fn annotate_section(
    pdf: &Path,
    document: &str,
    number: usize,
    target_dir: &Path,
    converter: &dyn DocumentConverter,
    annotator: &Annotator<'_>,
) -> Result<Option<PathBuf>, PipelineError> {
    let stem = file_stem(pdf);
    // A section whose name had no usable characters was written as ".docx"
    if stem.is_empty() || stem == ".docx" {
        log::warn!("Skipping {}: section has no name", pdf.display());
        return Ok(None);
    }
    let docx = pdf.with_file_name(format!("{}.docx", stem));
    if !docx.is_file() {
        log::warn!("Skipping {}: no matching {}", pdf.display(), docx.display());
        return Ok(None);
    }

    let description = annotator.describe_diagrams(pdf);
    append_text_to_docx(&docx, &description)
        .and_then(|()| append_text_to_docx(&docx, &source_line(document)))
        .map_err(|e| PipelineError::DocxError(docx.clone(), e))?;

    let produced = converter
        .convert(&docx, "pdf", target_dir)
        .map_err(|e| PipelineError::ConversionError(docx.clone(), e))?;
    let target = target_dir.join(format!("{}_{}.pdf", number, stem).replace(' ', "_"));
    std::fs::rename(&produced, &target)
        .map_err(|e| PipelineError::IoError(produced.clone(), e))?;

    log::info!("Annotated {} as {}", pdf.display(), target.display());
    Ok(Some(target))
}

/// Files directly inside `dir` with one of `extensions`, sorted by path
fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::MissingDirectory(dir.to_path_buf()));
    }

    Ok(WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| extensions.iter().any(|x| ext.eq_ignore_ascii_case(x)))
        })
        .sorted()
        .collect())
}

/// Directories directly inside `dir`, sorted by path
fn list_subdirectories(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::MissingDirectory(dir.to_path_buf()));
    }

    Ok(WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .sorted()
        .collect())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An input or output directory does not exist
    #[error("Directory not found: {path}", path = .0.display())]
    MissingDirectory(PathBuf),

    /// Filesystem operation failed
    #[error("IO error on {path}: {source}", path = .0.display(), source = .1)]
    IoError(PathBuf, #[source] std::io::Error),

    /// A manual or section file could not be read or updated
    #[error("Error reading {path}: {source}", path = .0.display(), source = .1)]
    DocxError(PathBuf, #[source] DocxError),

    /// A section does not start with a paragraph
    #[error("Malformed section in {path}: {source}", path = .0.display(), source = .1)]
    MalformedSection(PathBuf, #[source] MalformedSectionError),

    /// Writing sections failed
    #[error("Write error: {0}")]
    WriteError(#[from] WriteError),

    /// Writing the metadata export failed
    #[error("Metadata error: {0}")]
    MetadataError(#[from] MetadataError),

    /// The office suite could not convert a file
    #[error("Conversion of {path} failed: {source}", path = .0.display(), source = .1)]
    ConversionError(PathBuf, #[source] CollaboratorError),
}
