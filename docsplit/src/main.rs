//! docsplit - troubleshooting manual splitter
//!
//! A CLI tool that splits troubleshooting manuals into tagged per-section
//! documents and annotates them with a vision model.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(missing_docs))]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, SplitArgs};
use docsplit::config::PipelineConfig;
use docsplit::convert::OfficeConverter;
use docsplit::metadata::MetadataLog;
use docsplit::pipeline::{self, AnnotateReport, PipelineError, PrepareReport};
use docsplit::render::PdfRasterizer;
use docsplit::splitter::SplitOptions;
use docsplit::vision::{Annotator, GeminiClient};
use std::path::{Path, PathBuf};

/// Main entry point for the docsplit CLI application
fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

/// Run the CLI application
fn run() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Split {
            input,
            output,
            tool,
            split,
            metadata,
        } => {
            let config = load_config(&cli.config)?;
            handle_split_command(&config, &input, output, &tool, split, metadata)?;
        }

        Commands::Sections { input, split } => {
            let config = load_config(&cli.config)?;
            handle_sections_command(&input, split_options(&config, split))?;
        }

        Commands::Prepare => {
            let config = load_config(&cli.config)?;
            handle_pipeline_command(&config, true, false)?;
        }

        Commands::Annotate => {
            let config = load_config(&cli.config)?;
            handle_pipeline_command(&config, false, true)?;
        }

        Commands::Run => {
            let config = load_config(&cli.config)?;
            handle_pipeline_command(&config, true, true)?;
        }

        Commands::InitConfig { path, force } => {
            handle_init_config_command(path.unwrap_or(cli.config), force)?;
        }
    }

    Ok(())
}

/// Load the configuration, or the defaults if the file does not exist
fn load_config(path: &Path) -> Result<PipelineConfig> {
    PipelineConfig::load_or_default(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Combine configured split options with command-line overrides
fn split_options(config: &PipelineConfig, args: SplitArgs) -> SplitOptions {
    let mut options = config.splitter.options();
    if args.keep_first {
        options.skip_first = false;
    }
    if let Some(bias) = args.bias {
        options.bias = bias;
    }
    options
}

/// Handle the split command
fn handle_split_command(
    config: &PipelineConfig,
    input: &Path,
    output: Option<PathBuf>,
    tool: &str,
    split: SplitArgs,
    metadata_path: Option<PathBuf>,
) -> Result<()> {
    let output = output.unwrap_or_else(|| {
        let stem = input.file_stem().unwrap_or_default();
        config.output_dir.join(stem)
    });

    println!("Splitting {}", input.display());
    println!("Output: {}", output.display());

    let mut metadata = MetadataLog::new();
    let written = pipeline::split_document(
        input,
        split_options(config, split),
        &output,
        tool,
        &mut metadata,
    )
    .with_context(|| format!("Failed to split {}", input.display()))?;

    for path in &written {
        println!("  {}", path.display());
    }
    println!("✓ Wrote {} sections", written.len());

    if let Some(path) = metadata_path {
        metadata
            .write(&path)
            .with_context(|| format!("Failed to write metadata to {}", path.display()))?;
        println!("✓ Wrote metadata: {}", path.display());
    }

    Ok(())
}

/// Handle the sections command
fn handle_sections_command(input: &Path, options: SplitOptions) -> Result<()> {
    let sections = pipeline::preview_sections(input, options)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    println!("Discovered {} sections:", sections.len());
    for section in &sections {
        let name = match &section.name {
            Ok(name) => format!("\"{}\"", name),
            Err(e) => format!("<{}>", e),
        };
        let note = if section.ordinal == 0 { " (dropped)" } else { "" };
        println!(
            "  {} - {} ({} elements){}",
            section.ordinal, name, section.elements, note
        );
    }

    Ok(())
}

/// Handle the prepare, annotate and run commands
fn handle_pipeline_command(config: &PipelineConfig, prepare: bool, annotate: bool) -> Result<()> {
    let converter = OfficeConverter::new(config.office.binary.as_str());
    let rasterizer = PdfRasterizer::new(
        config.rasterizer.library.clone(),
        config.rasterizer.dpi,
        config.rasterizer.jpeg_quality,
    );
    let model = GeminiClient::from_config(&config.model)
        .with_context(|| "Failed to create the model client")?;
    let annotator = Annotator::new(
        &model,
        &rasterizer,
        config.rasterizer.classification_pages,
        config.model.sentinel.as_str(),
    );

    if prepare {
        println!("\n[Prepare] Splitting manuals in {}...", config.input_dir.display());
        let report = pipeline::prepare(config, &converter, &annotator)
            .with_context(|| "Prepare stage failed")?;
        print_prepare_report(config, &report);
    }

    if annotate {
        println!(
            "\n[Annotate] Annotating sections in {}...",
            config.output_dir.display()
        );
        let report = pipeline::annotate(config, &converter, &annotator)
            .with_context(|| "Annotate stage failed")?;
        print_annotate_report(config, &report);
    }

    Ok(())
}

/// Print the outcome of the prepare stage
fn print_prepare_report(config: &PipelineConfig, report: &PrepareReport) {
    for document in &report.documents {
        println!(
            "✓ {}: {} sections for tool '{}'",
            document.name,
            document.sections.len(),
            document.tool
        );
    }
    print_failures(&report.failures);
    println!(
        "✓ Wrote {} metadata entries to {}",
        report.metadata.len(),
        config.metadata_path().display()
    );
}

/// Print the outcome of the annotate stage
fn print_annotate_report(config: &PipelineConfig, report: &AnnotateReport) {
    println!(
        "✓ Annotated {} sections into {}",
        report.annotated.len(),
        config.final_output_path().display()
    );
    if !report.skipped.is_empty() {
        println!("Skipped {} section PDFs", report.skipped.len());
    }
    print_failures(&report.failures);
}

/// Print per-item failures
fn print_failures(failures: &[PipelineError]) {
    if failures.is_empty() {
        return;
    }
    println!("{} problems:", failures.len());
    for failure in failures {
        println!("  - {}", failure);
    }
}

/// Handle the init-config command
fn handle_init_config_command(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite it",
            path.display()
        );
    }

    PipelineConfig::default()
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✓ Wrote default configuration: {}", path.display());
    Ok(())
}
