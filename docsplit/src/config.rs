//! Pipeline configuration from docsplit.toml

use crate::splitter::SplitOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "docsplit.toml";

/// Text used in place of a model answer when the model call fails
pub const DEFAULT_SENTINEL: &str = "Some problem occurred.";

/// Main configuration from docsplit.toml
///
/// Every field has a default, so a partial (or empty) file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw manuals (.docx, plus .odt/.doc converted in place)
    pub input_dir: PathBuf,

    /// Whole-manual PDF renders used for tool classification
    pub input_pdf_dir: PathBuf,

    /// Per-manual section directories
    pub output_dir: PathBuf,

    /// Annotated PDFs, relative to `output_dir`
    pub final_output_dir: PathBuf,

    /// Metadata export, relative to `output_dir`
    pub metadata_file: PathBuf,

    /// Where sections are cut
    pub splitter: SplitterConfig,

    /// Office suite used for format conversion
    pub office: OfficeConfig,

    /// PDF page rasterizer
    pub rasterizer: RasterizerConfig,

    /// Vision model
    pub model: ModelConfig,
}

/// Section splitting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Keep the first heading section with the discarded leading content
    pub skip_first: bool,

    /// Offset applied to every cut relative to the heading
    pub bias: isize,
}

/// Office suite settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfficeConfig {
    /// `soffice` executable
    pub binary: String,
}

/// Rasterizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterizerConfig {
    /// PDFium shared library to load; when unset it is located or downloaded
    /// and cached on first use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<PathBuf>,

    /// Render resolution
    pub dpi: u32,

    /// Pages of a manual shown to the model when asking for the tool name
    pub classification_pages: usize,

    /// Quality of the stacked JPEG (1-100)
    pub jpeg_quality: u8,
}

/// Vision model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model name
    pub name: String,

    /// Base URL of the generative language API
    pub endpoint: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Answer substituted when a model call fails
    pub sentinel: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            input_pdf_dir: PathBuf::from("input_as_pdfs"),
            output_dir: PathBuf::from("output"),
            final_output_dir: PathBuf::from("final_output"),
            metadata_file: PathBuf::from("metadata.jsonl"),
            splitter: SplitterConfig::default(),
            office: OfficeConfig::default(),
            rasterizer: RasterizerConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

impl Default for SplitterConfig {
    fn default() -> Self {
        let options = SplitOptions::default();
        Self {
            skip_first: options.skip_first,
            bias: options.bias,
        }
    }
}

impl Default for OfficeConfig {
    fn default() -> Self {
        Self {
            binary: "soffice".to_string(),
        }
    }
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self {
            library: None,
            dpi: 50,
            classification_pages: 3,
            jpeg_quality: 95,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gemini-1.5-pro-001".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 120,
            sentinel: DEFAULT_SENTINEL.to_string(),
        }
    }
}

impl SplitterConfig {
    /// Splitter options described by this configuration
    pub fn options(&self) -> SplitOptions {
        SplitOptions {
            skip_first: self.skip_first,
            bias: self.bias,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a docsplit.toml file
    ///
    /// # Parameters
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(PipelineConfig)` - Successfully loaded configuration
    /// * `Err(ConfigError)` - Error reading or parsing the configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(ConfigError::IoError)?;

        let config: PipelineConfig = toml::from_str(&content).map_err(ConfigError::ParseError)?;

        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            log::info!(
                "No configuration at {}, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// Save configuration to a docsplit.toml file
    ///
    /// # Parameters
    /// * `path` - Path where the file will be written
    ///
    /// # Returns
    /// * `Ok(())` - Successfully saved configuration
    /// * `Err(ConfigError)` - Error serializing or writing the configuration file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;

        fs::write(&path, content).map_err(ConfigError::IoError)?;

        Ok(())
    }

    /// Directory receiving the annotated PDFs
    pub fn final_output_path(&self) -> PathBuf {
        self.output_dir.join(&self.final_output_dir)
    }

    /// Path of the metadata export
    pub fn metadata_path(&self) -> PathBuf {
        self.output_dir.join(&self.metadata_file)
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum ConfigError {
    /// IO error when reading or writing file
    IoError(std::io::Error),

    /// Error parsing TOML
    ParseError(toml::de::Error),

    /// Error serializing to TOML
    SerializeError(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "TOML parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "TOML serialize error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
