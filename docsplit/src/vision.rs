//! Vision model access: tool classification and diagram description
//!
//! [`GeminiClient`] talks to the Gemini `generateContent` REST endpoint.
//! [`Annotator`] prepares the image (stacking PDF pages into one JPEG, or sending
//! an image file as-is), picks the prompt, and turns every failure into the
//! configured sentinel text so that a batch never stops on a model error.

use crate::collaborator::CollaboratorError;
use crate::config::ModelConfig;
use crate::prompts::{self, Prompt};
use crate::render::{encode_jpeg, PageRasterizer};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// JPEG quality for images re-encoded before sending
const REENCODE_QUALITY: u8 = 95;

/// An encoded image ready to be attached to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// Encoded image bytes
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`
    pub mime_type: &'static str,
}

/// A generative model that answers a prompt about one image
pub trait VisionModel {
    /// Send `prompt` with `image` and return the model's text answer
    fn generate(&self, prompt: &Prompt, image: &ImagePayload) -> Result<String, CollaboratorError>;
}

// Request/response shapes of `models/{model}:generateContent`

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    Image {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn build_request(prompt: &Prompt, image: &ImagePayload) -> GenerateRequest<'static> {
    GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![
                RequestPart::Text {
                    text: prompt.instructions,
                },
                RequestPart::Image {
                    inline_data: InlineData {
                        mime_type: image.mime_type,
                        data: STANDARD.encode(&image.bytes),
                    },
                },
                RequestPart::Text {
                    text: prompt.question,
                },
            ],
        }],
    }
}

/// Concatenated text of the first candidate
fn response_text(response: GenerateResponse) -> Result<String, CollaboratorError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(CollaboratorError::EmptyResponse);
    }
    Ok(text)
}

/// Blocking client for the Gemini REST API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key_env: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Create a client from the model settings
    ///
    /// The API key is read from the configured environment variable now; a missing
    /// key only fails the individual requests.
    pub fn from_config(config: &ModelConfig) -> Result<Self, CollaboratorError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            log::warn!(
                "{} is not set; model answers will fall back to \"{}\"",
                config.api_key_env,
                config.sentinel
            );
        }

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.name.clone(),
            api_key_env: config.api_key_env.clone(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl VisionModel for GeminiClient {
    fn generate(&self, prompt: &Prompt, image: &ImagePayload) -> Result<String, CollaboratorError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CollaboratorError::MissingApiKey(self.api_key_env.clone()))?;

        log::debug!(
            "Sending {} byte {} image to {}",
            image.bytes.len(),
            image.mime_type,
            self.model
        );
        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&build_request(prompt, image))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CollaboratorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response_text(response.json()?)
    }
}

/// Asks the model about documents, degrading to a sentinel on failure
pub struct Annotator<'a> {
    model: &'a dyn VisionModel,
    rasterizer: &'a dyn PageRasterizer,
    classification_pages: usize,
    sentinel: String,
}

impl<'a> Annotator<'a> {
    /// Create an annotator
    ///
    /// # Parameters
    /// * `model` - Model answering the prompts
    /// * `rasterizer` - Renders PDF inputs into a single JPEG
    /// * `classification_pages` - Pages shown when asking for the tool name
    /// * `sentinel` - Answer returned when anything goes wrong
    pub fn new(
        model: &'a dyn VisionModel,
        rasterizer: &'a dyn PageRasterizer,
        classification_pages: usize,
        sentinel: impl Into<String>,
    ) -> Self {
        Self {
            model,
            rasterizer,
            classification_pages,
            sentinel: sentinel.into(),
        }
    }

    /// The sentinel answer
    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Name of the tool a manual covers, from its first pages
    pub fn tool_name(&self, input: &Path) -> String {
        self.ask_or_sentinel(input, Some(self.classification_pages), &prompts::TOOL_NAME)
    }

    /// Descriptions of the diagrams on every page of `input`
    pub fn describe_diagrams(&self, input: &Path) -> String {
        self.ask_or_sentinel(input, None, &prompts::DIAGRAMS)
    }

    fn ask_or_sentinel(&self, input: &Path, max_pages: Option<usize>, prompt: &Prompt) -> String {
        log::info!("Querying model about {}", input.display());
        match self.ask(input, max_pages, prompt) {
            Ok(answer) => answer,
            Err(e) => {
                log::error!("Model query for {} failed: {}", input.display(), e);
                self.sentinel.clone()
            }
        }
    }

    fn ask(
        &self,
        input: &Path,
        max_pages: Option<usize>,
        prompt: &Prompt,
    ) -> Result<String, CollaboratorError> {
        let image = self.image_payload(input, max_pages)?;
        let answer = self.model.generate(prompt, &image)?;
        Ok(answer.trim().to_string())
    }

    /// JPEG and PNG files are sent unchanged, other images are re-encoded as JPEG,
    /// and anything else is rasterized as a PDF
    fn image_payload(
        &self,
        input: &Path,
        max_pages: Option<usize>,
    ) -> Result<ImagePayload, CollaboratorError> {
        let bytes = std::fs::read(input)?;
        match image::guess_format(&bytes) {
            Ok(ImageFormat::Jpeg) => Ok(ImagePayload {
                bytes,
                mime_type: "image/jpeg",
            }),
            Ok(ImageFormat::Png) => Ok(ImagePayload {
                bytes,
                mime_type: "image/png",
            }),
            Ok(format) => {
                log::debug!("Re-encoding {:?} image {} as JPEG", format, input.display());
                let decoded = image::load_from_memory_with_format(&bytes, format)?;
                Ok(ImagePayload {
                    bytes: encode_jpeg(&decoded.to_rgb8(), REENCODE_QUALITY)?,
                    mime_type: "image/jpeg",
                })
            }
            Err(_) => {
                let scratch = tempfile::tempdir()?;
                let jpeg = scratch.path().join("converted.jpg");
                self.rasterizer.rasterize(input, max_pages, &jpeg)?;
                Ok(ImagePayload {
                    bytes: std::fs::read(&jpeg)?,
                    mime_type: "image/jpeg",
                })
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{FakeModel, FakeRasterizer};
    use super::*;

    #[test]
    fn test_request_shape() {
        let image = ImagePayload {
            bytes: vec![1, 2, 3],
            mime_type: "image/jpeg",
        };

        let json = serde_json::to_value(build_request(&prompts::TOOL_NAME, &image)).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(parts[0]["text"], prompts::TOOL_NAME.instructions);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "AQID");
        assert_eq!(parts[2]["text"], prompts::TOOL_NAME.question);
    }

    #[test]
    fn test_response_text_joins_first_candidate_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Lift "},{"text":"X200"}],"role":"model"},"finishReason":"STOP"},
                {"content":{"parts":[{"text":"ignored"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response_text(response).unwrap(), "Lift X200");
    }

    #[test]
    fn test_response_without_text_is_error() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(matches!(
            response_text(response),
            Err(CollaboratorError::EmptyResponse)
        ));
    }

    #[test]
    fn test_missing_api_key_fails_request() {
        let config = ModelConfig {
            api_key_env: "DOCSPLIT_TEST_UNSET_API_KEY".to_string(),
            ..ModelConfig::default()
        };
        let client = GeminiClient::from_config(&config).unwrap();
        let image = ImagePayload {
            bytes: Vec::new(),
            mime_type: "image/png",
        };

        let err = client.generate(&prompts::DIAGRAMS, &image).unwrap_err();
        assert!(matches!(err, CollaboratorError::MissingApiKey(ref var) if var == "DOCSPLIT_TEST_UNSET_API_KEY"));
        assert_eq!(
            client.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro-001:generateContent"
        );
    }

    #[test]
    fn test_tool_name_rasterizes_first_pages_and_trims() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("Manual.pdf");
        std::fs::write(&pdf, b"%PDF-1.4 stub").unwrap();
        let model = FakeModel::answering("  Lift X200\n");
        let rasterizer = FakeRasterizer::default();
        let annotator = Annotator::new(&model, &rasterizer, 3, "Some problem occurred.");

        assert_eq!(annotator.tool_name(&pdf), "Lift X200");
        assert_eq!(*rasterizer.requests.borrow(), vec![Some(3)]);
        assert_eq!(
            *model.calls.borrow(),
            vec![(prompts::TOOL_NAME, "image/jpeg")]
        );
    }

    #[test]
    fn test_describe_diagrams_uses_all_pages() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("Setup.pdf");
        std::fs::write(&pdf, b"%PDF-1.4 stub").unwrap();
        let model = FakeModel::answering("Image 1 shows the panel.");
        let rasterizer = FakeRasterizer::default();
        let annotator = Annotator::new(&model, &rasterizer, 3, "Some problem occurred.");

        assert_eq!(annotator.describe_diagrams(&pdf), "Image 1 shows the panel.");
        assert_eq!(*rasterizer.requests.borrow(), vec![None]);
        assert_eq!(model.calls.borrow()[0].0, prompts::DIAGRAMS);
    }

    #[test]
    fn test_image_input_is_sent_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("scan.png");
        image::RgbImage::from_pixel(2, 2, image::Rgb([0, 0, 0]))
            .save(&png)
            .unwrap();
        let model = FakeModel::answering("Drill");
        let rasterizer = FakeRasterizer::default();
        let annotator = Annotator::new(&model, &rasterizer, 3, "Some problem occurred.");

        assert_eq!(annotator.tool_name(&png), "Drill");
        assert!(rasterizer.requests.borrow().is_empty());
        assert_eq!(model.calls.borrow()[0].1, "image/png");
    }

    #[test]
    fn test_other_image_formats_are_reencoded_as_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let bmp = dir.path().join("scan.bmp");
        image::RgbImage::from_pixel(6, 3, image::Rgb([200, 20, 20]))
            .save(&bmp)
            .unwrap();
        let model = FakeModel::answering("Drill");
        let rasterizer = FakeRasterizer::default();
        let annotator = Annotator::new(&model, &rasterizer, 3, "Some problem occurred.");

        let payload = annotator.image_payload(&bmp, Some(3)).unwrap();
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(image::guess_format(&payload.bytes).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&payload.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (6, 3));

        assert_eq!(annotator.tool_name(&bmp), "Drill");
        assert!(rasterizer.requests.borrow().is_empty());
        assert_eq!(model.calls.borrow()[0].1, "image/jpeg");
    }

    #[test]
    fn test_failures_yield_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("Manual.pdf");
        std::fs::write(&pdf, b"%PDF-1.4 stub").unwrap();
        let rasterizer = FakeRasterizer::default();

        let failing = FakeModel::failing();
        let annotator = Annotator::new(&failing, &rasterizer, 3, "Some problem occurred.");
        assert_eq!(annotator.tool_name(&pdf), "Some problem occurred.");

        // Unreadable input never reaches the model
        let model = FakeModel::answering("unused");
        let annotator = Annotator::new(&model, &rasterizer, 3, "Some problem occurred.");
        assert_eq!(
            annotator.describe_diagrams(&dir.path().join("missing.pdf")),
            "Some problem occurred."
        );
        assert!(model.calls.borrow().is_empty());
    }
}
