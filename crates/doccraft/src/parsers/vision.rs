//! Vision-language model parsers.
//!
//! Qwen-VL and DeepSeek-VL are driven through an OpenAI-compatible
//! `/chat/completions` endpoint with the document image inlined as a
//! base64 data URL. The same parser serves both text extraction (a
//! transcription prompt) and direct question answering.
//!
//! Rate limiting: HTTP 429 responses are retried with exponential backoff,
//! honouring `Retry-After` when the server sends one.

use crate::core::config::VisionConfig;
use crate::core::mime::{IMAGE_EXTENSIONS, detect_mime_type};
use crate::parsers::{DocumentParser, ensure_supported};
use crate::types::{ExtractionMetadata, ExtractionResult, QuestionAnswer};
use crate::{DoccraftError, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const TRANSCRIBE_PROMPT: &str = "Transcribe all text in this document image. Preserve the reading order and line breaks. \
Return only the transcribed text without explanations or commentary.";

const ANSWER_PROMPT: &str = "Answer the question using only information visible in the document image. \
Reply with the answer text only, as short as possible, without explanations.";

/// Model family served by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionModel {
    QwenVl,
    DeepSeekVl,
}

impl VisionModel {
    fn key(&self) -> &'static str {
        match self {
            VisionModel::QwenVl => "qwenvl",
            VisionModel::DeepSeekVl => "deepseekvl",
        }
    }

    fn model_name<'a>(&self, config: &'a VisionConfig) -> &'a str {
        match self {
            VisionModel::QwenVl => &config.qwen_model,
            VisionModel::DeepSeekVl => &config.deepseek_model,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    logprobs: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ChatContent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ChatContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    logprobs: Option<ChoiceLogprobs>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceLogprobs {
    #[serde(default)]
    content: Option<Vec<TokenLogprob>>,
}

#[derive(Debug, Deserialize)]
struct TokenLogprob {
    logprob: f64,
}

/// One completion: generated text plus mean-logprob confidence when available.
#[derive(Debug)]
struct Completion {
    text: String,
    confidence: Option<f64>,
}

/// Parser backed by a hosted or local vision-language model.
pub struct VisionLanguageParser {
    model: VisionModel,
    config: VisionConfig,
    client: reqwest::Client,
}

impl VisionLanguageParser {
    pub fn new(model: VisionModel, config: VisionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DoccraftError::network_with_source("Failed to create HTTP client", e))?;

        Ok(Self { model, config, client })
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name(&self.config)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn api_key(&self) -> Option<String> {
        std::env::var(&self.config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    fn build_request(&self, prompt: String, data_url: String) -> ChatRequest<'_> {
        ChatRequest {
            model: self.model_name(),
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ChatContent::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                    ChatContent::Text { text: prompt },
                ],
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            logprobs: true,
        }
    }

    async fn complete(&self, image_path: &Path, prompt: String) -> Result<Completion> {
        let mime_type = detect_mime_type(image_path)?;
        let bytes = tokio::fs::read(image_path).await?;
        let data_url = format!(
            "data:{};base64,{}",
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        );
        let request = self.build_request(prompt, data_url);
        let endpoint = self.endpoint();
        let api_key = self.api_key();

        let mut attempt = 0;
        let response = loop {
            let mut builder = self.client.post(&endpoint).json(&request);
            if let Some(key) = &api_key {
                builder = builder.bearer_auth(key);
            }

            let response = builder.send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS && attempt < self.config.max_retries {
                let delay = retry_delay(response.headers(), attempt);
                attempt += 1;
                warn!(
                    "{}: rate limited, retry {}/{} in {:?}",
                    self.model.key(),
                    attempt,
                    self.config.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(DoccraftError::network(format!(
                    "{} returned {}: {}",
                    endpoint,
                    status,
                    body.chars().take(500).collect::<String>()
                )));
            }

            break response;
        };

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DoccraftError::serialization_with_source("Invalid chat completion response", e))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DoccraftError::parsing("Chat completion returned no choices"))?;

        let confidence = choice
            .logprobs
            .and_then(|lp| lp.content)
            .and_then(|tokens| confidence_from_logprobs(&tokens));

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            confidence,
        })
    }
}

/// `exp(mean logprob)`, i.e. the geometric-mean token probability.
fn confidence_from_logprobs(tokens: &[TokenLogprob]) -> Option<f64> {
    if tokens.is_empty() {
        return None;
    }
    let mean = tokens.iter().map(|t| t.logprob).sum::<f64>() / tokens.len() as f64;
    Some(mean.exp().clamp(0.0, 1.0))
}

fn retry_delay(headers: &reqwest::header::HeaderMap, attempt: u32) -> Duration {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_millis(1000 * 2u64.pow(attempt.min(6))))
}

/// Strip the boilerplate chat models wrap around short answers.
fn clean_answer(raw: &str) -> String {
    let mut answer = raw.trim();
    for prefix in ["Answer:", "answer:", "A:"] {
        if let Some(rest) = answer.strip_prefix(prefix) {
            answer = rest.trim_start();
        }
    }
    let answer = answer.lines().next().unwrap_or("").trim();
    let answer = answer.trim_matches(|c| c == '"' || c == '\'' || c == '`');
    answer.strip_suffix('.').unwrap_or(answer).trim().to_string()
}

#[async_trait]
impl DocumentParser for VisionLanguageParser {
    fn name(&self) -> &str {
        self.model.key()
    }

    fn version(&self) -> String {
        self.model_name().to_string()
    }

    fn supported_formats(&self) -> &[&str] {
        IMAGE_EXTENSIONS
    }

    async fn extract_text(&self, path: &Path) -> Result<ExtractionResult> {
        let file_type = ensure_supported(self, path)?;
        let start = Instant::now();

        let completion = self.complete(path, TRANSCRIBE_PROMPT.to_string()).await?;
        debug!("{} transcribed {} chars from {}", self.name(), completion.text.len(), path.display());

        let mut metadata = ExtractionMetadata {
            parser: self.name().to_string(),
            file_type,
            page_count: Some(1),
            ..Default::default()
        };
        metadata.extra.insert(
            "model".to_string(),
            serde_json::Value::String(self.model_name().to_string()),
        );
        if let Some(confidence) = completion.confidence {
            metadata
                .extra
                .insert("confidence".to_string(), serde_json::Value::from(confidence));
        }

        Ok(ExtractionResult::new(
            completion.text.trim().to_string(),
            metadata,
            start.elapsed().as_secs_f64(),
        ))
    }

    fn supports_question_answering(&self) -> bool {
        true
    }

    async fn ask_question(&self, path: &Path, question: &str) -> Result<QuestionAnswer> {
        ensure_supported(self, path)?;
        let prompt = format!("{}\n\nQuestion: {}", ANSWER_PROMPT, question.trim());
        let completion = self.complete(path, prompt).await?;

        Ok(QuestionAnswer {
            answer: clean_answer(&completion.text),
            confidence: completion.confidence,
        })
    }
}
