//! Client for the remote generation service.
//!
//! The pipeline needs exactly three things from the model: free-text
//! generation, JSON-constrained generation, and token counting. All three
//! are expressed on the [`GenerativeModel`] trait so orchestration code can
//! be tested against a mock; [`GeminiClient`] is the production
//! implementation speaking the Gemini REST surface
//! (`models/{model}:generateContent`, `models/{model}:countTokens`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use listscribe_shared::{ListscribeError, Result};

/// Default API base URL for the Gemini REST API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ---------------------------------------------------------------------------
// GenerativeModel trait
// ---------------------------------------------------------------------------

/// The generation-service contract the pipeline depends on.
///
/// Both operations may fail transiently; callers treat them as unreliable
/// and decide locally whether to degrade or abort.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate free text for a prompt.
    async fn generate_content(&self, prompt: &str) -> Result<String>;

    /// Generate text constrained to a JSON response.
    async fn generate_json(&self, prompt: &str) -> Result<String> {
        self.generate_content(prompt).await
    }

    /// Count the tokens the service would bill for a prompt.
    async fn count_tokens(&self, prompt: &str) -> Result<u64>;
}

// ---------------------------------------------------------------------------
// Wire types (Gemini REST schema)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct CountTokensRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct CountTokensResponse {
    #[serde(rename = "totalTokens")]
    total_tokens: u64,
}

fn user_prompt(prompt: &str) -> Vec<Content> {
    vec![Content {
        role: "user",
        parts: vec![Part {
            text: prompt.to_string(),
        }],
    }]
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// Reqwest-based Gemini REST client.
#[derive(Clone)]
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client for the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set a custom base URL (for proxies and tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// The model this client targets.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, op: &str) -> String {
        format!("{}/models/{}:{op}", self.base_url, self.model)
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        op: &str,
        request: &Req,
    ) -> Result<Resp> {
        let response = self
            .http_client
            .post(self.endpoint(op))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(op, error = %e, "generation service request failed");
                ListscribeError::GenAi(format!("{op}: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(op, %status, "generation service returned an error");
            return Err(ListscribeError::GenAi(format!(
                "{op}: HTTP {status}: {error_text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ListscribeError::GenAi(format!("{op}: invalid response: {e}")))
    }

    async fn generate(&self, prompt: &str, config: Option<GenerationConfig>) -> Result<String> {
        let start = std::time::Instant::now();
        let request = GenerateRequest {
            contents: user_prompt(prompt),
            generation_config: config,
        };

        let response: GenerateResponse = self.post("generateContent", &request).await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            })
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ListscribeError::GenAi("empty generation response".into()))?;

        debug!(
            model = %self.model,
            chars = text.len(),
            duration_ms = start.elapsed().as_millis(),
            "generation complete"
        );

        Ok(text)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_content(&self, prompt: &str) -> Result<String> {
        self.generate(prompt, None).await
    }

    async fn generate_json(&self, prompt: &str) -> Result<String> {
        self.generate(
            prompt,
            Some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        )
        .await
    }

    async fn count_tokens(&self, prompt: &str) -> Result<u64> {
        let request = CountTokensRequest {
            contents: user_prompt(prompt),
        };
        let response: CountTokensResponse = self.post("countTokens", &request).await?;
        Ok(response.total_tokens)
    }
}
