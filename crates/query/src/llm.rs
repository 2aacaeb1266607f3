use serde::{Deserialize, Serialize};
use std::sync::Once;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "models/gemini-1.5-flash";
pub const DEFAULT_API_KEY_ENV: &str = "GOOGLE_GEMINI_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

static DOTENV: Once = Once::new();

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Gemini API key not found. Set the {0} environment variable.")]
    MissingApiKey(String),

    #[error("Failed to send request to Gemini: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini request failed with status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GeminiConfig {
    pub fn new(api_key: String, model: &str, temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            api_key,
            model: normalise_model_name(model),
            temperature,
            max_output_tokens,
        }
    }

    /// Read the API key from `env_var`, loading `.env` the first time
    pub fn from_env(
        env_var: &str,
        model: &str,
        temperature: f32,
        max_output_tokens: u32,
    ) -> Result<Self, LlmError> {
        DOTENV.call_once(|| {
            dotenvy::dotenv().ok();
        });

        let api_key = std::env::var(env_var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(env_var.to_string()))?;

        Ok(Self::new(api_key, model, temperature, max_output_tokens))
    }
}

fn normalise_model_name(name: &str) -> String {
    if name.starts_with("models/") {
        name.to_string()
    } else {
        format!("models/{}", name)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Text parts of the first candidate that has any, joined by newlines
    pub fn primary_text(&self) -> String {
        for candidate in &self.candidates {
            let Some(content) = &candidate.content else {
                continue;
            };
            let fragments: Vec<&str> = content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .filter(|t| !t.is_empty())
                .collect();
            if !fragments.is_empty() {
                return fragments.join("\n");
            }
        }
        String::new()
    }

    pub fn first_finish_reason(&self) -> Option<&str> {
        self.candidates
            .iter()
            .find_map(|c| c.finish_reason.as_deref())
    }
}

/// Answers questions over retrieved passages with the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn build_prompt(question: &str, contexts: &[String]) -> String {
        let context_block = contexts
            .iter()
            .enumerate()
            .map(|(idx, context)| format!("[{}] {}", idx + 1, context.trim()))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            r#"You are an assistant who answers questions using the provided context. Cite specific evidence when possible and keep the tone instructional.

Question:
{}

Context passages:
{}

Instructions:
- Respond in Markdown.
- Begin with a concise answer paragraph.
- Follow with 2-3 bullet points highlighting supporting evidence.
- If the context lacks the answer, state that explicitly."#,
            question.trim(),
            context_block
        )
    }

    pub async fn answer(&self, question: &str, contexts: &[String]) -> Result<String, LlmError> {
        if contexts.is_empty() {
            return Ok("No retrieved context was provided for Gemini.".to_string());
        }

        let prompt = Self::build_prompt(question, contexts);
        let response = self.generate(&prompt).await?;
        Ok(Self::answer_text(&response))
    }

    pub async fn generate(&self, prompt: &str) -> Result<GenerateContentResponse, LlmError> {
        let url = format!(
            "{}/v1beta/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.config.model
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        tracing::debug!(model = %self.config.model, prompt_chars = prompt.len(), "Calling Gemini");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    fn answer_text(response: &GenerateContentResponse) -> String {
        let text = response.primary_text();
        if !text.trim().is_empty() {
            return text.trim().to_string();
        }

        match response.first_finish_reason() {
            Some(reason) => format!(
                "Gemini did not return text content. Finish reason: {}. Try lowering top-k, reducing prompt size, or increasing the max output tokens.",
                reason
            ),
            None => "Gemini returned an empty response.".to_string(),
        }
    }
}
