//! OpenAI-compatible chat backend for generation and semantic judgment

use std::time::Duration;

use async_trait::async_trait;
use docgate::judge::build_prompt;
use docgate::{
    GenerationError, GenerationRequest, Generator, Judge, JudgmentError, PackageContext,
};
use tracing::debug;

use crate::error::BackendError;

const GENERATOR_SYSTEM_PROMPT: &str = r#"You are a technical writer maintaining integration documentation.
You are given the current document and review feedback. Return the complete revised document in Markdown.
Address every listed issue. Keep correct content unchanged. Do not wrap the document in code fences and do not add commentary."#;

const JUDGE_SYSTEM_PROMPT: &str =
    "You are a strict documentation reviewer. Answer only with the requested JSON object.";

/// Endpoint settings, read from `DOCGATE_LLM_*`
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Full chat completions URL
    pub url: String,
    pub model: String,
    /// Empty means no `Authorization` header
    pub api_key: String,
    pub timeout: Duration,
    pub max_tokens: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DOCGATE_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:8000/v1/chat/completions".to_string()),
            model: std::env::var("DOCGATE_LLM_MODEL").unwrap_or_else(|_| "default".to_string()),
            api_key: std::env::var("DOCGATE_LLM_API_KEY").unwrap_or_default(),
            timeout: Duration::from_secs(
                std::env::var("DOCGATE_LLM_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(120),
            ),
            max_tokens: 4096,
        }
    }
}

/// Chat completions client shared by the generator and judge roles
pub struct ChatBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

impl ChatBackend {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Client(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, BackendError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": temperature
        });

        let mut request = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/json")
            .json(&body);
        if !self.config.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.config.api_key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::RequestFailed(format!(
                "chat API error ({}): {}",
                status, body
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::ParseError(e.to_string()))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(BackendError::EmptyResponse)?
            .to_string();
        debug!(model = %self.config.model, chars = content.len(), "chat completion received");
        Ok(content)
    }
}

/// Prompt for one regeneration
fn generation_prompt(request: &GenerationRequest) -> String {
    let mut prompt = String::new();
    let context = request.context.prompt_summary();
    if !context.is_empty() {
        prompt.push_str(&context);
        prompt.push('\n');
    }
    prompt.push_str(&format!(
        "## Review feedback ({} stage, iteration {})\n\n",
        request.stage, request.iteration
    ));
    prompt.push_str(request.latest_feedback().unwrap_or("No specific issues."));
    prompt.push_str("\n\n## Current document\n\n");
    prompt.push_str(&request.document);
    prompt
}

/// Models often wrap the whole answer in a fence despite being told not to
fn strip_outer_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body_start) = rest.find('\n') else {
        return trimmed;
    };
    match rest[body_start + 1..].trim_end().strip_suffix("```") {
        Some(body) => body.trim_end(),
        None => trimmed,
    }
}

#[async_trait]
impl Generator for ChatBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let content = self
            .complete(GENERATOR_SYSTEM_PROMPT, &generation_prompt(request), 0.3)
            .await
            .map_err(|e| GenerationError::new(e.to_string()))?;
        let document = strip_outer_fence(&content);
        if document.is_empty() {
            return Err(GenerationError::new("model returned an empty document"));
        }
        Ok(format!("{}\n", document))
    }
}

#[async_trait]
impl Judge for ChatBackend {
    async fn judge(
        &self,
        instruction: &str,
        document: &str,
        ctx: &PackageContext,
    ) -> Result<String, JudgmentError> {
        let prompt = build_prompt(None, instruction, document, ctx);
        self.complete(JUDGE_SYSTEM_PROMPT, &prompt, 0.0)
            .await
            .map_err(|e| JudgmentError::transport(e.to_string()))
    }
}
