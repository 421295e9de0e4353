//! OpenAI-compatible planner client.
//!
//! Sends the planner prompt to a chat-completions endpoint and returns the
//! model's SQL. Works against api.openai.com or any compatible server via
//! a base-URL override.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SoilqError};

use super::prompt::{system_prompt, user_prompt};
use super::{PlanRequest, SqlPlanner};

/// Default timeout for planner requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default chat-completions base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Planner client configuration.
#[derive(Debug, Clone)]
pub struct OpenAiPlannerConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Model to use (e.g. "gpt-4o-mini").
    pub model: String,
    /// Chat-completions base URL.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl OpenAiPlannerConfig {
    /// Creates a new config with the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// OpenAI-compatible SQL planner.
#[derive(Debug, Clone)]
pub struct OpenAiPlanner {
    config: OpenAiPlannerConfig,
    client: Client,
}

impl OpenAiPlanner {
    /// Creates a planner with the given configuration.
    pub fn new(config: OpenAiPlannerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SoilqError::planner(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Creates a planner from environment variables.
    ///
    /// Reads `OPENAI_API_KEY` for the key; optionally `OPENAI_MODEL`
    /// (default "gpt-4o-mini") and `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| SoilqError::planner("OPENAI_API_KEY environment variable not set"))?;
        let model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let mut config = OpenAiPlannerConfig::new(api_key, model);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        Self::new(config)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SqlPlanner for OpenAiPlanner {
    async fn plan(&self, request: &PlanRequest) -> Result<String> {
        let body = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt(request.depth_cm),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt(request),
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SoilqError::planner("Planner request timed out")
                } else if e.is_connect() {
                    SoilqError::planner(format!(
                        "Failed to connect to planner at {}",
                        self.config.base_url
                    ))
                } else {
                    SoilqError::planner(format!("Planner request failed: {e}"))
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SoilqError::planner(format!("Failed to read planner response: {e}")))?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SoilqError::planner(
                "Authentication failed. Check your OPENAI_API_KEY.",
            ));
        }
        if !status.is_success() {
            return Err(SoilqError::planner(format!(
                "Planner API error ({status}): {}",
                text.chars().take(300).collect::<String>()
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| SoilqError::planner(format!("Malformed planner response: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| SoilqError::planner("Planner returned no choices"))?;

        let sql = strip_sql_fences(&content);
        if sql.is_empty() {
            return Err(SoilqError::planner("Planner returned an empty plan"));
        }
        debug!("Planned SQL:\n{sql}");
        Ok(sql)
    }
}

/// Strips a surrounding markdown code fence (```sql ... ``` or plain
/// ``` ... ```) from the model output.
pub fn strip_sql_fences(content: &str) -> String {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the language tag on the opening fence line.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => return trimmed.to_string(),
    };
    match rest.rfind("```") {
        Some(end) => rest[..end].trim().to_string(),
        None => rest.trim().to_string(),
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}
