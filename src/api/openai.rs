use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::Config;
use crate::error::{Result, ScriptVisionError};
use crate::generation::TextGenerator;
use crate::normalize::clip_to_budget;
use crate::{logi, logw};

const RESPONSES_URL: &str = "https://api.openai.com/v1/responses";
const MAX_CONTEXT_BYTES: usize = 200_000;
const BODY_SNIPPET_CHARS: usize = 800;

/// [`TextGenerator`] backed by the OpenAI Responses API.
pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiGenerator {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(client, cfg))
    }

    pub fn with_client(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_key: cfg.openai_key.clone(),
            model: cfg.text_model.clone(),
            timeout: Duration::from_secs(cfg.request_timeout_secs),
        }
    }

    fn request_body(&self, task: &str, context: &str) -> Value {
        let context = clip_to_budget(context, MAX_CONTEXT_BYTES);
        json!({
            "model": self.model,
            "input": [
                {"role": "system", "content": task},
                {"role": "user", "content": context},
            ],
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, task: &str, context: &str) -> Result<String> {
        let body = self.request_body(task, context);

        let resp = self
            .client
            .post(RESPONSES_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ScriptVisionError::Generation(format!("OpenAI request failed: {e}")))?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            logw(format!("OpenAI HTTP {}", status.as_u16()));
            log_body_snippet(&raw);
            let detail = provider_error_message(&raw).unwrap_or_else(|| status.to_string());
            return Err(ScriptVisionError::Generation(format!(
                "OpenAI HTTP {}: {}",
                status.as_u16(),
                detail
            )));
        }

        match extract_output_text(&raw) {
            Ok(text) => {
                logi(format!("OpenAI reply received ({} bytes)", text.len()));
                Ok(text)
            }
            Err(message) => {
                logw("OpenAI response parse failed.");
                log_body_snippet(&raw);
                Err(ScriptVisionError::Generation(message))
            }
        }
    }
}

fn log_body_snippet(raw: &str) {
    if !raw.is_empty() {
        let snippet = raw.chars().take(BODY_SNIPPET_CHARS).collect::<String>();
        logw(format!("OpenAI raw body: {}", snippet));
    }
}

fn provider_error_message(resp_json: &str) -> Option<String> {
    let root: Value = serde_json::from_str(resp_json).ok()?;
    let err = root.get("error")?;
    let message = err.get("message").and_then(Value::as_str).unwrap_or("unknown error");
    match err.get("code").and_then(Value::as_str) {
        Some(code) => Some(format!("{message} ({code})")),
        None => Some(message.to_string()),
    }
}

/// Pull the first `output_text` entry out of a Responses API body.
fn extract_output_text(resp_json: &str) -> std::result::Result<String, String> {
    let root: Value = serde_json::from_str(resp_json)
        .map_err(|e| format!("OpenAI returned invalid JSON: {e}"))?;

    if root.get("error").is_some_and(|e| !e.is_null()) {
        return Err(provider_error_message(resp_json)
            .unwrap_or_else(|| "OpenAI returned an error".to_string()));
    }

    let output = root
        .get("output")
        .and_then(Value::as_array)
        .ok_or_else(|| "OpenAI response has no output".to_string())?;

    output
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .find(|entry| entry.get("type").and_then(Value::as_str) == Some("output_text"))
        .and_then(|entry| entry.get("text").and_then(Value::as_str))
        .map(str::to_string)
        .ok_or_else(|| "OpenAI response has no output_text".to_string())
}
