use anyhow::Result;
use reqwest::blocking::Client;
use serde_json::Value;

use super::CLOUD_LABEL;
use crate::config::CloudConfig;
use crate::http;
use crate::models::Metadata;
use crate::traits::{AskContext, Attempt, SourceAdapter, SourceError};

const SYSTEM_PROMPT: &str = "You are RAYA, a precise assistant.";
const CONFIDENCE: f64 = 0.9;

/// Cloud generation through the OpenAI chat completions API.
///
/// When `cloud.enabled` is false or the key variable is unset, every call
/// fails with [`SourceError::Disabled`], which renders as
/// `[cloud disabled] <reason>` and is never cached as an answer.
pub struct OpenAIBackend {
    client: Client,
    api_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    api_key: Option<String>,
    disabled_reason: Option<String>,
}

impl OpenAIBackend {
    pub fn new(config: &CloudConfig) -> Result<Self> {
        let api_key = config.api_key();
        let disabled_reason = if !config.enabled {
            Some("cloud.enabled = false".to_string())
        } else if api_key.is_none() {
            Some(format!("{} not set", config.api_key_env))
        } else {
            None
        };

        Ok(Self {
            client: http::client(config.timeout_secs)?,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            api_key,
            disabled_reason,
        })
    }

    /// True when calls will actually reach the API.
    pub fn is_enabled(&self) -> bool {
        self.disabled_reason.is_none()
    }

    pub fn disabled_reason(&self) -> Option<&str> {
        self.disabled_reason.as_deref()
    }

    fn complete(&self, prompt: &str) -> Result<String, SourceError> {
        if let Some(reason) = &self.disabled_reason {
            return Err(SourceError::Disabled("cloud".into(), reason.clone()));
        }
        let key = self.api_key.as_deref().unwrap_or_default();
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });
        let request = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", key))
            .json(&body);
        parse_chat_response(&http::send_json(request)?)
    }
}

/// Extract `choices[0].message.content` from a chat completions response.
pub fn parse_chat_response(json: &Value) -> Result<String, SourceError> {
    json.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| {
            SourceError::Parse("Invalid OpenAI response: missing choices[0].message.content".into())
        })
}

impl SourceAdapter for OpenAIBackend {
    fn label(&self) -> &str {
        CLOUD_LABEL
    }

    fn description(&self) -> &str {
        "Cloud model via OpenAI chat completions"
    }

    fn try_resolve(&self, query: &str, ctx: &AskContext) -> Attempt {
        if query.trim().is_empty() {
            return Attempt::no_answer("empty prompt");
        }
        match self.complete(&ctx.prompt_for(query)) {
            Ok(text) => {
                let mut meta = Metadata::new();
                meta.insert("model".to_string(), self.model.clone().into());
                Attempt::answered(text, CONFIDENCE).with_metadata(meta)
            }
            Err(e) => Attempt::Failed(e),
        }
    }
}
